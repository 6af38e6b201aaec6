/// Database access layer
///
/// This module provides:
/// - `ContentStore` / `InteractionStore`: the remote reads and writes the
///   page loader depends on
/// - Postgres implementations of both on `sqlx`
use crate::error::Result;
use crate::models::{ContentPage, MediaQuery};
use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

pub mod interaction_repo;
pub mod media_repo;

pub use interaction_repo::PgInteractionRepository;
pub use media_repo::PgMediaRepository;

/// Paginated read access to media content
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// One range of a listing plus the exact count of matching rows
    async fn fetch_page(&self, query: &MediaQuery) -> Result<ContentPage>;
}

/// Per-user likes and follows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn liked_media_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;

    async fn followed_creators(&self, user_id: Uuid) -> Result<HashSet<String>>;

    /// Idempotent; returns whether a row was inserted or deleted
    async fn set_like(&self, user_id: Uuid, media_id: Uuid, liked: bool) -> Result<bool>;

    /// Idempotent; returns whether a row was inserted or deleted
    async fn set_follow(&self, user_id: Uuid, creator: &str, following: bool) -> Result<bool>;
}
