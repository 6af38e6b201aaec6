//! Unified cache key schema
//!
//! Every caller builds keys through these helpers so that prefix invalidation
//! and metrics labelling stay consistent.
//! Key format: v{VERSION}:{entity}:{identifier}[:sub_key]

use uuid::Uuid;

/// Cache schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    // ============= Media Page Keys =============

    /// One page of a media category listing
    /// Format: v1:media:{category}:{filter}:page:{page}
    pub fn media_page(category: &str, filter: &str, page: u32) -> String {
        format!(
            "v{}:media:{}:{}:page:{}",
            CACHE_VERSION, category, filter, page
        )
    }

    /// Prefix shared by every cached page of a category
    pub fn media_category_prefix(category: &str) -> String {
        format!("v{}:media:{}:", CACHE_VERSION, category)
    }

    // ============= Interaction Keys =============

    /// Liked media ids and followed creators of one user
    /// Format: v1:interactions:{user_id}
    pub fn interactions(user_id: Uuid) -> String {
        format!("v{}:interactions:{}", CACHE_VERSION, user_id)
    }

    /// Prefix shared by every user's interaction entry
    pub fn interactions_prefix() -> String {
        format!("v{}:interactions:", CACHE_VERSION)
    }

    // ============= Utility =============

    /// Extract entity type from key
    pub fn entity_type(key: &str) -> Option<&str> {
        // Format: v{N}:{entity}:...
        let mut parts = key.split(':');
        match (parts.next(), parts.next()) {
            (Some(_), Some(entity)) => Some(entity),
            _ => None,
        }
    }
}
