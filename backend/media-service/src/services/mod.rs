/// Service layer for media listings
///
/// This module provides:
/// - Page loader: cached category pages merged with per-user interaction state
/// - Interaction actions: like/follow writes with optimistic cache updates
/// - Page viewer: discards responses that were superseded by a newer request
pub mod interactions;
pub mod page_loader;
pub mod viewer;

pub use page_loader::{page_offset, InteractionFreshness, MediaPageLoader, PageLoaderConfig};
pub use viewer::{PageLoad, PageViewer};
