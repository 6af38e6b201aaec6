//! Per-view page state
//!
//! A `PageViewer` stands for one open listing (one category, one filter, one
//! caller). Each request takes a new generation number; a response that comes
//! back after a newer request was issued is dropped instead of replacing the
//! page on display.

use super::MediaPageLoader;
use crate::error::Result;
use crate::models::{ContentCategory, MediaFilter, MediaPage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Outcome of a viewer request
#[derive(Debug, Clone, PartialEq)]
pub enum PageLoad {
    /// The response is current and now on display
    Ready(MediaPage),
    /// A newer request was issued while this one was in flight
    Superseded,
}

pub struct PageViewer {
    loader: Arc<MediaPageLoader>,
    category: ContentCategory,
    filter: MediaFilter,
    user_id: Option<Uuid>,
    generation: AtomicU64,
    current: Mutex<Option<MediaPage>>,
}

impl PageViewer {
    pub fn new(
        loader: Arc<MediaPageLoader>,
        category: ContentCategory,
        user_id: Option<Uuid>,
    ) -> Self {
        Self {
            loader,
            category,
            filter: MediaFilter::default(),
            user_id,
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn with_filter(mut self, filter: MediaFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Page on display, if any load has succeeded
    pub fn current(&self) -> Option<MediaPage> {
        self.current.lock().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Request `page`; a failure leaves the current page in place
    pub async fn load_page(&self, page: u32) -> Result<PageLoad> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let result = self
            .loader
            .load_page_filtered(self.category, &self.filter, page, self.user_id)
            .await;

        let mut current = self.current.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(
                category = %self.category,
                page = page,
                generation = generation,
                "Discarding superseded page response"
            );
            return Ok(PageLoad::Superseded);
        }

        let loaded = result?;
        *current = Some(loaded.clone());
        Ok(PageLoad::Ready(loaded))
    }

    /// Reload the page on display, or the first page if nothing is shown yet
    pub async fn refresh(&self) -> Result<PageLoad> {
        let page = self.current().map(|p| p.page).unwrap_or(1);
        self.load_page(page).await
    }
}
