//! Category page loading
//!
//! A page request first checks the content cache, then, on a miss, issues one
//! range-bounded content query. For an authenticated caller the liked-media and
//! followed-creator sets are fetched concurrently and merged into the items.
//!
//! Content pages are shared by every caller, so only anonymous loads populate
//! the content cache; authenticated loads read it but never write it. Remote
//! failures are returned to the caller untouched and leave the caches as they
//! were.
//!
//! Interaction state fetched before a change notification is never written
//! back after it: every notification bumps an epoch, and a fetch that spans a
//! bump returns its result without caching it.

use crate::db::{ContentStore, InteractionStore};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    ContentCategory, ContentPage, InteractionState, MediaCard, MediaFilter, MediaPage,
    MediaQuery, PageSource,
};
use cache_invalidation::{ChangeNotification, ChangeSink};
use flourish_cache::{ttl, CacheKey, QueryCache};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// How long cached interaction state may be reused
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionFreshness {
    /// Every authenticated load re-fetches likes and follows
    #[default]
    AlwaysRefetch,
    /// Cached state is reused until a change notification or a local action drops it
    UntilInvalidated,
}

impl fmt::Display for InteractionFreshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlwaysRefetch => f.write_str("always_refetch"),
            Self::UntilInvalidated => f.write_str("until_invalidated"),
        }
    }
}

impl FromStr for InteractionFreshness {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "always_refetch" => Ok(Self::AlwaysRefetch),
            "until_invalidated" => Ok(Self::UntilInvalidated),
            other => Err(AppError::Config(format!(
                "Unknown interaction freshness: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageLoaderConfig {
    pub page_size: u32,
    /// Default TTL of the content page cache
    pub content_ttl: Duration,
    /// Default TTL of the interaction state cache
    pub interaction_ttl: Duration,
    pub freshness: InteractionFreshness,
}

impl Default for PageLoaderConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            content_ttl: ttl::DEFAULT,
            interaction_ttl: ttl::DEFAULT,
            freshness: InteractionFreshness::default(),
        }
    }
}

/// Row offset of a 1-based page
pub fn page_offset(page: u32, page_size: u32) -> Result<i64> {
    if page == 0 {
        return Err(AppError::InvalidInput("page must be >= 1".to_string()));
    }
    Ok(i64::from(page - 1) * i64::from(page_size))
}

/// Loads category pages through the content and interaction caches
pub struct MediaPageLoader {
    content: Arc<dyn ContentStore>,
    pub(super) interactions: Arc<dyn InteractionStore>,
    page_cache: Arc<QueryCache<Arc<ContentPage>>>,
    pub(super) interaction_cache: Arc<QueryCache<InteractionState>>,
    pub(super) change_sink: Option<Arc<dyn ChangeSink>>,
    /// Bumped by every interaction change notification
    interaction_epoch: AtomicU64,
    config: PageLoaderConfig,
    pub(super) service_name: String,
}

impl MediaPageLoader {
    pub fn new(
        content: Arc<dyn ContentStore>,
        interactions: Arc<dyn InteractionStore>,
        config: PageLoaderConfig,
    ) -> Self {
        Self {
            content,
            interactions,
            page_cache: Arc::new(QueryCache::new("media_pages", config.content_ttl)),
            interaction_cache: Arc::new(QueryCache::new("interactions", config.interaction_ttl)),
            change_sink: None,
            interaction_epoch: AtomicU64::new(0),
            config,
            service_name: "media-service".to_string(),
        }
    }

    /// Publish a change notification after every successful like/follow write
    pub fn with_change_sink(mut self, sink: Arc<dyn ChangeSink>, service_name: String) -> Self {
        self.change_sink = Some(sink);
        self.service_name = service_name;
        self
    }

    pub fn config(&self) -> &PageLoaderConfig {
        &self.config
    }

    pub fn page_cache(&self) -> &Arc<QueryCache<Arc<ContentPage>>> {
        &self.page_cache
    }

    pub fn interaction_cache(&self) -> &Arc<QueryCache<InteractionState>> {
        &self.interaction_cache
    }

    /// Unfiltered page of a category
    pub async fn load_page(
        &self,
        category: ContentCategory,
        page: u32,
        user_id: Option<Uuid>,
    ) -> Result<MediaPage> {
        self.load_page_filtered(category, &MediaFilter::default(), page, user_id)
            .await
    }

    pub async fn load_page_filtered(
        &self,
        category: ContentCategory,
        filter: &MediaFilter,
        page: u32,
        user_id: Option<Uuid>,
    ) -> Result<MediaPage> {
        let offset = page_offset(page, self.config.page_size)?;
        let query = MediaQuery {
            category,
            filter: filter.clone(),
            offset,
            limit: i64::from(self.config.page_size),
        };
        let key = CacheKey::media_page(category.as_str(), &filter.cache_tag(), page);
        let cached = self.page_cache.get(&key);

        let (content, source, state) = match (cached, user_id) {
            (Some(content), None) => (content, PageSource::Cache, None),
            (Some(content), Some(user_id)) => {
                let state = self.interaction_state(user_id).await?;
                (content, PageSource::Cache, Some(state))
            }
            (None, None) => {
                let content = Arc::new(self.fetch_content(&query).await?);
                self.page_cache.set(key, Arc::clone(&content), None);
                (content, PageSource::Remote, None)
            }
            (None, Some(user_id)) => {
                let (content, state) = tokio::try_join!(
                    self.fetch_content(&query),
                    self.interaction_state(user_id)
                )?;
                (Arc::new(content), PageSource::Remote, Some(state))
            }
        };

        metrics::record_page_load(source.as_str());
        debug!(
            category = %category,
            page = page,
            source = source.as_str(),
            authenticated = user_id.is_some(),
            "Loaded media page"
        );

        Ok(self.assemble(category, filter, page, offset, &content, source, state.as_ref()))
    }

    /// Cached or freshly fetched likes and follows of `user_id`
    pub async fn interaction_state(&self, user_id: Uuid) -> Result<InteractionState> {
        let key = CacheKey::interactions(user_id);

        if self.config.freshness == InteractionFreshness::UntilInvalidated {
            if let Some(state) = self.interaction_cache.get(&key) {
                return Ok(state);
            }
        }

        let epoch = self.interaction_epoch();
        let state = self.fetch_interactions(user_id).await?;
        self.store_interaction_state(&key, state.clone(), epoch);
        Ok(state)
    }

    pub(super) fn interaction_epoch(&self) -> u64 {
        self.interaction_epoch.load(Ordering::SeqCst)
    }

    /// Cache `state` unless a change notification arrived since `epoch` was read.
    ///
    /// The epoch is re-read after the write because a notification may bump it
    /// between the check and the `set`. Returns whether the state was kept.
    pub(super) fn store_interaction_state(
        &self,
        key: &str,
        state: InteractionState,
        epoch: u64,
    ) -> bool {
        if self.interaction_epoch() != epoch {
            debug!(key = %key, "Interaction state changed during fetch, not caching");
            return false;
        }

        self.interaction_cache.set(key, state, None);
        if self.interaction_epoch() != epoch {
            self.interaction_cache.delete(key);
            return false;
        }
        true
    }

    /// Drop every user's interaction state; cached content pages are kept
    pub fn on_interaction_change(&self, notification: &ChangeNotification) -> usize {
        // Bump before clearing so an in-flight fetch cannot re-insert stale state
        self.interaction_epoch.fetch_add(1, Ordering::SeqCst);
        let removed = self
            .interaction_cache
            .invalidate_prefix(&CacheKey::interactions_prefix());

        let table = notification.table.to_string();
        metrics::CHANGE_INVALIDATIONS_TOTAL
            .with_label_values(&[table.as_str()])
            .inc();
        info!(
            message_id = %notification.message_id,
            table = %notification.table,
            source = %notification.source_service,
            removed = removed,
            "Interaction state invalidated"
        );
        removed
    }

    /// Drop every cached page of `category`
    pub fn invalidate_category(&self, category: ContentCategory) -> usize {
        let removed = self
            .page_cache
            .invalidate_prefix(&CacheKey::media_category_prefix(category.as_str()));
        info!(category = %category, removed = removed, "Category pages invalidated");
        removed
    }

    /// Load the first anonymous page of each category, returning how many succeeded
    pub async fn warm(&self, categories: &[ContentCategory]) -> usize {
        let mut warmed = 0;
        for &category in categories {
            match self.load_page(category, 1, None).await {
                Ok(_) => warmed += 1,
                Err(e) => warn!(category = %category, error = %e, "Cache warm-up failed"),
            }
        }
        info!(warmed = warmed, total = categories.len(), "Cache warm-up finished");
        warmed
    }

    async fn fetch_content(&self, query: &MediaQuery) -> Result<ContentPage> {
        let result = self.content.fetch_page(query).await;
        metrics::record_remote_fetch("content", &result);
        if let Err(e) = &result {
            warn!(category = %query.category, offset = query.offset, error = %e, "Content query failed");
        }
        result
    }

    async fn fetch_interactions(&self, user_id: Uuid) -> Result<InteractionState> {
        let likes = async {
            let result = self.interactions.liked_media_ids(user_id).await;
            metrics::record_remote_fetch("likes", &result);
            result
        };
        let follows = async {
            let result = self.interactions.followed_creators(user_id).await;
            metrics::record_remote_fetch("follows", &result);
            result
        };

        match tokio::try_join!(likes, follows) {
            Ok((liked_media_ids, followed_creators)) => Ok(InteractionState {
                liked_media_ids,
                followed_creators,
            }),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Interaction query failed");
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        category: ContentCategory,
        filter: &MediaFilter,
        page: u32,
        offset: i64,
        content: &ContentPage,
        source: PageSource,
        state: Option<&InteractionState>,
    ) -> MediaPage {
        let items: Vec<MediaCard> = content
            .items
            .iter()
            .take(self.config.page_size as usize)
            .cloned()
            .map(|item| MediaCard::merge(item, state))
            .collect();
        let has_more = offset + (items.len() as i64) < content.total_count;

        MediaPage {
            category,
            filter: filter.clone(),
            page,
            page_size: self.config.page_size,
            total_count: content.total_count,
            has_more,
            source,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockContentStore, MockInteractionStore};
    use chrono::Utc;
    use std::collections::HashSet;

    fn item(title: &str) -> crate::models::MediaItem {
        crate::models::MediaItem {
            id: Uuid::new_v4(),
            media_type: "blog".to_string(),
            category: None,
            content_type: Some("article".to_string()),
            title: title.to_string(),
            creator: "ada".to_string(),
            thumbnail_url: None,
            duration: None,
            read_time: Some("4 min".to_string()),
            views: 0,
            plays: 0,
            sales: 0,
            likes: 0,
            price: None,
            rating: None,
            is_premium: false,
            created_at: Utc::now(),
        }
    }

    fn loader(content: MockContentStore, interactions: MockInteractionStore) -> MediaPageLoader {
        MediaPageLoader::new(
            Arc::new(content),
            Arc::new(interactions),
            PageLoaderConfig::default(),
        )
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 12).unwrap(), 0);
        assert_eq!(page_offset(2, 12).unwrap(), 12);
        assert_eq!(page_offset(5, 10).unwrap(), 40);
        assert!(matches!(page_offset(0, 12), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_freshness_parse() {
        assert_eq!(
            "until_invalidated".parse::<InteractionFreshness>().unwrap(),
            InteractionFreshness::UntilInvalidated
        );
        assert_eq!(
            InteractionFreshness::AlwaysRefetch.to_string(),
            "always_refetch"
        );
        assert!("sometimes".parse::<InteractionFreshness>().is_err());
    }

    #[tokio::test]
    async fn test_page_zero_makes_no_remote_call() {
        let mut content = MockContentStore::new();
        content.expect_fetch_page().never();

        let loader = loader(content, MockInteractionStore::new());
        let err = loader
            .load_page(ContentCategory::Stream, 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_query_uses_page_range() {
        let mut content = MockContentStore::new();
        content
            .expect_fetch_page()
            .withf(|q| q.category == ContentCategory::Blog && q.offset == 12 && q.limit == 12)
            .times(1)
            .returning(|_| {
                Ok(ContentPage {
                    items: vec![item("second page")],
                    total_count: 13,
                })
            });

        let loader = loader(content, MockInteractionStore::new());
        let page = loader
            .load_page(ContentCategory::Blog, 2, None)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(!page.has_more);
        assert_eq!(page.source, PageSource::Remote);
    }

    #[tokio::test]
    async fn test_content_failure_is_not_cached() {
        let mut content = MockContentStore::new();
        let mut seq = mockall::Sequence::new();
        content
            .expect_fetch_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::Unavailable("connection reset".to_string())));
        content
            .expect_fetch_page()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(ContentPage {
                    items: vec![item("recovered")],
                    total_count: 1,
                })
            });

        let loader = loader(content, MockInteractionStore::new());

        let err = loader
            .load_page(ContentCategory::Blog, 1, None)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(loader.page_cache().is_empty());

        let page = loader
            .load_page(ContentCategory::Blog, 1, None)
            .await
            .unwrap();
        assert_eq!(page.items[0].item.title, "recovered");
    }

    #[tokio::test]
    async fn test_follows_failure_fails_load() {
        let mut content = MockContentStore::new();
        content.expect_fetch_page().returning(|_| {
            Ok(ContentPage {
                items: vec![item("a")],
                total_count: 1,
            })
        });

        let mut interactions = MockInteractionStore::new();
        interactions
            .expect_liked_media_ids()
            .returning(|_| Ok(HashSet::new()));
        interactions
            .expect_followed_creators()
            .returning(|_| Err(AppError::Unavailable("follows timed out".to_string())));

        let loader = loader(content, interactions);
        let result = loader
            .load_page(ContentCategory::Blog, 1, Some(Uuid::new_v4()))
            .await;

        assert!(matches!(result, Err(AppError::Unavailable(_))));
        assert!(loader.interaction_cache().is_empty());
    }

    #[test]
    fn test_state_read_before_notification_is_not_cached() {
        let loader = loader(MockContentStore::new(), MockInteractionStore::new());
        let key = CacheKey::interactions(Uuid::new_v4());

        let epoch = loader.interaction_epoch();
        loader.on_interaction_change(&ChangeNotification::hint(
            cache_invalidation::InteractionTable::Likes,
            "test".to_string(),
        ));

        assert!(!loader.store_interaction_state(&key, InteractionState::default(), epoch));
        assert!(!loader.interaction_cache().has(&key));

        let epoch = loader.interaction_epoch();
        assert!(loader.store_interaction_state(&key, InteractionState::default(), epoch));
        assert!(loader.interaction_cache().has(&key));
    }
}
