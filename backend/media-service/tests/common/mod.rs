//! In-memory stores with call counters and failure switches
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use media_service::db::{ContentStore, InteractionStore};
use media_service::error::{AppError, Result};
use media_service::models::{ContentCategory, ContentPage, MediaItem, MediaQuery};
use media_service::services::{InteractionFreshness, MediaPageLoader, PageLoaderConfig};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub fn media_item(category: ContentCategory, creator: &str, index: usize) -> MediaItem {
    MediaItem {
        id: Uuid::new_v4(),
        media_type: category.as_str().to_string(),
        category: Some(if index % 2 == 0 { "jazz" } else { "soul" }.to_string()),
        content_type: Some("video".to_string()),
        title: format!("{} #{}", category, index),
        creator: creator.to_string(),
        thumbnail_url: Some(format!("https://cdn.example.com/thumbs/{}.jpg", index)),
        duration: Some("3:30".to_string()),
        read_time: None,
        views: (index * 10) as i64,
        plays: index as i64,
        sales: 0,
        likes: 0,
        price: None,
        rating: Some(4.0),
        is_premium: index % 3 == 0,
        created_at: Utc::now() - ChronoDuration::minutes(index as i64),
    }
}

/// `count` items of `category`, newest first
pub fn catalog(category: ContentCategory, count: usize) -> Vec<MediaItem> {
    (0..count)
        .map(|i| {
            let creator = if i % 2 == 0 { "ada" } else { "grace" };
            media_item(category, creator, i)
        })
        .collect()
}

#[derive(Default)]
pub struct FakeContentStore {
    items: Vec<MediaItem>,
    calls: AtomicUsize,
    failing: AtomicBool,
    delays: Mutex<HashMap<i64, Duration>>,
    queries: Mutex<Vec<MediaQuery>>,
}

impl FakeContentStore {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay responses for the page starting at `offset`
    pub fn delay_offset(&self, offset: i64, delay: Duration) {
        self.delays.lock().unwrap().insert(offset, delay);
    }

    pub fn queries(&self) -> Vec<MediaQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentStore for FakeContentStore {
    async fn fetch_page(&self, query: &MediaQuery) -> Result<ContentPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        let delay = self.delays.lock().unwrap().get(&query.offset).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("content store unreachable".to_string()));
        }

        let matching: Vec<&MediaItem> = self
            .items
            .iter()
            .filter(|item| item.media_type == query.category.as_str())
            .filter(|item| match &query.filter.genre {
                Some(genre) => item.category.as_deref() == Some(genre.as_str()),
                None => true,
            })
            .filter(|item| match query.filter.premium {
                Some(premium) => item.is_premium == premium,
                None => true,
            })
            .collect();

        Ok(ContentPage {
            total_count: matching.len() as i64,
            items: matching
                .into_iter()
                .skip(query.offset as usize)
                .take(query.limit as usize)
                .cloned()
                .collect(),
        })
    }
}

#[derive(Default)]
pub struct FakeInteractionStore {
    likes: Mutex<HashSet<(Uuid, Uuid)>>,
    follows: Mutex<HashSet<(Uuid, String)>>,
    like_calls: AtomicUsize,
    follow_calls: AtomicUsize,
    write_calls: AtomicUsize,
    fail_likes: AtomicBool,
    fail_follows: AtomicBool,
    fail_writes: AtomicBool,
    read_delay: Mutex<Option<Duration>>,
    snapshot_delay: Mutex<Option<Duration>>,
}

impl FakeInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_like(&self, user_id: Uuid, media_id: Uuid) {
        self.likes.lock().unwrap().insert((user_id, media_id));
    }

    pub fn add_follow(&self, user_id: Uuid, creator: &str) {
        self.follows
            .lock()
            .unwrap()
            .insert((user_id, creator.to_string()));
    }

    pub fn like_calls(&self) -> usize {
        self.like_calls.load(Ordering::SeqCst)
    }

    pub fn follow_calls(&self) -> usize {
        self.follow_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_likes(&self, failing: bool) {
        self.fail_likes.store(failing, Ordering::SeqCst);
    }

    pub fn set_fail_follows(&self, failing: bool) {
        self.fail_follows.store(failing, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    /// Delay every likes and follows read by `delay`
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    /// Read likes immediately but return them only after `delay`, so a
    /// write landing in between is missing from the result
    pub fn set_snapshot_delay(&self, delay: Duration) {
        *self.snapshot_delay.lock().unwrap() = Some(delay);
    }

    async fn wait(&self) {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn wait_after_snapshot(&self) {
        let delay = *self.snapshot_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl InteractionStore for FakeInteractionStore {
    async fn liked_media_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        self.like_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail_likes.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("likes query failed".to_string()));
        }

        let liked: HashSet<Uuid> = self
            .likes
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, media)| *media)
            .collect();
        self.wait_after_snapshot().await;
        Ok(liked)
    }

    async fn followed_creators(&self, user_id: Uuid) -> Result<HashSet<String>> {
        self.follow_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.fail_follows.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("follows query failed".to_string()));
        }

        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, creator)| creator.clone())
            .collect())
    }

    async fn set_like(&self, user_id: Uuid, media_id: Uuid, liked: bool) -> Result<bool> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("write rejected".to_string()));
        }

        let mut likes = self.likes.lock().unwrap();
        Ok(if liked {
            likes.insert((user_id, media_id))
        } else {
            likes.remove(&(user_id, media_id))
        })
    }

    async fn set_follow(&self, user_id: Uuid, creator: &str, following: bool) -> Result<bool> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("write rejected".to_string()));
        }

        let mut follows = self.follows.lock().unwrap();
        let row = (user_id, creator.to_string());
        Ok(if following {
            follows.insert(row)
        } else {
            follows.remove(&row)
        })
    }
}

pub struct Harness {
    pub content: Arc<FakeContentStore>,
    pub interactions: Arc<FakeInteractionStore>,
    pub loader: Arc<MediaPageLoader>,
}

pub fn harness(items: Vec<MediaItem>, freshness: InteractionFreshness) -> Harness {
    let content = Arc::new(FakeContentStore::new(items));
    let interactions = Arc::new(FakeInteractionStore::new());
    let config = PageLoaderConfig {
        freshness,
        ..PageLoaderConfig::default()
    };
    let loader = Arc::new(MediaPageLoader::new(
        content.clone(),
        interactions.clone(),
        config,
    ));

    Harness {
        content,
        interactions,
        loader,
    }
}
