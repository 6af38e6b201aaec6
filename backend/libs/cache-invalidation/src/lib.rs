//! Interaction change notifications
//!
//! Broadcasts "a like or follow changed" hints so that every process holding
//! cached interaction state can drop it.
//!
//! # Architecture
//!
//! ```text
//! media-service instance A:
//!   1. User likes a media item (INSERT INTO likes ...)
//!   2. Publish notification:
//!      PUBLISH interactions:changed {"table": "Likes", "user_id": "..."}
//!      ↓
//! Redis Pub/Sub (broadcast to all subscribers)
//!      ↓
//! media-service instances A, B, C:
//!   3. Receive notification
//!   4. Drop cached interaction state (content pages are kept)
//! ```
//!
//! A notification carries no authoritative state. Consumers treat it as a
//! hint to invalidate and re-fetch, and must tolerate duplicates, reordering
//! and loss.
//!
//! Inside a single process the same messages can travel over
//! [`LocalChangeBus`] instead of Redis.
//!
//! # Example: Subscriber
//!
//! ```no_run
//! use cache_invalidation::ChangeSubscriber;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let subscriber = ChangeSubscriber::new("redis://localhost:6379").await?;
//!
//!     let handle = subscriber.subscribe(|msg| async move {
//!         println!("Interaction change: {:?}", msg);
//!         Ok(())
//!     }).await?;
//!
//!     handle.await?;
//!     Ok(())
//! }
//! ```

use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

mod error;
mod stats;

pub use error::InvalidationError;
pub use stats::{ChangeStats, StatsCollector};

type Result<T> = std::result::Result<T, InvalidationError>;

/// Interaction tables whose changes are broadcast
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InteractionTable {
    Likes,
    Follows,
}

impl std::fmt::Display for InteractionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionTable::Likes => write!(f, "likes"),
            InteractionTable::Follows => write!(f, "follows"),
        }
    }
}

impl std::str::FromStr for InteractionTable {
    type Err = InvalidationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "likes" => Ok(InteractionTable::Likes),
            "follows" => Ok(InteractionTable::Follows),
            other => Err(InvalidationError::InvalidMessage(format!(
                "Unknown interaction table: {}",
                other
            ))),
        }
    }
}

/// Kind of row change behind a notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeAction {
    Insert,
    Delete,
    /// Source could not tell (e.g. a bulk import)
    Unknown,
}

/// Interaction change notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub message_id: String,
    pub table: InteractionTable,
    /// Owner of the changed row, when the source knows it
    pub user_id: Option<Uuid>,
    pub action: ChangeAction,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source_service: String,
}

impl ChangeNotification {
    pub fn new(
        table: InteractionTable,
        user_id: Option<Uuid>,
        action: ChangeAction,
        source_service: String,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            table,
            user_id,
            action,
            timestamp: chrono::Utc::now(),
            source_service,
        }
    }

    /// A user liked or unliked a media item
    pub fn like_changed(user_id: Uuid, action: ChangeAction, source_service: String) -> Self {
        Self::new(InteractionTable::Likes, Some(user_id), action, source_service)
    }

    /// A user followed or unfollowed a creator
    pub fn follow_changed(user_id: Uuid, action: ChangeAction, source_service: String) -> Self {
        Self::new(
            InteractionTable::Follows,
            Some(user_id),
            action,
            source_service,
        )
    }

    /// "Something changed" with no further detail
    pub fn hint(table: InteractionTable, source_service: String) -> Self {
        Self::new(table, None, ChangeAction::Unknown, source_service)
    }
}

/// Destination for change notifications
#[async_trait::async_trait]
pub trait ChangeSink: Send + Sync {
    /// Returns the number of receivers that got the message
    async fn publish(&self, msg: ChangeNotification) -> Result<usize>;
}

/// Publisher for change notifications over Redis Pub/Sub
#[derive(Clone)]
pub struct ChangePublisher {
    client: ConnectionManager,
    channel: String,
    service_name: String,
    stats: StatsCollector,
}

impl ChangePublisher {
    /// Default Redis channel for interaction changes
    pub const DEFAULT_CHANNEL: &'static str = "interactions:changed";

    /// Create new publisher
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `service_name` - Name of the publishing service (e.g., "media-service")
    pub async fn new(redis_url: &str, service_name: String) -> Result<Self> {
        Self::with_channel(redis_url, service_name, Self::DEFAULT_CHANNEL.to_string()).await
    }

    /// Create publisher with custom channel
    pub async fn with_channel(
        redis_url: &str,
        service_name: String,
        channel: String,
    ) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            client: connection,
            channel,
            service_name,
            stats: StatsCollector::new(),
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn stats(&self) -> ChangeStats {
        self.stats.snapshot()
    }

    /// Notify that `user_id`'s likes changed
    pub async fn notify_like(&self, user_id: Uuid, action: ChangeAction) -> Result<usize> {
        let msg = ChangeNotification::like_changed(user_id, action, self.service_name.clone());
        self.publish(msg).await
    }

    /// Notify that `user_id`'s follows changed
    pub async fn notify_follow(&self, user_id: Uuid, action: ChangeAction) -> Result<usize> {
        let msg = ChangeNotification::follow_changed(user_id, action, self.service_name.clone());
        self.publish(msg).await
    }
}

#[async_trait::async_trait]
impl ChangeSink for ChangePublisher {
    async fn publish(&self, msg: ChangeNotification) -> Result<usize> {
        let payload = serde_json::to_string(&msg)?;

        debug!(
            message_id = %msg.message_id,
            table = %msg.table,
            action = ?msg.action,
            channel = %self.channel,
            "Publishing change notification"
        );

        let mut conn = self.client.clone();
        let subscriber_count: usize = match conn.publish(&self.channel, payload).await {
            Ok(count) => count,
            Err(e) => {
                self.stats.record_error();
                return Err(e.into());
            }
        };
        self.stats.record_publish();

        info!(
            message_id = %msg.message_id,
            subscribers = subscriber_count,
            "Change notification published"
        );

        Ok(subscriber_count)
    }
}

/// Subscriber for change notifications over Redis Pub/Sub
pub struct ChangeSubscriber {
    client: Client,
    channel: String,
    stats: StatsCollector,
}

impl ChangeSubscriber {
    pub async fn new(redis_url: &str) -> Result<Self> {
        Self::with_channel(redis_url, ChangePublisher::DEFAULT_CHANNEL.to_string()).await
    }

    /// Create subscriber with custom channel
    pub async fn with_channel(redis_url: &str, channel: String) -> Result<Self> {
        let client = Client::open(redis_url)?;

        Ok(Self {
            client,
            channel,
            stats: StatsCollector::new(),
        })
    }

    pub fn stats(&self) -> ChangeStats {
        self.stats.snapshot()
    }

    /// Subscribe to change notifications with callback
    ///
    /// Returns JoinHandle for the background task
    pub async fn subscribe<F, Fut>(&self, callback: F) -> Result<JoinHandle<()>>
    where
        F: Fn(ChangeNotification) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;

        info!(channel = %self.channel, "Subscribed to interaction changes");

        let callback = Arc::new(callback);
        let stats = self.stats.clone();

        let handle = tokio::spawn(async move {
            let mut stream = pubsub.on_message();

            while let Some(msg) = stream.next().await {
                let payload = match msg.get_payload::<String>() {
                    Ok(p) => p,
                    Err(e) => {
                        error!(error = ?e, "Failed to get message payload");
                        stats.record_error();
                        continue;
                    }
                };

                let notification: ChangeNotification = match serde_json::from_str(&payload) {
                    Ok(m) => m,
                    Err(e) => {
                        error!(error = ?e, payload = %payload, "Failed to deserialize notification");
                        stats.record_error();
                        continue;
                    }
                };

                dispatch(&stats, callback.as_ref(), notification).await;
            }

            warn!("Interaction change subscription ended");
        });

        Ok(handle)
    }

    /// Stop subscription
    pub async fn unsubscribe(&self, handle: JoinHandle<()>) -> Result<()> {
        handle.abort();
        Ok(())
    }
}

/// In-process change channel on a tokio broadcast channel
///
/// Subscriptions registered before a `publish` call are guaranteed to see it.
/// A subscriber that falls more than `capacity` messages behind skips the
/// missed ones.
#[derive(Clone)]
pub struct LocalChangeBus {
    sender: broadcast::Sender<ChangeNotification>,
    stats: StatsCollector,
}

impl LocalChangeBus {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            stats: StatsCollector::new(),
        }
    }

    pub fn stats(&self) -> ChangeStats {
        self.stats.snapshot()
    }

    /// Deliver `callback` every notification published from now on
    pub fn subscribe<F, Fut>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(ChangeNotification) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let mut receiver = self.sender.subscribe();
        let stats = self.stats.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(notification) => dispatch(&stats, &callback, notification).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Change subscriber lagged, notifications dropped");
                        stats.record_dropped(skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            debug!("Local change subscription ended");
        })
    }
}

impl Default for LocalChangeBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[async_trait::async_trait]
impl ChangeSink for LocalChangeBus {
    async fn publish(&self, msg: ChangeNotification) -> Result<usize> {
        debug!(
            message_id = %msg.message_id,
            table = %msg.table,
            action = ?msg.action,
            "Publishing local change notification"
        );
        self.stats.record_publish();
        // No live receivers is not an error
        Ok(self.sender.send(msg).unwrap_or(0))
    }
}

async fn dispatch<F, Fut>(stats: &StatsCollector, callback: &F, notification: ChangeNotification)
where
    F: Fn(ChangeNotification) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    stats.record_receive();
    let delay = chrono::Utc::now() - notification.timestamp;
    stats.record_latency(delay.num_microseconds().unwrap_or(0).max(0) as f64 / 1000.0);

    debug!(
        message_id = %notification.message_id,
        table = %notification.table,
        action = ?notification.action,
        "Received change notification"
    );

    let message_id = notification.message_id.clone();
    if let Err(e) = callback(notification).await {
        stats.record_error();
        error!(
            error = ?e,
            message_id = %message_id,
            "Callback execution failed"
        );
    }
}
