//! Like and follow actions
//!
//! Under `UntilInvalidated` the caller's cached interaction state is updated
//! before the remote write so that an immediately following page load reflects
//! the action. `AlwaysRefetch` never reads that cache, so no update is made.
//! If the write fails the entry is dropped, forcing the next load to rebuild it
//! from the store. Successful writes are announced on the change sink, if one
//! is set.

use super::{InteractionFreshness, MediaPageLoader};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::InteractionState;
use cache_invalidation::{ChangeAction, ChangeNotification};
use flourish_cache::CacheKey;
use tracing::{debug, warn};
use uuid::Uuid;

impl MediaPageLoader {
    pub async fn like_media(&self, user_id: Uuid, media_id: Uuid) -> Result<bool> {
        self.set_like(user_id, media_id, true).await
    }

    pub async fn unlike_media(&self, user_id: Uuid, media_id: Uuid) -> Result<bool> {
        self.set_like(user_id, media_id, false).await
    }

    pub async fn follow_creator(&self, user_id: Uuid, creator: &str) -> Result<bool> {
        self.set_follow(user_id, creator, true).await
    }

    pub async fn unfollow_creator(&self, user_id: Uuid, creator: &str) -> Result<bool> {
        self.set_follow(user_id, creator, false).await
    }

    async fn set_like(&self, user_id: Uuid, media_id: Uuid, liked: bool) -> Result<bool> {
        let key = CacheKey::interactions(user_id);
        self.update_cached_state(&key, |state| {
            if liked {
                state.liked_media_ids.insert(media_id);
            } else {
                state.liked_media_ids.remove(&media_id);
            }
        });

        let result = self.interactions.set_like(user_id, media_id, liked).await;
        metrics::record_remote_fetch("set_like", &result);
        let changed = self.settle(&key, result)?;

        debug!(user_id = %user_id, media_id = %media_id, liked = liked, changed = changed, "Like updated");
        if changed {
            let notification = ChangeNotification::like_changed(
                user_id,
                action_for(liked),
                self.service_name.clone(),
            );
            self.announce(notification).await;
        }
        Ok(changed)
    }

    async fn set_follow(&self, user_id: Uuid, creator: &str, following: bool) -> Result<bool> {
        let creator = creator.trim();
        if creator.is_empty() {
            return Err(AppError::InvalidInput("creator name must not be empty".to_string()));
        }

        let key = CacheKey::interactions(user_id);
        self.update_cached_state(&key, |state| {
            if following {
                state.followed_creators.insert(creator.to_string());
            } else {
                state.followed_creators.remove(creator);
            }
        });

        let result = self.interactions.set_follow(user_id, creator, following).await;
        metrics::record_remote_fetch("set_follow", &result);
        let changed = self.settle(&key, result)?;

        debug!(user_id = %user_id, creator = %creator, following = following, changed = changed, "Follow updated");
        if changed {
            let notification = ChangeNotification::follow_changed(
                user_id,
                action_for(following),
                self.service_name.clone(),
            );
            self.announce(notification).await;
        }
        Ok(changed)
    }

    /// Apply `update` to the cached state, if there is a fresh one
    fn update_cached_state<F>(&self, key: &str, update: F)
    where
        F: FnOnce(&mut InteractionState),
    {
        if self.config().freshness == InteractionFreshness::AlwaysRefetch {
            return;
        }

        let epoch = self.interaction_epoch();
        if let Some(mut state) = self.interaction_cache.get(key) {
            update(&mut state);
            self.store_interaction_state(key, state, epoch);
        }
    }

    /// Roll back the optimistic update if the write failed
    fn settle(&self, key: &str, result: Result<bool>) -> Result<bool> {
        result.map_err(|e| {
            warn!(key = %key, error = %e, "Interaction write failed, dropping cached state");
            self.interaction_cache.delete(key);
            e
        })
    }

    async fn announce(&self, notification: ChangeNotification) {
        let Some(sink) = &self.change_sink else {
            return;
        };

        // A failed publish does not fail the write
        if let Err(e) = sink.publish(notification).await {
            warn!(error = %e, "Failed to publish interaction change");
        }
    }
}

fn action_for(added: bool) -> ChangeAction {
    if added {
        ChangeAction::Insert
    } else {
        ChangeAction::Delete
    }
}
