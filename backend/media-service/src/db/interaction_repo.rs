use super::InteractionStore;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

/// Repository for likes and follows
#[derive(Clone)]
pub struct PgInteractionRepository {
    pool: PgPool,
}

impl PgInteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionStore for PgInteractionRepository {
    async fn liked_media_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT media_id FROM likes
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn followed_creators(&self, user_id: Uuid) -> Result<HashSet<String>> {
        let creators: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT creator_name FROM follows
            WHERE follower_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(creators.into_iter().collect())
    }

    async fn set_like(&self, user_id: Uuid, media_id: Uuid, liked: bool) -> Result<bool> {
        let result = if liked {
            sqlx::query(
                r#"
                INSERT INTO likes (user_id, media_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, media_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(media_id)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                DELETE FROM likes
                WHERE user_id = $1 AND media_id = $2
                "#,
            )
            .bind(user_id)
            .bind(media_id)
            .execute(&self.pool)
            .await?
        };

        Ok(result.rows_affected() > 0)
    }

    async fn set_follow(&self, user_id: Uuid, creator: &str, following: bool) -> Result<bool> {
        let result = if following {
            sqlx::query(
                r#"
                INSERT INTO follows (follower_id, creator_name)
                VALUES ($1, $2)
                ON CONFLICT (follower_id, creator_name) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(creator)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                DELETE FROM follows
                WHERE follower_id = $1 AND creator_name = $2
                "#,
            )
            .bind(user_id)
            .bind(creator)
            .execute(&self.pool)
            .await?
        };

        Ok(result.rows_affected() > 0)
    }
}
