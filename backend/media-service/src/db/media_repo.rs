/// Media repository - paginated reads of `media_content`
use super::ContentStore;
use crate::error::Result;
use crate::models::{ContentPage, MediaItem, MediaQuery};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

/// Repository for media listings
#[derive(Clone)]
pub struct PgMediaRepository {
    pool: PgPool,
}

impl PgMediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_items(&self, query: &MediaQuery) -> Result<Vec<MediaItem>> {
        let items = sqlx::query_as::<_, MediaItem>(
            r#"
            SELECT id, type, category, content_type, title, creator,
                   thumbnail_url, duration, read_time,
                   COALESCE(views, 0)::bigint AS views,
                   COALESCE(plays, 0)::bigint AS plays,
                   COALESCE(sales, 0)::bigint AS sales,
                   COALESCE(likes, 0)::bigint AS likes,
                   price::float8 AS price,
                   rating::float8 AS rating,
                   COALESCE(is_premium, false) AS is_premium,
                   created_at
            FROM media_content
            WHERE type = $1
              AND ($2::text IS NULL OR category = $2)
              AND ($3::boolean IS NULL OR is_premium = $3)
            ORDER BY created_at DESC, id
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(query.category.as_str())
        .bind(query.filter.genre.as_deref())
        .bind(query.filter.premium)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn count(&self, query: &MediaQuery) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM media_content
            WHERE type = $1
              AND ($2::text IS NULL OR category = $2)
              AND ($3::boolean IS NULL OR is_premium = $3)
            "#,
        )
        .bind(query.category.as_str())
        .bind(query.filter.genre.as_deref())
        .bind(query.filter.premium)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl ContentStore for PgMediaRepository {
    async fn fetch_page(&self, query: &MediaQuery) -> Result<ContentPage> {
        let (items, total_count) = tokio::try_join!(self.fetch_items(query), self.count(query))?;

        debug!(
            category = %query.category,
            offset = query.offset,
            returned = items.len(),
            total = total_count,
            "Fetched media page"
        );

        Ok(ContentPage { items, total_count })
    }
}
