/// Data models for media-service
///
/// This module defines structures for:
/// - MediaItem: one row of the `media_content` table (fixed 17-column projection)
/// - InteractionState: a user's liked media ids and followed creators
/// - MediaPage: a page of items merged with the caller's interaction state
///
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ========================================
// Content Models
// ========================================

/// Top-level content category, stored in the `type` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Stream,
    Listen,
    Blog,
    Gallery,
    Resources,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 5] = [
        Self::Stream,
        Self::Listen,
        Self::Blog,
        Self::Gallery,
        Self::Resources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Listen => "listen",
            Self::Blog => "blog",
            Self::Gallery => "gallery",
            Self::Resources => "resources",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream" => Ok(Self::Stream),
            "listen" => Ok(Self::Listen),
            "blog" => Ok(Self::Blog),
            "gallery" => Ok(Self::Gallery),
            "resources" => Ok(Self::Resources),
            other => Err(AppError::InvalidInput(format!(
                "Unknown content category: {}",
                other
            ))),
        }
    }
}

/// Media database entity
///
/// Counters are maintained by database triggers and only ever read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaItem {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub media_type: String,
    /// Sub-genre within the top-level type
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub title: String,
    pub creator: String,
    pub thumbnail_url: Option<String>,
    pub duration: Option<String>,
    pub read_time: Option<String>,
    pub views: i64,
    pub plays: i64,
    pub sales: i64,
    pub likes: i64,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

/// Optional narrowing of a category listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaFilter {
    /// Matches the `category` (sub-genre) column exactly
    pub genre: Option<String>,
    pub premium: Option<bool>,
}

impl MediaFilter {
    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.premium.is_none()
    }

    /// Stable key fragment; unfiltered listings share the tag `all`.
    ///
    /// Genres are user supplied, so a present genre is length-prefixed and an
    /// absent one is written as `-`. No genre value can spell another filter.
    pub fn cache_tag(&self) -> String {
        if self.is_empty() {
            return "all".to_string();
        }

        let genre = match &self.genre {
            Some(genre) => format!("genre:{}:{}", genre.len(), genre),
            None => "genre:-".to_string(),
        };
        let premium = match self.premium {
            Some(true) => "premium",
            Some(false) => "free",
            None => "any",
        };
        format!("{}|{}", genre, premium)
    }
}

/// Range-bounded content query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    pub category: ContentCategory,
    pub filter: MediaFilter,
    pub offset: i64,
    pub limit: i64,
}

/// One page of content as returned by the content store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPage {
    pub items: Vec<MediaItem>,
    /// Exact number of rows matching the query, ignoring the range
    pub total_count: i64,
}

// ========================================
// Interaction Models
// ========================================

/// Liked media ids and followed creator names of one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionState {
    pub liked_media_ids: HashSet<Uuid>,
    pub followed_creators: HashSet<String>,
}

impl InteractionState {
    pub fn is_liked(&self, media_id: &Uuid) -> bool {
        self.liked_media_ids.contains(media_id)
    }

    pub fn is_following(&self, creator: &str) -> bool {
        self.followed_creators.contains(creator)
    }
}

// ========================================
// Response Models
// ========================================

/// A media item with the caller's derived interaction flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCard {
    #[serde(flatten)]
    pub item: MediaItem,
    pub is_liked: bool,
    pub is_followed: bool,
}

impl MediaCard {
    pub fn merge(item: MediaItem, state: Option<&InteractionState>) -> Self {
        let (is_liked, is_followed) = match state {
            Some(state) => (state.is_liked(&item.id), state.is_following(&item.creator)),
            None => (false, false),
        };
        Self {
            item,
            is_liked,
            is_followed,
        }
    }
}

/// Where the content of a page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    Cache,
    Remote,
}

impl PageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Remote => "remote",
        }
    }
}

/// Page response for a category listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPage {
    pub category: ContentCategory,
    pub filter: MediaFilter,
    pub page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub has_more: bool,
    pub source: PageSource,
    pub items: Vec<MediaCard>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(creator: &str) -> MediaItem {
        MediaItem {
            id: Uuid::new_v4(),
            media_type: "stream".to_string(),
            category: Some("music-video".to_string()),
            content_type: Some("video".to_string()),
            title: "Sunset Session".to_string(),
            creator: creator.to_string(),
            thumbnail_url: None,
            duration: Some("3:45".to_string()),
            read_time: None,
            views: 10,
            plays: 4,
            sales: 0,
            likes: 2,
            price: None,
            rating: Some(4.5),
            is_premium: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_round_trip() {
        for category in ContentCategory::ALL {
            assert_eq!(category.as_str().parse::<ContentCategory>().unwrap(), category);
        }
        assert!(matches!(
            "podcasts".parse::<ContentCategory>(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_filter_cache_tag() {
        assert_eq!(MediaFilter::default().cache_tag(), "all");

        let filter = MediaFilter {
            genre: Some("jazz".to_string()),
            premium: Some(true),
        };
        assert_eq!(filter.cache_tag(), "genre:4:jazz|premium");

        let premium_only = MediaFilter {
            genre: None,
            premium: Some(false),
        };
        assert_eq!(premium_only.cache_tag(), "genre:-|free");
    }

    #[test]
    fn test_filter_cache_tag_genre_cannot_spell_another_filter() {
        let filters = [
            MediaFilter { genre: None, premium: Some(true) },
            MediaFilter { genre: Some("*".to_string()), premium: Some(true) },
            MediaFilter { genre: Some("-".to_string()), premium: Some(true) },
            MediaFilter { genre: Some("all".to_string()), premium: None },
            MediaFilter { genre: Some("a|premium".to_string()), premium: None },
            MediaFilter { genre: Some("a".to_string()), premium: Some(true) },
            MediaFilter { genre: None, premium: None },
        ];

        let tags: std::collections::HashSet<String> =
            filters.iter().map(MediaFilter::cache_tag).collect();
        assert_eq!(tags.len(), filters.len());
    }

    #[test]
    fn test_merge_anonymous() {
        let card = MediaCard::merge(item("ada"), None);
        assert!(!card.is_liked);
        assert!(!card.is_followed);
    }

    #[test]
    fn test_merge_with_state() {
        let liked = item("ada");
        let mut state = InteractionState::default();
        state.liked_media_ids.insert(liked.id);
        state.followed_creators.insert("grace".to_string());

        let card = MediaCard::merge(liked, Some(&state));
        assert!(card.is_liked);
        assert!(!card.is_followed);

        let card = MediaCard::merge(item("grace"), Some(&state));
        assert!(!card.is_liked);
        assert!(card.is_followed);
    }

    #[test]
    fn test_card_serializes_flat() {
        let card = MediaCard::merge(item("ada"), None);
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "stream");
        assert_eq!(json["creator"], "ada");
        assert_eq!(json["is_liked"], false);
    }
}
