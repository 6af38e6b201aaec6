use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use super::{caller_id, MediaHandlerState};
use crate::error::Result;
use crate::models::{ContentCategory, MediaFilter};

#[derive(Debug, Deserialize)]
pub struct PageQueryParams {
    #[serde(default = "default_page")]
    pub page: u32,
    pub genre: Option<String>,
    pub premium: Option<bool>,
}

fn default_page() -> u32 {
    1
}

impl PageQueryParams {
    fn filter(&self) -> MediaFilter {
        MediaFilter {
            genre: self
                .genre
                .as_deref()
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
            premium: self.premium,
        }
    }
}

/// GET /api/v1/media/{category}
pub async fn get_media_page(
    path: web::Path<String>,
    query: web::Query<PageQueryParams>,
    http_req: HttpRequest,
    state: web::Data<MediaHandlerState>,
) -> Result<HttpResponse> {
    let category: ContentCategory = path.into_inner().parse()?;
    let user_id = caller_id(&http_req)?;
    let filter = query.filter();

    debug!(
        category = %category,
        page = query.page,
        authenticated = user_id.is_some(),
        "Media page request"
    );

    let page = state
        .loader
        .load_page_filtered(category, &filter, query.page, user_id)
        .await?;

    Ok(HttpResponse::Ok().json(page))
}
