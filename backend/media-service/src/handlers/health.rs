use actix_web::{web, HttpResponse};
use serde_json::json;

use super::MediaHandlerState;

/// GET /api/v1/health
pub async fn health_check(state: web::Data<MediaHandlerState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "media-service",
        "page_cache_entries": state.loader.page_cache().size(),
        "interaction_cache_entries": state.loader.interaction_cache().size(),
    }))
}
