use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use super::{require_caller, MediaHandlerState};
use crate::error::Result;

/// POST /api/v1/media/{id}/like
pub async fn like_media(
    path: web::Path<Uuid>,
    http_req: HttpRequest,
    state: web::Data<MediaHandlerState>,
) -> Result<HttpResponse> {
    let user_id = require_caller(&http_req)?;
    let media_id = path.into_inner();
    let changed = state.loader.like_media(user_id, media_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "media_id": media_id,
        "liked": true,
        "changed": changed,
    })))
}

/// DELETE /api/v1/media/{id}/like
pub async fn unlike_media(
    path: web::Path<Uuid>,
    http_req: HttpRequest,
    state: web::Data<MediaHandlerState>,
) -> Result<HttpResponse> {
    let user_id = require_caller(&http_req)?;
    let media_id = path.into_inner();
    let changed = state.loader.unlike_media(user_id, media_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "media_id": media_id,
        "liked": false,
        "changed": changed,
    })))
}

/// POST /api/v1/creators/{name}/follow
pub async fn follow_creator(
    path: web::Path<String>,
    http_req: HttpRequest,
    state: web::Data<MediaHandlerState>,
) -> Result<HttpResponse> {
    let user_id = require_caller(&http_req)?;
    let creator = path.into_inner();
    let changed = state.loader.follow_creator(user_id, &creator).await?;

    Ok(HttpResponse::Ok().json(json!({
        "creator": creator,
        "following": true,
        "changed": changed,
    })))
}

/// DELETE /api/v1/creators/{name}/follow
pub async fn unfollow_creator(
    path: web::Path<String>,
    http_req: HttpRequest,
    state: web::Data<MediaHandlerState>,
) -> Result<HttpResponse> {
    let user_id = require_caller(&http_req)?;
    let creator = path.into_inner();
    let changed = state.loader.unfollow_creator(user_id, &creator).await?;

    Ok(HttpResponse::Ok().json(json!({
        "creator": creator,
        "following": false,
        "changed": changed,
    })))
}
