/// HTTP handlers for media-service
///
/// This module contains handlers for:
/// - Media: paginated category listings merged with the caller's likes/follows
/// - Interactions: like/unlike media, follow/unfollow creators
/// - Health: liveness plus cache sizes
///
/// The caller is identified by the `X-User-Id` header set by the gateway.
use actix_web::{web, HttpRequest};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::services::MediaPageLoader;

pub mod health;
pub mod interactions;
pub mod media;

pub use health::health_check;
pub use interactions::{follow_creator, like_media, unfollow_creator, unlike_media};
pub use media::get_media_page;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Shared state for all media handlers
pub struct MediaHandlerState {
    pub loader: Arc<MediaPageLoader>,
}

/// Register every `/api/v1` route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .route("/media/{category}", web::get().to(get_media_page))
            .route("/media/{id}/like", web::post().to(like_media))
            .route("/media/{id}/like", web::delete().to(unlike_media))
            .route("/creators/{name}/follow", web::post().to(follow_creator))
            .route("/creators/{name}/follow", web::delete().to(unfollow_creator)),
    );
}

/// Caller identity, if the request carries one
pub fn caller_id(req: &HttpRequest) -> Result<Option<Uuid>> {
    let Some(value) = req.headers().get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| AppError::InvalidInput("Invalid X-User-Id header encoding".to_string()))?;
    Uuid::parse_str(raw.trim())
        .map(Some)
        .map_err(|_| AppError::InvalidInput("Invalid X-User-Id header".to_string()))
}

pub(crate) fn require_caller(req: &HttpRequest) -> Result<Uuid> {
    caller_id(req)?.ok_or_else(|| AppError::Unauthorized("Missing user context".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_caller_id_absent() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(caller_id(&req).unwrap(), None);
        assert!(matches!(require_caller(&req), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_caller_id_parsed() {
        let user_id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_http_request();
        assert_eq!(caller_id(&req).unwrap(), Some(user_id));
    }

    #[test]
    fn test_caller_id_malformed() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        assert!(matches!(caller_id(&req), Err(AppError::InvalidInput(_))));
    }
}
