//! JSON response shaping.
//!
//! Every body carries `success`. Failures add `error` (short phrase) and
//! `details` (diagnostic); the HTTP status carries the category.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::error::RelayError;

/// Wrapper turning a `RelayError` into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

/// HTTP status for each failure category.
pub fn status_for(err: &RelayError) -> StatusCode {
    match err {
        RelayError::InvalidInput(_)
        | RelayError::PatternTooShort { .. }
        | RelayError::TooManyMatches { .. } => StatusCode::BAD_REQUEST,
        RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
        RelayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        RelayError::ProcessingTimeout { .. } => StatusCode::ACCEPTED,
        RelayError::ServerMisconfigured(_)
        | RelayError::StagingFailed(_)
        | RelayError::TransferFailed { .. }
        | RelayError::FinalizationFailed(_)
        | RelayError::ProcessingFailed { .. }
        | RelayError::UpstreamUnreachable(_)
        | RelayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(&err);

        let body = match &err {
            RelayError::RateLimited { reset_in_minutes } => json!({
                "success": false,
                "error": err.code(),
                "message": "Too many uploads. Please try again later.",
                "resetIn": reset_in_minutes,
            }),
            // Not a failure from the caller's point of view: the file exists
            // and can be rechecked by id.
            RelayError::ProcessingTimeout { asset_id, status, .. } => json!({
                "success": true,
                "ready": false,
                "status": status,
                "fileId": asset_id,
                "message": err.to_string(),
            }),
            RelayError::TooManyMatches { matched, .. } => json!({
                "success": false,
                "error": err.code(),
                "details": err.to_string(),
                "totalMatched": matched,
            }),
            RelayError::Unauthorized => json!({
                "success": false,
                "error": err.code(),
            }),
            _ => json!({
                "success": false,
                "error": err.code(),
                "details": err.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// `200 {success: true, ...payload}`.
pub fn success<T: Serialize>(status: StatusCode, payload: T) -> Response {
    #[derive(Serialize)]
    struct Envelope<T> {
        success: bool,
        #[serde(flatten)]
        payload: T,
    }

    (
        status,
        Json(Envelope {
            success: true,
            payload,
        }),
    )
        .into_response()
}

/// Reply for methods a route does not serve.
pub async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "success": false,
            "error": "Method not allowed",
        })),
    )
        .into_response()
}

/// Give the timeout layer's empty 408 the usual JSON shape. No handler
/// produces 408 itself.
pub async fn render_timeout(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    tracing::warn!("Request exceeded server.request_timeout_secs");
    (
        StatusCode::REQUEST_TIMEOUT,
        Json(json!({
            "success": false,
            "error": "Request timeout",
            "details": "the request did not complete in time",
        })),
    )
        .into_response()
}

/// Bare `OPTIONS` without CORS preflight headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limited_body() {
        let response = ApiError(RelayError::RateLimited { reset_in_minutes: 2 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["resetIn"], 2);
    }

    #[tokio::test]
    async fn test_timeout_is_accepted_with_file_id() {
        let response = ApiError(RelayError::ProcessingTimeout {
            asset_id: "gid://shopify/MediaImage/7".into(),
            status: "PROCESSING".into(),
            waited_secs: 20,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["ready"], false);
        assert_eq!(body["fileId"], "gid://shopify/MediaImage/7");
    }

    #[tokio::test]
    async fn test_transfer_failure_details() {
        let response = ApiError(RelayError::TransferFailed {
            status: 403,
            body: "AccessDenied".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to upload file to storage");
        assert!(body["details"].as_str().unwrap().contains("AccessDenied"));
    }

    #[tokio::test]
    async fn test_timeout_gets_json_body() {
        let response = render_timeout(StatusCode::REQUEST_TIMEOUT.into_response()).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Request timeout");

        let untouched = render_timeout(StatusCode::NO_CONTENT.into_response()).await;
        assert_eq!(untouched.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&RelayError::PatternTooShort { min: 2 }), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&RelayError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(&RelayError::ServerMisconfigured(String::new())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_success_envelope_flattens() {
        let response = success(StatusCode::OK, json!({ "url": "https://x" }));
        let body = body_json(response).await;
        assert_eq!(body, json!({ "success": true, "url": "https://x" }));
    }
}
