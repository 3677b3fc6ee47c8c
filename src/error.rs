use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::guard::InitError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("resource unavailable: {0}")]
    Unavailable(#[from] InitError),

    #[error("internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Recoverable: the next inbound call gets a fresh attempt, so
            // tell the caller to retry.
            AppError::Unavailable(error) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "resource_unavailable",
                    "message": "database is not ready",
                    "details": error.to_string(),
                    "retry": true,
                })),
            )
                .into_response(),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "request handling failed",
                    "retry": false,
                })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("collect body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn unavailable_maps_to_retryable_503() {
        let response =
            AppError::Unavailable(InitError::Timeout(Duration::from_secs(5))).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["error"], "resource_unavailable");
        assert_eq!(body["retry"], serde_json::Value::Bool(true));
        assert!(body["details"]
            .as_str()
            .is_some_and(|details| details.contains("timed out")));
    }

    #[tokio::test]
    async fn internal_maps_to_generic_500() {
        let response = AppError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["retry"], serde_json::Value::Bool(false));
    }
}
