use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::{error::AppError, state::AppState};

/// Liveness probe. Answered from process-local state only: always 200 while
/// the process is up, whatever the database is doing.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resource = state.guard.state().await.as_str();

    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "resource": resource,
        "uptime_secs": state.started.elapsed().as_secs(),
    }))
}

/// Reaches the database through the guarded handle. The readiness gate has
/// already run by the time this executes.
pub async fn db_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .guard
        .handle()
        .await
        .ok_or_else(|| AppError::Internal("resource handle missing after readiness gate".into()))?;

    let info = handle
        .describe()
        .await
        .map_err(|e| AppError::Internal(Box::new(e)))?;

    Ok(Json(info))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use axum::http::StatusCode;

    use super::*;
    use crate::{
        config::Config,
        database::{Connector, ConnectorError, Resource},
        guard::ReadyState,
    };

    struct NeverConnector;

    #[async_trait]
    impl Connector for NeverConnector {
        async fn connect(&self) -> Result<Arc<dyn Resource>, ConnectorError> {
            Err(ConnectorError::Rejected("unreachable in this test".to_string()))
        }
    }

    fn cold_state() -> AppState {
        let config = Config {
            port: 0,
            mongo_uri: String::new(),
            database: "portal".to_string(),
            init_timeout: Duration::from_millis(50),
            probe_paths: vec!["/api/health".to_string()],
        };
        AppState::new(config, Arc::new(NeverConnector))
    }

    #[tokio::test]
    async fn health_answers_200_while_resource_is_down() {
        let state = cold_state();

        let response = health_handler(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("collect body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");

        assert_eq!(body["status"], "ok");
        assert_eq!(body["resource"], "disconnected");
        assert!(body["timestamp"].as_str().is_some());
        assert!(body["uptime_secs"].as_u64().is_some());
    }

    #[tokio::test]
    async fn health_never_starts_an_initialization_attempt() {
        let state = cold_state();

        health_handler(State(state.clone())).await.into_response();

        assert_eq!(state.guard.state().await, ReadyState::Disconnected);
    }
}
