//! Request classification and the readiness gate.
//!
//! Probe paths answer from process-local state and must stay reachable while
//! the database is down, so they bypass the guard entirely. Everything else
//! waits on [`InitGuard::ensure_ready`](crate::guard::InitGuard::ensure_ready)
//! before it reaches a handler.
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    ResourceIndependent,
    ResourceDependent,
}

/// Pure function of the request path against the declared probe allow-list.
///
/// An entry matches exactly, as a whole-segment prefix (`/api/health/live`),
/// or as a whole-segment suffix (`/stage/api/health`, tolerating a prefix
/// added by the hosting platform). Substring lookalikes such as
/// `/api/healthcheck` never match.
pub fn classify(path: &str, probe_paths: &[String]) -> Classification {
    for probe in probe_paths {
        if path == probe
            || path
                .strip_prefix(probe.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
            || (path.len() > probe.len() && path.ends_with(probe.as_str()))
        {
            return Classification::ResourceIndependent;
        }
    }

    Classification::ResourceDependent
}

pub async fn readiness_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let classification = classify(request.uri().path(), &state.config.probe_paths);

    if classification == Classification::ResourceIndependent {
        return next.run(request).await;
    }

    if let Err(error) = state.guard.ensure_ready().await {
        return AppError::Unavailable(error).into_response();
    }

    next.run(request).await
}
