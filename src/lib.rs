//! Documentation of a student portal gateway.
//!
//!
//!
//! # General Infrastructure
//! - One process serves the portal API behind the host's HTTP layer
//! - The host may create, freeze, and resume process instances at will, so
//!   the database dial happens lazily and its result is cached for the
//!   lifetime of the instance
//! - Several requests can be dispatched into a cold instance at once; the
//!   initializer guard coalesces them into a single dial
//! - Probe endpoints answer without touching the database so operators keep
//!   a liveness signal even while the database is down
//!
//!
//!
//! # Preventing Init Stampedes
//!
//! **Goal**: a cold instance that receives a burst of requests must dial the
//! database once, not once per request.
//!
//! - The first request flips the guard to Connecting and starts the dial
//! - Every request that arrives mid-dial attaches to the same settlement
//! - The dial races a fixed timeout so a hung database resolves every
//!   waiter with a clean retryable error instead of a host-level kill
//! - A failed episode resets fully; the next request starts a fresh dial
//!
//!
//!
//! # Setup
//!
//! Required environment:
//! ```sh
//! MONGO_URI=mongodb://localhost:27017
//! ```
//!
//! Optional, with defaults:
//! ```sh
//! PORTAL_PORT=5000
//! MONGO_DB=portal
//! INIT_TIMEOUT_MS=5000
//! PROBE_PATHS=/api/health,/health,/healthz
//! ```
//!
//! Run locally:
//! ```sh
//! RUST_LOG=info cargo run
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};

use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod routes;
pub mod state;

use config::Config;
use database::MongoConnector;
use dispatch::readiness_gate;
use routes::{db_handler, health_handler};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading configuration...");
    let config = Config::load();

    let connector = MongoConnector::new(&config)
        .await
        .expect("MONGO_URI misconfigured!");

    let state = AppState::new(config, Arc::new(connector));

    warm_up(&state);

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let mut app = Router::new().route("/api/db", get(db_handler));

    for path in &state.config.probe_paths {
        app = app.route(path, get(health_handler));
    }

    let app = app
        .layer(from_fn_with_state(state.clone(), readiness_gate))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

/// Dials the database in the background so a long-lived deployment is warm
/// before the first real request. Failure is not fatal here; the next
/// resource-dependent request retries through the guard.
fn warm_up(state: &AppState) {
    let guard = Arc::clone(&state.guard);

    tokio::spawn(async move {
        if let Err(e) = guard.ensure_ready().await {
            warn!("Warm-up connect failed, next request retries: {e}");
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
