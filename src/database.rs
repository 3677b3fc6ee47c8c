//! # MongoDB
//!
//! The one external resource this process depends on.
//!
//! ## Requirements
//!
//! - One slow dial per process instance, reused by every request after that
//! - Options tuned for single-connection hosting: pool of 1, no minimum,
//!   server selection bounded by the same budget as the guard
//! - A dial that actually proves the server is reachable, not just a lazily
//!   constructed client
//!
//! ## Implementation
//!
//! - `Connector` builds a handle; `Resource` is the handle the rest of the
//!   process shares. The guard only ever talks to these traits, so tests run
//!   against in-memory fakes.
//! - The connection string is parsed once at startup. A bad URI kills the
//!   process before it ever binds a socket.
//! - `connect` runs a `ping` command to force server selection; the driver
//!   otherwise defers the dial until the first real operation.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use mongodb::{bson::doc, options::ClientOptions, Client, Database};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),

    #[error("connection rejected: {0}")]
    Rejected(String),
}

/// Factory for the external resource handle. Invoked only by the guard,
/// at most once per Connecting episode.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Arc<dyn Resource>, ConnectorError>;
}

/// Connected handle shared by all in-flight requests.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Cheap readiness read. Never blocks.
    fn healthy(&self) -> bool;

    async fn describe(&self) -> Result<ResourceInfo, ConnectorError>;
}

#[derive(Serialize)]
pub struct ResourceInfo {
    pub database: String,
    pub ping_ms: u128,
}

pub struct MongoConnector {
    options: ClientOptions,
    database: String,
}

impl MongoConnector {
    pub async fn new(config: &Config) -> Result<Self, ConnectorError> {
        let mut options = ClientOptions::parse(&config.mongo_uri).await?;

        options.server_selection_timeout = Some(config.init_timeout);
        options.connect_timeout = Some(config.init_timeout);
        options.max_pool_size = Some(1);
        options.min_pool_size = Some(0);
        options.heartbeat_freq = Some(Duration::from_secs(10));
        options.retry_writes = Some(true);
        options.retry_reads = Some(true);

        Ok(Self {
            options,
            database: config.database.clone(),
        })
    }
}

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(&self) -> Result<Arc<dyn Resource>, ConnectorError> {
        let client = Client::with_options(self.options.clone())?;
        let db = client.database(&self.database);

        db.run_command(doc! { "ping": 1 }).await?;
        info!("Connected to database {}", self.database);

        Ok(Arc::new(MongoResource { db }))
    }
}

struct MongoResource {
    db: Database,
}

#[async_trait]
impl Resource for MongoResource {
    fn healthy(&self) -> bool {
        // The driver keeps its own pool and re-dials dropped servers, so a
        // handle that connected once stays usable.
        true
    }

    async fn describe(&self) -> Result<ResourceInfo, ConnectorError> {
        let started = Instant::now();
        self.db.run_command(doc! { "ping": 1 }).await?;

        Ok(ResourceInfo {
            database: self.db.name().to_string(),
            ping_ms: started.elapsed().as_millis(),
        })
    }
}
