//! # Initializer Guard
//!
//! One-time setup of the database handle, shared by every request the
//! process serves.
//!
//! ## Requirements
//!
//! - Several near-simultaneous requests can land on a cold process; exactly
//!   one of them may dial the database
//! - A hanging dial must resolve every waiter within the configured bound,
//!   not block until the host kills the process
//! - A failed episode leaves no residue: the next request gets a clean
//!   fresh attempt
//!
//! ## Implementation
//!
//! - State machine: Disconnected -> Connecting -> {Connected | Failed},
//!   with Failed -> Connecting on the next call. Connected is re-checked
//!   against the handle's own readiness read on every fast path; an
//!   unhealthy handle restarts the cycle.
//! - Each Connecting episode owns one `watch` channel. Every caller that
//!   arrives during the episode awaits the same channel and observes the
//!   same settlement, success or failure. No polling loop.
//! - The dial runs in its own task racing `tokio::time::timeout`, so a
//!   caller that gives up and drops its request cannot strand the episode.
use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::database::{Connector, Resource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ReadyState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadyState::Disconnected => "disconnected",
            ReadyState::Connecting => "connecting",
            ReadyState::Connected => "connected",
            ReadyState::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InitError {
    #[error("resource initialization timed out after {0:?}")]
    Timeout(Duration),

    #[error("resource rejected initialization: {0}")]
    Rejected(String),
}

type Settlement = Option<Result<(), InitError>>;

struct Inner {
    state: ReadyState,
    handle: Option<Arc<dyn Resource>>,
    // Non-None exactly while state is Connecting.
    inflight: Option<watch::Receiver<Settlement>>,
}

pub struct InitGuard {
    connector: Arc<dyn Connector>,
    bound: Duration,
    inner: Mutex<Inner>,
}

impl InitGuard {
    pub fn new(connector: Arc<dyn Connector>, bound: Duration) -> Arc<Self> {
        Arc::new(Self {
            connector,
            bound,
            inner: Mutex::new(Inner {
                state: ReadyState::Disconnected,
                handle: None,
                inflight: None,
            }),
        })
    }

    pub async fn state(&self) -> ReadyState {
        self.inner.lock().await.state
    }

    pub async fn handle(&self) -> Option<Arc<dyn Resource>> {
        self.inner.lock().await.handle.clone()
    }

    /// Resolves once the resource is usable, or with this episode's error.
    /// Safe to call from any number of concurrent requests.
    pub async fn ensure_ready(self: &Arc<Self>) -> Result<(), InitError> {
        let mut rx = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                ReadyState::Connected => {
                    if inner.handle.as_ref().is_some_and(|h| h.healthy()) {
                        return Ok(());
                    }
                    warn!("Resource handle reports unhealthy, reconnecting");
                    self.begin_attempt(&mut inner)
                }
                ReadyState::Connecting => match inner.inflight.clone() {
                    Some(rx) => rx,
                    None => self.begin_attempt(&mut inner),
                },
                ReadyState::Disconnected | ReadyState::Failed => self.begin_attempt(&mut inner),
            }
        };

        let result = match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => match &*outcome {
                Some(result) => result.clone(),
                None => Err(InitError::Rejected(
                    "settlement channel yielded no outcome".to_string(),
                )),
            },
            Err(_) => Err(InitError::Rejected(
                "initialization task dropped before settling".to_string(),
            )),
        };
        result
    }

    /// Caller holds the inner lock; the lock is released before anyone
    /// awaits the returned channel.
    fn begin_attempt(self: &Arc<Self>, inner: &mut Inner) -> watch::Receiver<Settlement> {
        let (tx, rx) = watch::channel(None);
        inner.state = ReadyState::Connecting;
        inner.inflight = Some(rx.clone());
        info!("Resource initialization started");

        let guard = Arc::clone(self);
        let bound = self.bound;
        tokio::spawn(async move {
            let dialed = match tokio::time::timeout(bound, guard.connector.connect()).await {
                Ok(Ok(handle)) => Ok(handle),
                Ok(Err(e)) => Err(InitError::Rejected(e.to_string())),
                Err(_) => Err(InitError::Timeout(bound)),
            };

            let settled = {
                let mut inner = guard.inner.lock().await;
                inner.inflight = None;
                match dialed {
                    Ok(handle) => {
                        inner.state = ReadyState::Connected;
                        inner.handle = Some(handle);
                        info!("Resource initialization succeeded");
                        Ok(())
                    }
                    Err(e) => {
                        inner.state = ReadyState::Failed;
                        inner.handle = None;
                        warn!("Resource initialization failed: {e}");
                        Err(e)
                    }
                }
            };

            let _ = tx.send(Some(settled));
        });

        rx
    }
}
