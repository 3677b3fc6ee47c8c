use std::{sync::Arc, time::Instant};

use crate::{config::Config, database::Connector, guard::InitGuard};

/// Process-wide state, created once and cloned into every handler. The guard
/// is the only writer of the resource handle; handlers read through it.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub guard: Arc<InitGuard>,
    pub started: Instant,
}

impl AppState {
    pub fn new(config: Config, connector: Arc<dyn Connector>) -> Self {
        let guard = InitGuard::new(connector, config.init_timeout);

        Self {
            config: Arc::new(config),
            guard,
            started: Instant::now(),
        }
    }
}
