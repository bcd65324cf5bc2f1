//! Application state shared across routes

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::config::Config;
use crate::protocol::MatchStatus;

/// Latest view of the simulation, published by the tick loop
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub tick: u64,
    #[serde(flatten)]
    pub status: MatchStatus,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    status: Arc<RwLock<Option<StatusSnapshot>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            status: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the published snapshot
    pub fn publish(&self, snapshot: StatusSnapshot) {
        *self.status.write() = Some(snapshot);
    }

    /// None until the first tick has run
    pub fn status(&self) -> Option<StatusSnapshot> {
        self.status.read().clone()
    }
}
