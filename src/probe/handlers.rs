use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::ProbeConfig;
use crate::health::{HealthMonitor, Snapshot};
use crate::probe::response::render;

/// Shared state for the probe adapters.
#[derive(Clone)]
pub struct ProbeState {
    pub monitor: HealthMonitor,
    pub config: Arc<ProbeConfig>,
}

impl ProbeState {
    pub fn new(monitor: HealthMonitor, config: ProbeConfig) -> Self {
        Self {
            monitor,
            config: Arc::new(config),
        }
    }

    /// Read the monitor (running every rule) and render the answer.
    pub fn respond(&self) -> Response {
        render(&self.monitor.state(), &self.config)
    }
}

/// Probe handler for hosts that mount it on their own route.
pub async fn probe_handler(State(state): State<ProbeState>) -> Response {
    state.respond()
}

/// JSON view of the monitor's counters and timers.
pub async fn details_handler(State(state): State<ProbeState>) -> Json<Snapshot> {
    Json(state.monitor.snapshot())
}

pub(crate) fn details_response(state: &ProbeState) -> Response {
    Json(state.monitor.snapshot()).into_response()
}
