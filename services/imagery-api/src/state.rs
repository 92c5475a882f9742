//! Shared handler state.

use std::sync::Arc;
use std::time::Duration;

use imagery::Orchestrator;
use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Deadline for one pipeline invocation
    pub timeout: Duration,
    /// Absent when no recorder was installed (tests)
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, timeout: Duration) -> Self {
        Self {
            orchestrator,
            timeout,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
