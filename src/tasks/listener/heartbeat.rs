use std::sync::Arc;

use uuid::Uuid;

use crate::services::observability::{CheckIn, CheckInStatus, Observability};

/// Liveness check-ins tied to a listener's loop iterations rather than to
/// message volume: every `every`-th iteration opens a check-in which that
/// same iteration resolves.
pub(crate) struct HeartbeatReporter {
    monitor: String,
    every: u64,
    iteration: u64,
    observer: Arc<dyn Observability>,
}

impl HeartbeatReporter {
    pub(crate) fn new(
        monitor: impl Into<String>,
        every: u64,
        observer: Arc<dyn Observability>,
    ) -> Self {
        Self { monitor: monitor.into(), every: every.max(1), iteration: 0, observer }
    }

    /// Advances the iteration counter, opening a check-in on the first
    /// iteration and then once per cadence.
    pub(crate) async fn begin_iteration(&mut self) -> Option<CheckIn> {
        let due = self.iteration % self.every == 0;
        self.iteration = self.iteration.wrapping_add(1);
        if !due {
            return None;
        }

        let check_in = CheckIn { id: Uuid::new_v4(), monitor: self.monitor.clone() };
        if let Err(err) = self.observer.report_check_in(&check_in).await {
            tracing::warn!(
                monitor = %self.monitor,
                error = %err,
                "Failed to open heartbeat check-in"
            );
        }
        Some(check_in)
    }

    pub(crate) async fn finish_iteration(&self, check_in: Option<CheckIn>, outcome: CheckInStatus) {
        let Some(check_in) = check_in else {
            return;
        };

        if let Err(err) = self.observer.resolve_check_in(&check_in, outcome).await {
            tracing::warn!(
                monitor = %self.monitor,
                check_in_id = %check_in.id,
                error = %err,
                "Failed to resolve heartbeat check-in"
            );
        }
    }
}
