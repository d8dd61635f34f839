use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of one load-test run. Transitions happen in declaration order
/// and none is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RunPhase {
    Idle,
    RampingUp,
    Running,
    Draining,
    Reporting,
    Done,
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Phase(RunPhase),
    Tick {
        elapsed: Duration,
        active_users: u64,
        total_requests: u64,
        failed_requests: u64,
        /// Requests per second over the last monitor interval.
        rps_now: f64,
    },
}

pub type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
