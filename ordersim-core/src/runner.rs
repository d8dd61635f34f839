mod config;
mod error;
mod metrics;
mod progress;
mod report;
mod run;
mod scenario;
mod summary;
mod vu;

pub use config::{
    Credentials, Endpoints, LoadConfig, MenuItem, ReportConfig, ResponseTimeThresholds,
    ScenarioConfig, TestCard, TestData, ThinkTime, Thresholds,
};
pub use error::{Error, Result};
pub use metrics::{
    EndpointStatistics, ErrorRecord, MetricsCollector, RequestSample, ResponseTimes, Severity,
    Statistics, Summary, ThresholdViolation, evaluate_thresholds, percentile,
};
pub use progress::{ProgressEvent, ProgressFn, RunPhase};
pub use report::ReportGenerator;
pub use run::LoadTestRunner;
pub use scenario::{ScenarioEngine, ScenarioFlow, fill_path_params, pick_scenario};
pub use summary::ResultsSummary;
pub use vu::{StopSignal, VuContext, simulate_user};
