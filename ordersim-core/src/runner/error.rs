pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Http(#[from] crate::http::Error),

    #[error("failed to serialize statistics: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`concurrent_users` must be a positive integer")]
    InvalidUsers,

    #[error("`test_duration_secs` must be a positive integer")]
    InvalidDuration,

    #[error("`request_timeout_ms` must be a positive integer")]
    InvalidTimeout,

    #[error("`think_time.min_ms` must not exceed `think_time.max_ms`")]
    InvalidThinkTime,

    #[error("`scenarios` must be a non-empty list")]
    EmptyScenarios,

    #[error("scenario `{name}` has invalid weight {weight} (expected 0..=100)")]
    InvalidWeight { name: String, weight: u32 },

    #[error("total scenario weight must be positive")]
    ZeroTotalWeight,

    #[error("invalid `{field}` url: {url}")]
    InvalidUrl { field: &'static str, url: String },

    #[error("report file name must not be empty")]
    EmptyReportName,
}
