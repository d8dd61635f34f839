use serde::Serialize;

use super::metrics::Statistics;

/// The agreed results shape handed to CI notification senders (Slack/email
/// glue). Those senders live outside this crate; we only produce the shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Run duration in seconds.
    pub duration: f64,
    pub test_type: String,
    /// RFC3339 generation time.
    pub timestamp: String,
}

impl ResultsSummary {
    pub fn from_statistics(stats: &Statistics) -> Self {
        Self {
            total: stats.summary.total_requests,
            passed: stats.summary.successful_requests,
            failed: stats.summary.failed_requests,
            skipped: 0,
            duration: stats.summary.duration_secs,
            test_type: "performance".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::config::Thresholds;
    use crate::runner::metrics::MetricsCollector;

    #[test]
    fn maps_statistics_counts() {
        let c = MetricsCollector::new(Thresholds::default());
        c.start();
        c.record_request("/api/menu", &reqwest::Method::GET, 10, 200, true);
        c.record_request("/api/menu", &reqwest::Method::GET, 10, 503, false);
        c.stop();

        let summary = ResultsSummary::from_statistics(&c.statistics());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.test_type, "performance");

        let json = match serde_json::to_value(&summary) {
            Ok(v) => v,
            Err(err) => panic!("serialize failed: {err}"),
        };
        assert!(json.get("testType").is_some());
    }
}
