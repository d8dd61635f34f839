use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use super::config::Thresholds;

/// One recorded HTTP call attempt. Immutable once appended.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSample {
    /// Endpoint template path, not the substituted URL, so per-endpoint
    /// rollups don't fragment per entity id.
    pub endpoint: String,
    pub method: String,
    pub response_time_ms: u64,
    /// 0 when the call never reached the server.
    pub status_code: u16,
    pub success: bool,
    /// Epoch millis at completion.
    pub timestamp_ms: u64,
}

/// Failed-sample view, created at the same moment as its source sample.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdViolation {
    pub metric: String,
    pub actual: f64,
    pub threshold: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Percent, rounded to 2 decimals. 0 for an empty run.
    pub success_rate: f64,
    /// Percent, rounded to 2 decimals. 0 for an empty run.
    pub error_rate: f64,
    pub duration_secs: f64,
    /// Requests per second over the run duration.
    pub throughput: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimes {
    pub min_ms: u64,
    pub max_ms: u64,
    pub avg_ms: f64,
    pub p50_ms: u64,
    pub p90_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatistics {
    pub count: u64,
    pub success: u64,
    pub failed: u64,
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: u64,
    pub max_response_time_ms: u64,
    pub p95_response_time_ms: u64,
    /// Percent, rounded to 2 decimals.
    pub success_rate: f64,
}

/// Everything `statistics()` computes, in one serializable snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub summary: Summary,
    pub response_times: ResponseTimes,
    pub by_endpoint: BTreeMap<String, EndpointStatistics>,
    pub errors: Vec<ErrorRecord>,
    pub threshold_violations: Vec<ThresholdViolation>,
}

#[derive(Debug, Default)]
struct Recorded {
    samples: Vec<RequestSample>,
    errors: Vec<ErrorRecord>,
}

/// Single source of truth for everything observed during a run.
///
/// Recording is invoked concurrently from every virtual-user task; the
/// append-and-increment sequence holds the sample lock so
/// `successful + failed == samples.len()` is never observably violated.
/// Query operations are pure over already-recorded state and never fail.
#[derive(Debug)]
pub struct MetricsCollector {
    thresholds: Thresholds,

    /// Retained in full for the whole run. This bounds feasible duration and
    /// concurrency on memory-constrained hosts; long-running deployments
    /// would need to stream samples out instead.
    recorded: Mutex<Recorded>,

    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    active_users: AtomicU64,

    started_ms: OnceLock<u64>,
    stopped_ms: OnceLock<u64>,
}

impl MetricsCollector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            recorded: Mutex::new(Recorded::default()),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            active_users: AtomicU64::new(0),
            started_ms: OnceLock::new(),
            stopped_ms: OnceLock::new(),
        }
    }

    /// Marks the run start. Set-once; repeat calls are ignored.
    pub fn start(&self) {
        let _ = self.started_ms.set(now_ms());
    }

    /// Marks the run end. Must follow `start()`; called after every virtual
    /// user has ceased issuing requests so duration and throughput are
    /// well-defined. Set-once; repeat calls are ignored.
    pub fn stop(&self) {
        if self.started_ms.get().is_some() {
            let _ = self.stopped_ms.set(now_ms());
        }
    }

    pub fn record_request(
        &self,
        endpoint: &str,
        method: &reqwest::Method,
        response_time_ms: u64,
        status_code: u16,
        success: bool,
    ) {
        let timestamp_ms = now_ms();
        let sample = RequestSample {
            endpoint: endpoint.to_string(),
            method: method.as_str().to_string(),
            response_time_ms,
            status_code,
            success,
            timestamp_ms,
        };

        let mut recorded = self
            .recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !success {
            recorded.errors.push(ErrorRecord {
                endpoint: sample.endpoint.clone(),
                method: sample.method.clone(),
                status_code,
                timestamp_ms,
            });
        }
        recorded.samples.push(sample);

        // Totals move with the vector while the lock is held, keeping the
        // counts-match-samples invariant intact under parallel recording.
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Last-write-wins gauge of currently active virtual users.
    pub fn update_active_users(&self, count: u64) {
        self.active_users.store(count, Ordering::Relaxed);
    }

    pub fn active_users(&self) -> u64 {
        self.active_users.load(Ordering::Relaxed)
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn successful_requests(&self) -> u64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    /// Run duration in seconds. Before `stop()` this is a live value
    /// measured to now (used by progress ticks); terminal statistics must be
    /// taken after `stop()`.
    pub fn duration_secs(&self) -> f64 {
        let Some(started) = self.started_ms.get() else {
            return 0.0;
        };
        let ended = self.stopped_ms.get().copied().unwrap_or_else(now_ms);
        (ended.saturating_sub(*started)) as f64 / 1000.0
    }

    /// Computes the full statistics snapshot. Pure over recorded state; safe
    /// on an empty run (all rates and percentiles report 0).
    pub fn statistics(&self) -> Statistics {
        let (times, by_endpoint, errors, successful) = {
            let recorded = self
                .recorded
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            let times: Vec<u64> = recorded
                .samples
                .iter()
                .map(|s| s.response_time_ms)
                .collect();

            let mut groups: BTreeMap<String, Vec<(u64, bool)>> = BTreeMap::new();
            for s in &recorded.samples {
                groups
                    .entry(s.endpoint.clone())
                    .or_default()
                    .push((s.response_time_ms, s.success));
            }

            // Totals are bumped under this lock, so reading them here yields
            // a snapshot consistent with the sample vector.
            (
                times,
                groups,
                recorded.errors.clone(),
                self.successful_requests(),
            )
        };

        let total = times.len() as u64;
        let failed = total.saturating_sub(successful);
        let duration_secs = self.duration_secs();

        let summary = Summary {
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            success_rate: rate_percent(successful, total),
            error_rate: rate_percent(failed, total),
            duration_secs: round2(duration_secs),
            throughput: if duration_secs > 0.0 {
                round2(total as f64 / duration_secs)
            } else {
                0.0
            },
        };

        let response_times = ResponseTimes {
            min_ms: times.iter().copied().min().unwrap_or(0),
            max_ms: times.iter().copied().max().unwrap_or(0),
            avg_ms: round2(mean(&times)),
            p50_ms: percentile(&times, 50.0),
            p90_ms: percentile(&times, 90.0),
            p95_ms: percentile(&times, 95.0),
            p99_ms: percentile(&times, 99.0),
        };

        let by_endpoint = by_endpoint
            .into_iter()
            .map(|(endpoint, samples)| {
                let times: Vec<u64> = samples.iter().map(|(t, _)| *t).collect();
                let count = samples.len() as u64;
                let success = samples.iter().filter(|(_, ok)| *ok).count() as u64;
                let stats = EndpointStatistics {
                    count,
                    success,
                    failed: count - success,
                    avg_response_time_ms: round2(mean(&times)),
                    min_response_time_ms: times.iter().copied().min().unwrap_or(0),
                    max_response_time_ms: times.iter().copied().max().unwrap_or(0),
                    p95_response_time_ms: percentile(&times, 95.0),
                    success_rate: rate_percent(success, count),
                };
                (endpoint, stats)
            })
            .collect();

        let threshold_violations =
            evaluate_thresholds(&self.thresholds, &response_times, &summary);

        Statistics {
            summary,
            response_times,
            by_endpoint,
            errors,
            threshold_violations,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.statistics())
    }

    /// One row per recorded request, header first.
    pub fn to_csv(&self) -> String {
        let recorded = self
            .recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut out = String::new();
        out.push_str("Timestamp,Endpoint,Method,Response Time (ms),Status Code,Success\n");
        for s in &recorded.samples {
            writeln!(
                &mut out,
                "{},{},{},{},{},{}",
                iso8601(s.timestamp_ms),
                s.endpoint,
                s.method,
                s.response_time_ms,
                s.status_code,
                s.success
            )
            .ok();
        }
        out
    }
}

/// Nearest-rank percentile: the value at rank `ceil(p/100 * n)` (1-indexed)
/// of the ascending sort. 0 for an empty list. The ceiling tie-break is
/// deliberate and must not be replaced with interpolation.
pub fn percentile(values: &[u64], p: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

/// Fixed-order threshold policy: P50 (warning), P95 (critical), error rate
/// (critical), throughput (warning). Deterministic for fixed inputs.
pub fn evaluate_thresholds(
    thresholds: &Thresholds,
    response_times: &ResponseTimes,
    summary: &Summary,
) -> Vec<ThresholdViolation> {
    let mut out = Vec::new();

    if response_times.p50_ms > thresholds.response_time.p50_ms {
        out.push(ThresholdViolation {
            metric: "P50 Response Time".to_string(),
            actual: response_times.p50_ms as f64,
            threshold: thresholds.response_time.p50_ms as f64,
            severity: Severity::Warning,
        });
    }

    if response_times.p95_ms > thresholds.response_time.p95_ms {
        out.push(ThresholdViolation {
            metric: "P95 Response Time".to_string(),
            actual: response_times.p95_ms as f64,
            threshold: thresholds.response_time.p95_ms as f64,
            severity: Severity::Critical,
        });
    }

    if summary.error_rate > thresholds.error_rate_percent {
        out.push(ThresholdViolation {
            metric: "Error Rate".to_string(),
            actual: summary.error_rate,
            threshold: thresholds.error_rate_percent,
            severity: Severity::Critical,
        });
    }

    if summary.throughput < thresholds.min_throughput {
        out.push(ThresholdViolation {
            metric: "Throughput".to_string(),
            actual: summary.throughput,
            threshold: thresholds.min_throughput,
            severity: Severity::Warning,
        });
    }

    out
}

fn rate_percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn iso8601(timestamp_ms: u64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(timestamp_ms as i64)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_default()
}
