use std::sync::Arc;

use serde::Serialize;

use ordersim_core::runner::{
    LoadConfig, ProgressEvent, ProgressFn, ResultsSummary, Statistics,
};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, config: &LoadConfig) {
        emit_json_line(&HeaderLine {
            kind: "header",
            users: config.concurrent_users,
            duration_secs: config.test_duration_secs,
            ramp_up_secs: config.ramp_up_secs,
            base_url: &config.base_url,
            scenarios: config.scenarios.len(),
        });
    }

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(|event| match event {
            ProgressEvent::Phase(phase) => emit_json_line(&PhaseLine {
                kind: "phase",
                phase: phase.to_string(),
            }),
            ProgressEvent::Tick {
                elapsed,
                active_users,
                total_requests,
                failed_requests,
                rps_now,
            } => emit_json_line(&TickLine {
                kind: "tick",
                elapsed_secs: elapsed.as_secs(),
                active_users,
                total_requests,
                failed_requests,
                rps_now,
            }),
        }))
    }

    fn print_summary(&self, stats: &Statistics) -> anyhow::Result<()> {
        emit_json_line(&SummaryLine {
            kind: "summary",
            statistics: stats,
        });
        Ok(())
    }

    fn print_results(&self, results: &ResultsSummary) -> anyhow::Result<()> {
        emit_json_line(&ResultsLine {
            kind: "results",
            results,
        });
        Ok(())
    }
}

#[derive(Serialize)]
struct HeaderLine<'a> {
    kind: &'static str,
    users: u64,
    duration_secs: u64,
    ramp_up_secs: u64,
    base_url: &'a str,
    scenarios: usize,
}

#[derive(Serialize)]
struct PhaseLine {
    kind: &'static str,
    phase: String,
}

#[derive(Serialize)]
struct TickLine {
    kind: &'static str,
    elapsed_secs: u64,
    active_users: u64,
    total_requests: u64,
    failed_requests: u64,
    rps_now: f64,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    kind: &'static str,
    statistics: &'a Statistics,
}

#[derive(Serialize)]
struct ResultsLine<'a> {
    kind: &'static str,
    results: &'a ResultsSummary,
}

fn emit_json_line<T: Serialize>(line: &T) {
    match serde_json::to_string(line) {
        Ok(s) => println!("{s}"),
        Err(err) => eprintln!("failed to encode output line: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_a_kind_discriminator() {
        let line = PhaseLine {
            kind: "phase",
            phase: "running".to_string(),
        };
        let encoded = match serde_json::to_string(&line) {
            Ok(v) => v,
            Err(err) => panic!("encode failed: {err}"),
        };
        assert!(encoded.contains(r#""kind":"phase""#));
        assert!(encoded.contains(r#""phase":"running""#));
    }
}
