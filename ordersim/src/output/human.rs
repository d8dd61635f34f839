use std::fmt::Write as _;
use std::sync::Arc;

use ordersim_core::runner::{
    LoadConfig, ProgressEvent, ProgressFn, ResultsSummary, Severity, Statistics,
};

use super::OutputFormatter;

pub(crate) struct HumanOutput;

impl OutputFormatter for HumanOutput {
    fn print_header(&self, config: &LoadConfig) {
        println!("ordersim run");
        println!("  users: {}", config.concurrent_users);
        println!("  duration: {}s", config.test_duration_secs);
        println!("  ramp_up: {}s", config.ramp_up_secs);
        println!("  base_url: {}", config.base_url);
        println!(
            "  scenarios: {} (total weight {})",
            config.scenarios.len(),
            config.total_weight()
        );
        println!();
    }

    fn progress(&self) -> Option<ProgressFn> {
        // Live lines go to stderr so stdout stays clean for the summary.
        Some(Arc::new(|event| match event {
            ProgressEvent::Phase(phase) => eprintln!("phase: {phase}"),
            ProgressEvent::Tick {
                elapsed,
                active_users,
                total_requests,
                failed_requests,
                rps_now,
            } => eprintln!(
                "t={}s vus={active_users} requests={total_requests} failed={failed_requests} rps={rps_now:.1}",
                elapsed.as_secs()
            ),
        }))
    }

    fn print_summary(&self, stats: &Statistics) -> anyhow::Result<()> {
        print!("{}", render(stats));
        Ok(())
    }

    fn print_results(&self, _results: &ResultsSummary) -> anyhow::Result<()> {
        Ok(())
    }
}

fn render(stats: &Statistics) -> String {
    let mut out = String::new();
    let s = &stats.summary;
    let rt = &stats.response_times;

    out.push_str("summary\n");
    writeln!(
        &mut out,
        "  requests: {} (ok {}, failed {})",
        s.total_requests, s.successful_requests, s.failed_requests
    )
    .ok();
    writeln!(&mut out, "  success_rate: {:.2}%", s.success_rate).ok();
    writeln!(&mut out, "  error_rate: {:.2}%", s.error_rate).ok();
    writeln!(&mut out, "  duration: {:.2}s", s.duration_secs).ok();
    writeln!(&mut out, "  throughput: {:.2} req/s", s.throughput).ok();
    writeln!(
        &mut out,
        "  latency_ms: min={} avg={:.2} p50={} p90={} p95={} p99={} max={}",
        rt.min_ms, rt.avg_ms, rt.p50_ms, rt.p90_ms, rt.p95_ms, rt.p99_ms, rt.max_ms
    )
    .ok();

    if !stats.by_endpoint.is_empty() {
        out.push_str("endpoints\n");
        for (endpoint, es) in &stats.by_endpoint {
            writeln!(
                &mut out,
                "  {endpoint}: n={} ok={:.2}% avg={:.2} p95={}",
                es.count, es.success_rate, es.avg_response_time_ms, es.p95_response_time_ms
            )
            .ok();
        }
    }

    if stats.threshold_violations.is_empty() {
        out.push_str("thresholds: all passed\n");
    } else {
        writeln!(
            &mut out,
            "thresholds: {} violated",
            stats.threshold_violations.len()
        )
        .ok();
        for v in &stats.threshold_violations {
            let tag = match v.severity {
                Severity::Critical => "CRITICAL",
                Severity::Warning => "WARNING",
            };
            writeln!(
                &mut out,
                "  [{tag}] {}: {} (threshold: {})",
                v.metric, v.actual, v.threshold
            )
            .ok();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordersim_core::runner::{MetricsCollector, Thresholds};

    #[test]
    fn summary_renders_without_requests() {
        let c = MetricsCollector::new(Thresholds::default());
        c.start();
        c.stop();

        let text = render(&c.statistics());
        assert!(text.contains("requests: 0 (ok 0, failed 0)"));
        assert!(text.contains("success_rate: 0.00%"));
    }

    #[test]
    fn summary_lists_violations_with_severity() {
        let c = MetricsCollector::new(Thresholds::default());
        c.start();
        c.record_request("/api/menu", &ordersim_core::Method::GET, 10, 500, false);
        c.stop();

        let text = render(&c.statistics());
        assert!(text.contains("thresholds: "));
        assert!(text.contains("[CRITICAL] Error Rate"));
    }
}
