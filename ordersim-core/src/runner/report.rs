use std::fmt::Write as _;
use std::path::Path;

use super::config::LoadConfig;
use super::error::Result;
use super::metrics::{Severity, Statistics, ThresholdViolation};

/// Renders one run's statistics into the three report artifacts. Reads the
/// statistics snapshot only; never mutates collected data.
#[derive(Debug)]
pub struct ReportGenerator<'a> {
    config: &'a LoadConfig,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(config: &'a LoadConfig) -> Self {
        Self { config }
    }

    /// Creates the output directory if absent and writes the HTML, JSON and
    /// CSV artifacts. An I/O failure here propagates to the caller; the
    /// in-memory statistics stay intact and queryable.
    pub fn write_all(&self, stats: &Statistics, csv: &str) -> Result<()> {
        let dir = Path::new(&self.config.report.output_dir);
        std::fs::create_dir_all(dir)?;

        std::fs::write(
            dir.join(&self.config.report.html_report_name),
            self.render_html(stats),
        )?;
        std::fs::write(
            dir.join(&self.config.report.json_report_name),
            serde_json::to_string_pretty(stats)?,
        )?;
        std::fs::write(dir.join(&self.config.report.csv_report_name), csv)?;

        Ok(())
    }

    /// Self-contained HTML: inline styling, Chart.js pulled from a CDN.
    pub fn render_html(&self, stats: &Statistics) -> String {
        let mut out = String::with_capacity(16 * 1024);
        let generated = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let s = &stats.summary;
        let rt = &stats.response_times;
        let thresholds = &self.config.thresholds;

        write!(
            &mut out,
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Performance Test Report - {generated}</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.0/dist/chart.umd.min.js"></script>
<style>
* {{ margin: 0; padding: 0; box-sizing: border-box; }}
body {{ font-family: 'Segoe UI', Tahoma, sans-serif; background: #f0f2f5; padding: 20px; color: #333; }}
.container {{ max-width: 1400px; margin: 0 auto; background: white; border-radius: 12px; box-shadow: 0 4px 24px rgba(0,0,0,0.12); overflow: hidden; }}
.header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 40px; text-align: center; }}
.header h1 {{ font-size: 2.2em; margin-bottom: 8px; }}
.header .subtitle {{ opacity: 0.9; }}
.test-info, .summary-grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 20px; padding: 30px; }}
.test-info {{ background: #f8f9fa; border-bottom: 3px solid #667eea; }}
.info-card, .metric-card {{ background: white; padding: 20px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.08); }}
.info-card h3, .metric-card h3 {{ color: #667eea; margin-bottom: 10px; font-size: 0.85em; text-transform: uppercase; letter-spacing: 1px; }}
.info-card .value, .metric-card .value {{ font-size: 1.9em; font-weight: bold; }}
.info-card .unit {{ font-size: 0.6em; color: #666; margin-left: 4px; }}
.metric-card.pass {{ border-top: 4px solid #28a745; }}
.metric-card.warn {{ border-top: 4px solid #ffc107; }}
.metric-card.fail {{ border-top: 4px solid #dc3545; }}
.section {{ padding: 30px; border-bottom: 1px solid #e0e0e0; }}
.section h2 {{ color: #667eea; margin-bottom: 20px; font-size: 1.5em; border-left: 5px solid #667eea; padding-left: 12px; }}
.chart-container {{ position: relative; height: 380px; margin: 20px 0; }}
table {{ width: 100%; border-collapse: collapse; }}
thead {{ background: #667eea; color: white; }}
th {{ padding: 12px; text-align: left; font-size: 0.85em; text-transform: uppercase; letter-spacing: 1px; }}
td {{ padding: 10px 12px; border-bottom: 1px solid #f0f0f0; }}
tr:hover {{ background: #f8f9fa; }}
.status-badge {{ padding: 4px 10px; border-radius: 12px; font-size: 0.85em; font-weight: bold; display: inline-block; }}
.status-pass {{ background: #d4edda; color: #155724; }}
.status-fail {{ background: #f8d7da; color: #721c24; }}
.status-warning {{ background: #fff3cd; color: #856404; }}
.banner-pass {{ background: #d4edda; border-left: 5px solid #28a745; padding: 20px; border-radius: 6px; color: #155724; }}
.violations {{ background: #fff3cd; border-left: 5px solid #ffc107; padding: 20px; border-radius: 6px; }}
.violation-item {{ background: white; padding: 12px; margin: 10px 0; border-radius: 5px; border-left: 4px solid #ffc107; }}
.violation-item.critical {{ border-left-color: #dc3545; background: #f8d7da; }}
.scenarios-grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(280px, 1fr)); gap: 20px; }}
.scenario-card {{ background: white; border-radius: 10px; padding: 20px; box-shadow: 0 2px 10px rgba(0,0,0,0.08); border-top: 4px solid #667eea; }}
.scenario-card h3 {{ color: #667eea; margin-bottom: 8px; }}
.scenario-card .weight {{ background: #667eea; color: white; padding: 3px 10px; border-radius: 12px; font-size: 0.8em; display: inline-block; margin-bottom: 8px; }}
.scenario-card ul {{ list-style: none; margin-top: 8px; }}
.scenario-card li {{ padding: 6px 0; border-bottom: 1px solid #f0f0f0; }}
.footer {{ background: #f8f9fa; padding: 20px; text-align: center; color: #666; font-size: 0.9em; }}
.overflow-note {{ margin-top: 10px; color: #666; }}
</style>
</head>
<body>
<div class="container">
<div class="header">
<h1>Performance Test Report</h1>
<div class="subtitle">Generated on {generated}</div>
</div>
"#,
        )
        .ok();

        // Run metadata cards.
        write!(
            &mut out,
            r#"<div class="test-info">
<div class="info-card"><h3>Test Duration</h3><div class="value">{duration}<span class="unit">seconds</span></div></div>
<div class="info-card"><h3>Concurrent Users</h3><div class="value">{users}<span class="unit">users</span></div></div>
<div class="info-card"><h3>Total Requests</h3><div class="value">{total}<span class="unit">requests</span></div></div>
<div class="info-card"><h3>Throughput</h3><div class="value">{throughput}<span class="unit">req/s</span></div></div>
</div>
"#,
            duration = s.duration_secs,
            users = self.config.concurrent_users,
            total = s.total_requests,
            throughput = s.throughput,
        )
        .ok();

        // Headline metric cards, flagged against the configured thresholds.
        let success_class = if s.success_rate >= thresholds.min_success_rate_percent {
            "pass"
        } else {
            "warn"
        };
        let error_class = if s.error_rate <= thresholds.error_rate_percent {
            "pass"
        } else {
            "fail"
        };
        let p95_class = if rt.p95_ms <= thresholds.response_time.p95_ms {
            "pass"
        } else {
            "warn"
        };
        write!(
            &mut out,
            r#"<div class="summary-grid">
<div class="metric-card {success_class}"><h3>Success Rate</h3><div class="value">{success_rate}%</div></div>
<div class="metric-card {error_class}"><h3>Error Rate</h3><div class="value">{error_rate}%</div></div>
<div class="metric-card"><h3>Avg Response Time</h3><div class="value">{avg} ms</div></div>
<div class="metric-card {p95_class}"><h3>P95 Response Time</h3><div class="value">{p95} ms</div></div>
</div>
"#,
            success_rate = s.success_rate,
            error_rate = s.error_rate,
            avg = rt.avg_ms,
            p95 = rt.p95_ms,
        )
        .ok();

        self.render_violations(&mut out, &stats.threshold_violations);
        self.render_scenarios(&mut out);

        // Percentile chart.
        write!(
            &mut out,
            r#"<div class="section">
<h2>Response Time Distribution</h2>
<div class="chart-container"><canvas id="responseTimeChart"></canvas></div>
</div>
"#,
        )
        .ok();

        self.render_endpoint_table(&mut out, stats);
        self.render_response_time_table(&mut out, stats);
        self.render_errors(&mut out, stats);

        write!(
            &mut out,
            r#"<div class="footer">
<p>Generated by ordersim</p>
<p>Test configuration: {users} concurrent users over {duration}s duration</p>
</div>
</div>
<script>
new Chart(document.getElementById('responseTimeChart').getContext('2d'), {{
  type: 'bar',
  data: {{
    labels: ['Min', 'P50', 'P90', 'P95', 'P99', 'Max'],
    datasets: [{{
      label: 'Response Time (ms)',
      data: [{min}, {p50}, {p90}, {p95}, {p99}, {max}],
      backgroundColor: 'rgba(102, 126, 234, 0.8)',
      borderColor: 'rgba(102, 126, 234, 1)',
      borderWidth: 2
    }}]
  }},
  options: {{
    responsive: true,
    maintainAspectRatio: false,
    plugins: {{ legend: {{ display: false }}, title: {{ display: true, text: 'Response Time Percentiles' }} }},
    scales: {{ y: {{ beginAtZero: true, title: {{ display: true, text: 'Response Time (ms)' }} }} }}
  }}
}});
</script>
</body>
</html>
"#,
            users = self.config.concurrent_users,
            duration = self.config.test_duration_secs,
            min = rt.min_ms,
            p50 = rt.p50_ms,
            p90 = rt.p90_ms,
            p95 = rt.p95_ms,
            p99 = rt.p99_ms,
            max = rt.max_ms,
        )
        .ok();

        out
    }

    fn render_violations(&self, out: &mut String, violations: &[ThresholdViolation]) {
        if violations.is_empty() {
            out.push_str(
                r#"<div class="section">
<div class="banner-pass"><h3>All Thresholds Passed</h3><p>No performance threshold violations detected.</p></div>
</div>
"#,
            );
            return;
        }

        write!(
            out,
            r#"<div class="section">
<div class="violations">
<h3>Threshold Violations ({count})</h3>
"#,
            count = violations.len(),
        )
        .ok();

        for v in violations {
            let (class, badge) = match v.severity {
                Severity::Critical => ("critical", "status-fail"),
                Severity::Warning => ("", "status-warning"),
            };
            write!(
                out,
                r#"<div class="violation-item {class}"><strong>{metric}</strong>: {actual} (threshold: {threshold}) <span class="status-badge {badge}">{severity}</span></div>
"#,
                metric = escape_html(&v.metric),
                actual = v.actual,
                threshold = v.threshold,
                severity = v.severity,
            )
            .ok();
        }

        out.push_str("</div>\n</div>\n");
    }

    fn render_scenarios(&self, out: &mut String) {
        out.push_str("<div class=\"section\">\n<h2>Test Scenarios</h2>\n<div class=\"scenarios-grid\">\n");
        for scenario in &self.config.scenarios {
            write!(
                out,
                r#"<div class="scenario-card">
<h3>{name}</h3>
<span class="weight">{weight}% of users</span>
<p>{description}</p>
<ul>
"#,
                name = escape_html(&scenario.name),
                weight = scenario.weight,
                description = escape_html(&scenario.description),
            )
            .ok();
            for step in &scenario.steps {
                writeln!(out, "<li>{}</li>", escape_html(step)).ok();
            }
            out.push_str("</ul>\n</div>\n");
        }
        out.push_str("</div>\n</div>\n");
    }

    fn render_endpoint_table(&self, out: &mut String, stats: &Statistics) {
        out.push_str(
            r#"<div class="section">
<h2>Performance by Endpoint</h2>
<table>
<thead><tr><th>Endpoint</th><th>Requests</th><th>Success Rate</th><th>Avg (ms)</th><th>Min (ms)</th><th>Max (ms)</th><th>P95 (ms)</th><th>Status</th></tr></thead>
<tbody>
"#,
        );
        for (endpoint, es) in &stats.by_endpoint {
            let badge = if es.success_rate >= 99.0 {
                r#"<span class="status-badge status-pass">PASS</span>"#
            } else {
                r#"<span class="status-badge status-fail">FAIL</span>"#
            };
            write!(
                out,
                "<tr><td><code>{endpoint}</code></td><td>{count}</td><td>{rate}%</td><td>{avg}</td><td>{min}</td><td>{max}</td><td>{p95}</td><td>{badge}</td></tr>\n",
                endpoint = escape_html(endpoint),
                count = es.count,
                rate = es.success_rate,
                avg = es.avg_response_time_ms,
                min = es.min_response_time_ms,
                max = es.max_response_time_ms,
                p95 = es.p95_response_time_ms,
            )
            .ok();
        }
        out.push_str("</tbody>\n</table>\n</div>\n");
    }

    fn render_response_time_table(&self, out: &mut String, stats: &Statistics) {
        let rt = &stats.response_times;
        let t = &self.config.thresholds.response_time;

        out.push_str(
            r#"<div class="section">
<h2>Response Time Metrics</h2>
<table>
<thead><tr><th>Metric</th><th>Value (ms)</th><th>Threshold (ms)</th><th>Status</th></tr></thead>
<tbody>
"#,
        );

        let pass = r#"<span class="status-badge status-pass">PASS</span>"#;
        writeln!(out, "<tr><td>Minimum</td><td>{}</td><td>-</td><td>{pass}</td></tr>", rt.min_ms).ok();
        writeln!(out, "<tr><td>Average</td><td>{}</td><td>-</td><td>{pass}</td></tr>", rt.avg_ms).ok();
        for (label, value, threshold) in [
            ("P50 (Median)", rt.p50_ms, t.p50_ms),
            ("P90", rt.p90_ms, t.p90_ms),
            ("P95", rt.p95_ms, t.p95_ms),
            ("P99", rt.p99_ms, t.p99_ms),
        ] {
            writeln!(
                out,
                "<tr><td>{label}</td><td>{value}</td><td>{threshold}</td><td>{}</td></tr>",
                status_badge(value, threshold),
            )
            .ok();
        }
        writeln!(out, "<tr><td>Maximum</td><td>{}</td><td>-</td><td>{pass}</td></tr>", rt.max_ms).ok();

        out.push_str("</tbody>\n</table>\n</div>\n");
    }

    fn render_errors(&self, out: &mut String, stats: &Statistics) {
        if stats.errors.is_empty() {
            return;
        }

        write!(
            out,
            r#"<div class="section">
<h2>Errors ({count})</h2>
<table>
<thead><tr><th>Timestamp</th><th>Endpoint</th><th>Method</th><th>Status Code</th></tr></thead>
<tbody>
"#,
            count = stats.errors.len(),
        )
        .ok();

        for error in stats.errors.iter().take(50) {
            let timestamp = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(
                error.timestamp_ms as i64,
            )
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_default();
            write!(
                out,
                "<tr><td>{timestamp}</td><td><code>{endpoint}</code></td><td>{method}</td><td><span class=\"status-badge status-fail\">{status}</span></td></tr>\n",
                endpoint = escape_html(&error.endpoint),
                method = escape_html(&error.method),
                status = error.status_code,
            )
            .ok();
        }
        out.push_str("</tbody>\n</table>\n");

        if stats.errors.len() > 50 {
            writeln!(
                out,
                r#"<p class="overflow-note">Showing first 50 of {} errors</p>"#,
                stats.errors.len(),
            )
            .ok();
        }
        out.push_str("</div>\n");
    }
}

fn status_badge(value: u64, threshold: u64) -> &'static str {
    if value <= threshold {
        r#"<span class="status-badge status-pass">PASS</span>"#
    } else {
        r#"<span class="status-badge status-fail">FAIL</span>"#
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
