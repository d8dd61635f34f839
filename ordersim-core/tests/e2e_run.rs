use std::time::Instant;

use ordersim_core::runner::{
    Endpoints, LoadConfig, LoadTestRunner, ReportConfig, ScenarioConfig, ScenarioFlow, ThinkTime,
};
use ordersim_testserver::TestServer;

fn base_config(server: &TestServer, out_dir: &std::path::Path) -> LoadConfig {
    LoadConfig {
        concurrent_users: 1,
        test_duration_secs: 1,
        ramp_up_secs: 0,
        think_time: ThinkTime {
            min_ms: 1,
            max_ms: 3,
        },
        request_timeout_ms: 2_000,
        base_url: server.base_url().to_string(),
        dashboard_url: server.base_url().to_string(),
        report: ReportConfig {
            output_dir: out_dir.to_string_lossy().into_owned(),
            ..ReportConfig::default()
        },
        seed: Some(7),
        ..LoadConfig::default()
    }
}

fn single_scenario(flow: ScenarioFlow) -> Vec<ScenarioConfig> {
    vec![ScenarioConfig {
        name: "Only Scenario".to_string(),
        weight: 100,
        description: String::new(),
        steps: Vec::new(),
        flow,
    }]
}

fn tempdir() -> tempfile::TempDir {
    match tempfile::tempdir() {
        Ok(d) => d,
        Err(err) => panic!("tempdir failed: {err}"),
    }
}

async fn start_server() -> TestServer {
    match TestServer::start().await {
        Ok(s) => s,
        Err(err) => panic!("testserver failed to start: {err}"),
    }
}

#[tokio::test]
async fn healthy_run_reports_full_success() {
    let server = start_server().await;
    let dir = tempdir();

    let mut config = base_config(&server, dir.path());
    config.scenarios = single_scenario(ScenarioFlow::MenuBrowsing);
    // All three browsing steps hit the always-200 slow endpoint.
    config.endpoints = Endpoints {
        menu: ordersim_testserver::PATH_SLOW.to_string(),
        categories: ordersim_testserver::PATH_SLOW.to_string(),
        items: ordersim_testserver::PATH_SLOW.to_string(),
        ..Endpoints::default()
    };

    let runner = match LoadTestRunner::new(config) {
        Ok(r) => r,
        Err(err) => panic!("runner construction failed: {err}"),
    };
    let stats = match runner.run().await {
        Ok(s) => s,
        Err(err) => panic!("run failed: {err}"),
    };

    assert!(stats.summary.total_requests >= 1);
    assert_eq!(stats.summary.success_rate, 100.0);
    assert_eq!(stats.summary.error_rate, 0.0);
    assert!(
        !stats
            .threshold_violations
            .iter()
            .any(|v| v.metric == "Error Rate"),
        "no error-rate violation expected: {:?}",
        stats.threshold_violations
    );

    let seen = server.stats().requests_total();
    server.shutdown().await;
    assert!(seen >= 1, "expected server to see requests");
}

#[tokio::test]
async fn failing_endpoint_trips_critical_error_rate() {
    let server = start_server().await;
    let dir = tempdir();

    let mut config = base_config(&server, dir.path());
    config.scenarios = single_scenario(ScenarioFlow::MenuBrowsing);
    config.endpoints = Endpoints {
        menu: ordersim_testserver::PATH_FAILING.to_string(),
        categories: ordersim_testserver::PATH_FAILING.to_string(),
        items: ordersim_testserver::PATH_FAILING.to_string(),
        ..Endpoints::default()
    };

    let runner = match LoadTestRunner::new(config) {
        Ok(r) => r,
        Err(err) => panic!("runner construction failed: {err}"),
    };
    let stats = match runner.run().await {
        Ok(s) => s,
        Err(err) => panic!("run failed: {err}"),
    };
    server.shutdown().await;

    assert!(stats.summary.total_requests >= 1);
    assert_eq!(stats.summary.success_rate, 0.0);
    assert_eq!(stats.summary.error_rate, 100.0);
    assert!(
        stats.threshold_violations.iter().any(|v| {
            v.metric == "Error Rate"
                && v.severity == ordersim_core::runner::Severity::Critical
        }),
        "expected a critical error-rate violation: {:?}",
        stats.threshold_violations
    );
}

#[tokio::test]
async fn customer_order_flow_places_orders_and_payments() {
    let server = start_server().await;
    let dir = tempdir();

    let mut config = base_config(&server, dir.path());
    config.scenarios = single_scenario(ScenarioFlow::CustomerOrder);

    let runner = match LoadTestRunner::new(config) {
        Ok(r) => r,
        Err(err) => panic!("runner construction failed: {err}"),
    };
    if let Err(err) = runner.run().await {
        panic!("run failed: {err}");
    }

    let orders = server.stats().orders_created();
    let payments = server.stats().payments_processed();
    server.shutdown().await;

    assert!(orders >= 1, "expected at least one order");
    assert!(payments >= 1, "expected at least one payment");
}

#[tokio::test]
async fn admin_flow_authenticates_with_bearer_token() {
    let server = start_server().await;
    let dir = tempdir();

    let mut config = base_config(&server, dir.path());
    config.scenarios = single_scenario(ScenarioFlow::AdminDashboard);

    let runner = match LoadTestRunner::new(config) {
        Ok(r) => r,
        Err(err) => panic!("runner construction failed: {err}"),
    };
    if let Err(err) = runner.run().await {
        panic!("run failed: {err}");
    }

    let logins = server.stats().logins();
    let bearer = server.stats().saw_bearer_auth();
    server.shutdown().await;

    assert!(logins >= 1, "expected a dashboard login");
    assert!(bearer >= 1, "expected authenticated report requests");
}

#[tokio::test]
async fn csv_rows_match_recorded_samples() {
    let server = start_server().await;
    let dir = tempdir();

    let mut config = base_config(&server, dir.path());
    config.scenarios = single_scenario(ScenarioFlow::MenuBrowsing);

    let runner = match LoadTestRunner::new(config) {
        Ok(r) => r,
        Err(err) => panic!("runner construction failed: {err}"),
    };
    let stats = match runner.run().await {
        Ok(s) => s,
        Err(err) => panic!("run failed: {err}"),
    };
    server.shutdown().await;

    let csv = runner.collector().to_csv();
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(rows.len() as u64, stats.summary.total_requests);

    let ok_rows = rows.iter().filter(|r| r.ends_with(",true")).count() as u64;
    let fail_rows = rows.iter().filter(|r| r.ends_with(",false")).count() as u64;
    assert_eq!(ok_rows, stats.summary.successful_requests);
    assert_eq!(fail_rows, stats.summary.failed_requests);
}

#[tokio::test]
async fn report_artifacts_are_written() {
    let server = start_server().await;
    let dir = tempdir();

    let mut config = base_config(&server, dir.path());
    config.scenarios = single_scenario(ScenarioFlow::MenuBrowsing);

    let runner = match LoadTestRunner::new(config) {
        Ok(r) => r,
        Err(err) => panic!("runner construction failed: {err}"),
    };
    if let Err(err) = runner.run().await {
        panic!("run failed: {err}");
    }
    server.shutdown().await;

    assert!(dir.path().join("performance-report.html").is_file());
    assert!(dir.path().join("performance-metrics.json").is_file());
    assert!(dir.path().join("performance-data.csv").is_file());
}

#[tokio::test]
async fn unreachable_server_records_transport_failures_as_status_zero() {
    let dir = tempdir();

    // Nothing listens on port 1; every call is a transport failure.
    let config = LoadConfig {
        concurrent_users: 1,
        test_duration_secs: 1,
        ramp_up_secs: 0,
        think_time: ThinkTime {
            min_ms: 1,
            max_ms: 3,
        },
        request_timeout_ms: 200,
        base_url: "http://127.0.0.1:1".to_string(),
        dashboard_url: "http://127.0.0.1:1".to_string(),
        scenarios: single_scenario(ScenarioFlow::MenuBrowsing),
        report: ReportConfig {
            output_dir: dir.path().to_string_lossy().into_owned(),
            ..ReportConfig::default()
        },
        seed: Some(7),
        ..LoadConfig::default()
    };

    let runner = match LoadTestRunner::new(config) {
        Ok(r) => r,
        Err(err) => panic!("runner construction failed: {err}"),
    };
    let stats = match runner.run().await {
        Ok(s) => s,
        Err(err) => panic!("run failed: {err}"),
    };

    assert!(stats.summary.total_requests >= 1);
    assert_eq!(stats.summary.success_rate, 0.0);
    assert!(
        stats.errors.iter().all(|e| e.status_code == 0),
        "transport failures must record status 0"
    );
}

#[tokio::test]
async fn ramp_up_staggers_launches_across_the_window() {
    let server = start_server().await;
    let dir = tempdir();

    let mut config = base_config(&server, dir.path());
    config.concurrent_users = 2;
    config.ramp_up_secs = 1;
    config.scenarios = single_scenario(ScenarioFlow::MenuBrowsing);

    let runner = match LoadTestRunner::new(config) {
        Ok(r) => r,
        Err(err) => panic!("runner construction failed: {err}"),
    };

    let started = Instant::now();
    if let Err(err) = runner.run().await {
        panic!("run failed: {err}");
    }
    let elapsed = started.elapsed();
    server.shutdown().await;

    // One 500ms stagger between the two users plus the 1s steady state.
    assert!(
        elapsed >= std::time::Duration::from_millis(1400),
        "run finished too quickly for the configured ramp-up: {elapsed:?}"
    );
}

#[tokio::test]
async fn weighted_mix_exercises_multiple_flows() {
    let server = start_server().await;
    let dir = tempdir();

    let mut config = base_config(&server, dir.path());
    config.test_duration_secs = 2;
    config.scenarios = vec![
        ScenarioConfig {
            name: "Browse".to_string(),
            weight: 50,
            description: String::new(),
            steps: Vec::new(),
            flow: ScenarioFlow::MenuBrowsing,
        },
        ScenarioConfig {
            name: "Order".to_string(),
            weight: 50,
            description: String::new(),
            steps: Vec::new(),
            flow: ScenarioFlow::CustomerOrder,
        },
    ];

    let runner = match LoadTestRunner::new(config) {
        Ok(r) => r,
        Err(err) => panic!("runner construction failed: {err}"),
    };
    let stats = match runner.run().await {
        Ok(s) => s,
        Err(err) => panic!("run failed: {err}"),
    };
    server.shutdown().await;

    assert!(stats.summary.total_requests >= 1);
    assert!(!stats.by_endpoint.is_empty());
}
