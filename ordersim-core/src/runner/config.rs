use std::time::Duration;

use serde::Deserialize;

use super::error::{Error, Result};
use super::scenario::ScenarioFlow;

/// Full configuration for one load-test run.
///
/// Deserialized from YAML by the CLI; every section has defaults matching the
/// ordering platform's development profile, so a partial file (or none at
/// all) still yields a runnable config. `validate()` must pass before any
/// virtual user is spawned.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LoadConfig {
    /// Number of concurrent virtual users.
    pub concurrent_users: u64,

    /// Steady-state test duration in seconds.
    pub test_duration_secs: u64,

    /// Time over which user launches are staggered.
    pub ramp_up_secs: u64,

    pub think_time: ThinkTime,

    /// Hard timeout applied to every HTTP call.
    pub request_timeout_ms: u64,

    /// Customer-facing API origin.
    pub base_url: String,

    /// Admin dashboard origin (login goes here).
    pub dashboard_url: String,

    pub endpoints: Endpoints,

    pub scenarios: Vec<ScenarioConfig>,

    pub thresholds: Thresholds,

    pub report: ReportConfig,

    pub test_data: TestData,

    /// Interval between live progress ticks.
    pub monitor_interval_secs: u64,

    /// RNG seed for reproducible runs. Each user derives its own stream from
    /// this plus its user id. Unset means OS entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ThinkTime {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for ThinkTime {
    fn default() -> Self {
        Self {
            min_ms: 500,
            max_ms: 2000,
        }
    }
}

/// Path templates for the ordering platform's API. Templates may contain
/// `:param` placeholders filled in by the scenario layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub logout: String,
    pub menu: String,
    pub categories: String,
    pub items: String,
    pub create_order: String,
    pub get_order: String,
    pub process_payment: String,
    pub verify_payment: String,
    pub tables: String,
    pub update_table_status: String,
    pub payment_report: String,
    pub order_report: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/authentication/login".to_string(),
            logout: "/authentication/logout".to_string(),
            menu: "/api/menu".to_string(),
            categories: "/api/categories".to_string(),
            items: "/api/items".to_string(),
            create_order: "/api/orders".to_string(),
            get_order: "/api/orders/:id".to_string(),
            process_payment: "/api/payments".to_string(),
            verify_payment: "/api/payments/verify".to_string(),
            tables: "/api/tables".to_string(),
            update_table_status: "/api/tables/:id/status".to_string(),
            payment_report: "/api/reports/payments".to_string(),
            order_report: "/api/reports/orders".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,

    /// Share of iterations, 0..=100. Selection is proportional to the total
    /// across all scenarios; the total need not sum to 100.
    pub weight: u32,

    #[serde(default)]
    pub description: String,

    /// Step labels shown in the report; purely descriptive.
    #[serde(default)]
    pub steps: Vec<String>,

    /// Which built-in journey this scenario executes.
    pub flow: ScenarioFlow,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ResponseTimeThresholds {
    pub p50_ms: u64,
    pub p90_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
}

impl Default for ResponseTimeThresholds {
    fn default() -> Self {
        Self {
            p50_ms: 500,
            p90_ms: 1000,
            p95_ms: 2000,
            p99_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub response_time: ResponseTimeThresholds,

    /// Maximum tolerated error rate, percent.
    pub error_rate_percent: f64,

    /// Minimum tolerated throughput, requests per second.
    pub min_throughput: f64,

    /// Minimum tolerated success rate, percent.
    pub min_success_rate_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            response_time: ResponseTimeThresholds::default(),
            error_rate_percent: 1.0,
            min_throughput: 100.0,
            min_success_rate_percent: 99.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: String,
    pub html_report_name: String,
    pub json_report_name: String,
    pub csv_report_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: "test-results/performance".to_string(),
            html_report_name: "performance-report.html".to_string(),
            json_report_name: "performance-metrics.json".to_string(),
            csv_report_name: "performance-data.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestData {
    pub admin_credentials: Credentials,
    pub sample_items: Vec<MenuItem>,
    pub test_card: TestCard,
    pub table_ids: Vec<String>,
}

impl Default for TestData {
    fn default() -> Self {
        Self {
            admin_credentials: Credentials::default(),
            sample_items: vec![
                MenuItem {
                    id: 1,
                    name: "Item 1".to_string(),
                    price: 50,
                },
                MenuItem {
                    id: 2,
                    name: "Item 2".to_string(),
                    price: 75,
                },
                MenuItem {
                    id: 3,
                    name: "Item 3".to_string(),
                    price: 100,
                },
            ],
            test_card: TestCard::default(),
            table_ids: vec![
                "1badfbf9-8d2e-4119-a9c2-61c3575ceaa9".to_string(),
                "2fe4ca70-6b80-4c12-b1d0-3dc36060a908".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: "admin@example.test".to_string(),
            password: "password".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuItem {
    pub id: u64,
    pub name: String,
    pub price: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestCard {
    pub number: String,
    pub expiry: String,
    pub cvv: String,
    pub holder_name: String,
}

impl Default for TestCard {
    fn default() -> Self {
        Self {
            number: "5123450000000008".to_string(),
            expiry: "01/39".to_string(),
            cvv: "100".to_string(),
            holder_name: "APPROVED".to_string(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            concurrent_users: 50,
            test_duration_secs: 60,
            ramp_up_secs: 10,
            think_time: ThinkTime::default(),
            request_timeout_ms: 30_000,
            base_url: "https://api-dev.example.test".to_string(),
            dashboard_url: "https://dashboard-dev.example.test".to_string(),
            endpoints: Endpoints::default(),
            scenarios: default_scenarios(),
            thresholds: Thresholds::default(),
            report: ReportConfig::default(),
            test_data: TestData::default(),
            monitor_interval_secs: 5,
            seed: None,
        }
    }
}

fn default_scenarios() -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig {
            name: "Customer Order Flow".to_string(),
            weight: 40,
            description: "Simulates customer browsing menu and placing orders".to_string(),
            steps: vec![
                "Browse Menu".to_string(),
                "Browse Categories".to_string(),
                "View Items".to_string(),
                "Confirm Order".to_string(),
                "Process Payment".to_string(),
            ],
            flow: ScenarioFlow::CustomerOrder,
        },
        ScenarioConfig {
            name: "Admin Dashboard Operations".to_string(),
            weight: 30,
            description: "Simulates admin managing tables and viewing reports".to_string(),
            steps: vec![
                "Login to Dashboard".to_string(),
                "View Tables".to_string(),
                "Check Order Reports".to_string(),
                "Check Payment Reports".to_string(),
            ],
            flow: ScenarioFlow::AdminDashboard,
        },
        ScenarioConfig {
            name: "Split Payment Flow".to_string(),
            weight: 20,
            description: "Simulates customers splitting bills".to_string(),
            steps: vec![
                "Create Order".to_string(),
                "Split Invoice".to_string(),
                "Process First Payment".to_string(),
                "Process Second Payment".to_string(),
            ],
            flow: ScenarioFlow::SplitPayment,
        },
        ScenarioConfig {
            name: "Menu Browsing Only".to_string(),
            weight: 10,
            description: "Simulates users just browsing the menu".to_string(),
            steps: vec![
                "Browse Menu".to_string(),
                "Browse Categories".to_string(),
                "View Items".to_string(),
            ],
            flow: ScenarioFlow::MenuBrowsing,
        },
    ]
}

impl LoadConfig {
    /// Fail-fast validation. Called by the runner before any user is spawned.
    pub fn validate(&self) -> Result<()> {
        if self.concurrent_users == 0 {
            return Err(Error::InvalidUsers);
        }
        if self.test_duration_secs == 0 {
            return Err(Error::InvalidDuration);
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidTimeout);
        }
        if self.think_time.min_ms > self.think_time.max_ms {
            return Err(Error::InvalidThinkTime);
        }
        if self.scenarios.is_empty() {
            return Err(Error::EmptyScenarios);
        }

        let mut total_weight: u32 = 0;
        for s in &self.scenarios {
            if s.weight > 100 {
                return Err(Error::InvalidWeight {
                    name: s.name.clone(),
                    weight: s.weight,
                });
            }
            total_weight = total_weight.saturating_add(s.weight);
        }
        if total_weight == 0 {
            return Err(Error::ZeroTotalWeight);
        }

        check_url("base_url", &self.base_url)?;
        check_url("dashboard_url", &self.dashboard_url)?;

        if self.report.html_report_name.is_empty()
            || self.report.json_report_name.is_empty()
            || self.report.csv_report_name.is_empty()
        {
            return Err(Error::EmptyReportName);
        }

        Ok(())
    }

    /// Stagger between consecutive user launches so load rises linearly over
    /// the ramp-up window instead of as a step function.
    pub fn ramp_up_delay(&self) -> Duration {
        if self.concurrent_users == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.ramp_up_secs * 1000 / self.concurrent_users)
    }

    pub fn test_duration(&self) -> Duration {
        Duration::from_secs(self.test_duration_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs.max(1))
    }

    pub fn total_weight(&self) -> u32 {
        self.scenarios.iter().map(|s| s.weight).sum()
    }
}

fn check_url(field: &'static str, raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|_| Error::InvalidUrl {
        field,
        url: raw.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::InvalidUrl {
            field,
            url: raw.to_string(),
        });
    }
    Ok(())
}
