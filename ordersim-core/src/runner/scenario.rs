use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::rngs::StdRng;
use serde::Deserialize;

use crate::http::{HttpClient, HttpRequest};

use super::config::{LoadConfig, ScenarioConfig, ThinkTime};
use super::metrics::MetricsCollector;

/// Built-in user journeys, keyed from scenario config by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ScenarioFlow {
    CustomerOrder,
    AdminDashboard,
    SplitPayment,
    MenuBrowsing,
}

/// Selects the first scenario whose cumulative weight meets or exceeds the
/// draw, in declared order (first-match-wins on ties). The draw must be in
/// `[0, total_weight)`, which guarantees exactly one match.
pub fn pick_scenario(scenarios: &[ScenarioConfig], draw: f64) -> &ScenarioConfig {
    let mut cumulative: u32 = 0;
    for scenario in scenarios {
        cumulative = cumulative.saturating_add(scenario.weight);
        if draw <= cumulative as f64 {
            return scenario;
        }
    }

    // Unreachable for a valid draw; fall back to the last entry rather than
    // panicking inside a user loop.
    &scenarios[scenarios.len() - 1]
}

/// Substitutes `:param` placeholders in an endpoint template.
pub fn fill_path_params(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!(":{name}"), value);
    }
    out
}

pub fn think_duration(rng: &mut StdRng, think: &ThinkTime) -> Duration {
    Duration::from_millis(rng.gen_range(think.min_ms..=think.max_ms))
}

#[derive(Debug)]
struct StepOutcome {
    success: bool,
    body: Option<serde_json::Value>,
}

/// Executes scenario step sequences against the configured platform,
/// recording every HTTP outcome — transport failures included — into the
/// collector. A failed step never unwinds; the flow carries on and the
/// failure becomes data.
#[derive(Debug)]
pub struct ScenarioEngine {
    config: Arc<LoadConfig>,
    client: HttpClient,
    collector: Arc<MetricsCollector>,
}

impl ScenarioEngine {
    pub fn new(config: Arc<LoadConfig>, client: HttpClient, collector: Arc<MetricsCollector>) -> Self {
        Self {
            config,
            client,
            collector,
        }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub async fn execute(&self, flow: ScenarioFlow, rng: &mut StdRng) {
        match flow {
            ScenarioFlow::CustomerOrder => self.customer_order(rng).await,
            ScenarioFlow::AdminDashboard => self.admin_dashboard(rng).await,
            ScenarioFlow::SplitPayment => self.split_payment(rng).await,
            ScenarioFlow::MenuBrowsing => self.menu_browsing(rng).await,
        }
    }

    /// Issues one request and unconditionally records its outcome. Both arms
    /// of the transport result map to a sample: a response (any status) keeps
    /// its status code, a transport failure records status 0 (or the partial
    /// status the transport surfaced) with the elapsed time.
    async fn step(&self, endpoint: &str, req: HttpRequest) -> StepOutcome {
        let method = req.method.clone();
        let started = Instant::now();

        match self.client.request(req).await {
            Ok(res) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let success = (200..400).contains(&res.status);
                self.collector
                    .record_request(endpoint, &method, elapsed_ms, res.status, success);
                StepOutcome {
                    success,
                    body: res.json(),
                }
            }
            Err(err) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let status = err.partial_status().unwrap_or(0);
                self.collector
                    .record_request(endpoint, &method, elapsed_ms, status, false);
                StepOutcome {
                    success: false,
                    body: None,
                }
            }
        }
    }

    async fn think(&self, rng: &mut StdRng) {
        tokio::time::sleep(think_duration(rng, &self.config.think_time)).await;
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn dashboard_url(&self, path: &str) -> String {
        format!("{}{}", self.config.dashboard_url, path)
    }

    async fn browse_menu(&self, rng: &mut StdRng) {
        let endpoints = &self.config.endpoints;

        self.step(&endpoints.menu, HttpRequest::get(self.api_url(&endpoints.menu)))
            .await;
        self.think(rng).await;

        self.step(
            &endpoints.categories,
            HttpRequest::get(self.api_url(&endpoints.categories)),
        )
        .await;
        self.think(rng).await;

        self.step(
            &endpoints.items,
            HttpRequest::get(self.api_url(&endpoints.items)),
        )
        .await;
    }

    async fn create_order(&self, items: &[serde_json::Value], table_id: &str) -> StepOutcome {
        let endpoint = &self.config.endpoints.create_order;
        let body = serde_json::json!({
            "tableId": table_id,
            "items": items,
        });
        self.step(endpoint, HttpRequest::post_json(self.api_url(endpoint), body))
            .await
    }

    fn order_id(outcome: &StepOutcome) -> String {
        outcome
            .body
            .as_ref()
            .and_then(|b| b.get("orderId"))
            .and_then(|v| v.as_str())
            .unwrap_or("test-order-id")
            .to_string()
    }

    fn pick_table(&self, rng: &mut StdRng) -> String {
        let tables = &self.config.test_data.table_ids;
        if tables.is_empty() {
            return "table-1".to_string();
        }
        tables[rng.gen_range(0..tables.len())].clone()
    }

    fn sample_items(&self, count: usize) -> Vec<serde_json::Value> {
        self.config
            .test_data
            .sample_items
            .iter()
            .take(count)
            .map(|item| {
                serde_json::json!({
                    "id": item.id,
                    "name": item.name,
                    "price": item.price,
                })
            })
            .collect()
    }

    async fn customer_order(&self, rng: &mut StdRng) {
        self.browse_menu(rng).await;
        self.think(rng).await;

        let item_count = rng.gen_range(1..=self.config.test_data.sample_items.len().max(1));
        let items = self.sample_items(item_count);
        let table_id = self.pick_table(rng);
        let order = self.create_order(&items, &table_id).await;
        self.think(rng).await;

        if order.success {
            let order_id = Self::order_id(&order);

            // Recorded under the template so the per-endpoint rollup doesn't
            // fragment per order id.
            let template = &self.config.endpoints.get_order;
            let path = fill_path_params(template, &[("id", &order_id)]);
            self.step(template, HttpRequest::get(self.api_url(&path)))
                .await;
            self.think(rng).await;

            let endpoint = &self.config.endpoints.process_payment;
            let body = serde_json::json!({
                "orderId": order_id,
                "amount": 100,
                "cardNumber": self.config.test_data.test_card.number,
            });
            self.step(endpoint, HttpRequest::post_json(self.api_url(endpoint), body))
                .await;
        }
    }

    async fn admin_dashboard(&self, rng: &mut StdRng) {
        let endpoints = &self.config.endpoints;
        let creds = &self.config.test_data.admin_credentials;

        let login = self
            .step(
                &endpoints.login,
                HttpRequest::post_json(
                    self.dashboard_url(&endpoints.login),
                    serde_json::json!({
                        "email": creds.email,
                        "password": creds.password,
                    }),
                ),
            )
            .await;
        self.think(rng).await;

        let token = login
            .body
            .as_ref()
            .and_then(|b| b.get("token"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let auth = format!("Bearer {token}");

        self.step(
            &endpoints.tables,
            HttpRequest::get(self.api_url(&endpoints.tables))
                .with_header("authorization", auth.clone()),
        )
        .await;
        self.think(rng).await;

        self.step(
            &endpoints.order_report,
            HttpRequest::get(self.api_url(&endpoints.order_report))
                .with_header("authorization", auth.clone()),
        )
        .await;
        self.think(rng).await;

        self.step(
            &endpoints.payment_report,
            HttpRequest::get(self.api_url(&endpoints.payment_report))
                .with_header("authorization", auth),
        )
        .await;
    }

    async fn split_payment(&self, rng: &mut StdRng) {
        let items = self.sample_items(self.config.test_data.sample_items.len());
        let table_id = self
            .config
            .test_data
            .table_ids
            .first()
            .cloned()
            .unwrap_or_else(|| "table-1".to_string());

        let order = self.create_order(&items, &table_id).await;
        self.think(rng).await;

        if order.success {
            let order_id = Self::order_id(&order);
            let endpoint = &self.config.endpoints.process_payment;

            for _ in 0..2 {
                let body = serde_json::json!({
                    "orderId": order_id,
                    "amount": 50,
                    "splitPayment": true,
                });
                self.step(
                    endpoint,
                    HttpRequest::post_json(self.api_url(endpoint), body),
                )
                .await;
                self.think(rng).await;
            }
        }
    }

    async fn menu_browsing(&self, rng: &mut StdRng) {
        self.browse_menu(rng).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn scenario(name: &str, weight: u32, flow: ScenarioFlow) -> ScenarioConfig {
        ScenarioConfig {
            name: name.to_string(),
            weight,
            description: String::new(),
            steps: Vec::new(),
            flow,
        }
    }

    #[test]
    fn selection_frequency_tracks_weights() {
        let scenarios = vec![
            scenario("a", 40, ScenarioFlow::CustomerOrder),
            scenario("b", 30, ScenarioFlow::AdminDashboard),
            scenario("c", 20, ScenarioFlow::SplitPayment),
            scenario("d", 10, ScenarioFlow::MenuBrowsing),
        ];
        let total: u32 = scenarios.iter().map(|s| s.weight).sum();

        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = std::collections::HashMap::new();
        let draws = 100_000;
        for _ in 0..draws {
            let draw = rng.gen_range(0.0..total as f64);
            let picked = pick_scenario(&scenarios, draw);
            *counts.entry(picked.name.clone()).or_insert(0u64) += 1;
        }

        for s in &scenarios {
            let observed = counts.get(&s.name).copied().unwrap_or(0) as f64 / draws as f64;
            let expected = s.weight as f64 / total as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "{}: observed {observed:.3}, expected {expected:.3}",
                s.name
            );
        }
    }

    #[test]
    fn tie_goes_to_the_first_declared_scenario() {
        let scenarios = vec![
            scenario("a", 50, ScenarioFlow::MenuBrowsing),
            scenario("b", 50, ScenarioFlow::CustomerOrder),
        ];

        // Cumulative weight of `a` is exactly 50; "meets or exceeds" keeps a.
        assert_eq!(pick_scenario(&scenarios, 50.0).name, "a");
        assert_eq!(pick_scenario(&scenarios, 50.1).name, "b");
    }

    #[test]
    fn selection_walks_in_declared_order() {
        let scenarios = vec![
            scenario("a", 40, ScenarioFlow::MenuBrowsing),
            scenario("b", 30, ScenarioFlow::CustomerOrder),
            scenario("c", 30, ScenarioFlow::SplitPayment),
        ];

        assert_eq!(pick_scenario(&scenarios, 0.0).name, "a");
        assert_eq!(pick_scenario(&scenarios, 39.9).name, "a");
        assert_eq!(pick_scenario(&scenarios, 40.5).name, "b");
        assert_eq!(pick_scenario(&scenarios, 99.9).name, "c");
    }

    #[test]
    fn fill_path_params_substitutes_placeholders() {
        assert_eq!(
            fill_path_params("/api/orders/:id", &[("id", "o-17")]),
            "/api/orders/o-17"
        );
        assert_eq!(
            fill_path_params("/api/tables/:id/status", &[("id", "t-2")]),
            "/api/tables/t-2/status"
        );
        assert_eq!(fill_path_params("/api/menu", &[("id", "x")]), "/api/menu");
    }

    #[test]
    fn think_duration_stays_in_bounds() {
        let think = ThinkTime {
            min_ms: 100,
            max_ms: 200,
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let d = think_duration(&mut rng, &think);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(200));
        }
    }

    #[test]
    fn flow_names_parse_from_kebab_case() {
        use std::str::FromStr as _;
        assert_eq!(
            ScenarioFlow::from_str("customer-order").ok(),
            Some(ScenarioFlow::CustomerOrder)
        );
        assert_eq!(ScenarioFlow::MenuBrowsing.to_string(), "menu-browsing");
        assert!(ScenarioFlow::from_str("nope").is_err());
    }
}
