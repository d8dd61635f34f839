use anyhow::Context as _;

use crate::cli::InitArgs;

pub const CONFIG_FILE_NAME: &str = "ordersim.yaml";

const CONFIG_TEMPLATE: &str = r#"# ordersim load-test configuration.
#
# Every field is optional; omitted sections fall back to the defaults below.
# Run with:  ordersim run ordersim.yaml

concurrent_users: 50
test_duration_secs: 60
ramp_up_secs: 10

# Randomized pause between a user's actions, simulating human pacing.
think_time:
  min_ms: 500
  max_ms: 2000

request_timeout_ms: 30000

base_url: https://api-dev.example.test
dashboard_url: https://dashboard-dev.example.test

# Endpoint paths may contain `:param` placeholders.
endpoints:
  login: /authentication/login
  logout: /authentication/logout
  menu: /api/menu
  categories: /api/categories
  items: /api/items
  create_order: /api/orders
  get_order: /api/orders/:id
  process_payment: /api/payments
  verify_payment: /api/payments/verify
  tables: /api/tables
  update_table_status: /api/tables/:id/status
  payment_report: /api/reports/payments
  order_report: /api/reports/orders

# Weighted user journeys. Selection is proportional to weight; `flow` picks
# one of: customer-order, admin-dashboard, split-payment, menu-browsing.
scenarios:
  - name: Customer Order Flow
    weight: 40
    description: Simulates customer browsing menu and placing orders
    flow: customer-order
    steps:
      - Browse Menu
      - Browse Categories
      - View Items
      - Confirm Order
      - Process Payment
  - name: Admin Dashboard Operations
    weight: 30
    description: Simulates admin managing tables and viewing reports
    flow: admin-dashboard
    steps:
      - Login to Dashboard
      - View Tables
      - Check Order Reports
      - Check Payment Reports
  - name: Split Payment Flow
    weight: 20
    description: Simulates customers splitting bills
    flow: split-payment
    steps:
      - Create Order
      - Split Invoice
      - Process First Payment
      - Process Second Payment
  - name: Menu Browsing Only
    weight: 10
    description: Simulates users just browsing the menu
    flow: menu-browsing
    steps:
      - Browse Menu
      - Browse Categories
      - View Items

thresholds:
  response_time:
    p50_ms: 500
    p90_ms: 1000
    p95_ms: 2000
    p99_ms: 5000
  error_rate_percent: 1.0
  min_throughput: 100.0
  min_success_rate_percent: 99.0

report:
  output_dir: test-results/performance
  html_report_name: performance-report.html
  json_report_name: performance-metrics.json
  csv_report_name: performance-data.csv

test_data:
  admin_credentials:
    email: admin@example.test
    password: password
  sample_items:
    - { id: 1, name: Item 1, price: 50 }
    - { id: 2, name: Item 2, price: 75 }
    - { id: 3, name: Item 3, price: 100 }
  test_card:
    number: "5123450000000008"
    expiry: "01/39"
    cvv: "100"
    holder_name: APPROVED
  table_ids:
    - 1badfbf9-8d2e-4119-a9c2-61c3575ceaa9
    - 2fe4ca70-6b80-4c12-b1d0-3dc36060a908

monitor_interval_secs: 5

# Uncomment for reproducible scenario selection and think times:
# seed: 42
"#;

pub fn init(args: InitArgs) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("failed to create directory: {}", args.dir.display()))?;

    let path = args.dir.join(CONFIG_FILE_NAME);
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    std::fs::write(&path, CONFIG_TEMPLATE)
        .with_context(|| format!("failed to write config: {}", path.display()))?;

    println!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordersim_core::runner::LoadConfig;

    #[test]
    fn template_parses_and_validates() {
        let config: LoadConfig = match serde_yaml::from_str(CONFIG_TEMPLATE) {
            Ok(v) => v,
            Err(err) => panic!("template did not parse: {err}"),
        };
        if let Err(err) = config.validate() {
            panic!("template config should validate: {err}");
        }
        assert_eq!(config.concurrent_users, 50);
        assert_eq!(config.scenarios.len(), 4);
        assert_eq!(config.total_weight(), 100);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(err) => panic!("tempdir failed: {err}"),
        };

        let args = InitArgs {
            dir: dir.path().to_path_buf(),
            force: false,
        };
        if let Err(err) = init(args) {
            panic!("first init failed: {err}");
        }

        let again = InitArgs {
            dir: dir.path().to_path_buf(),
            force: false,
        };
        assert!(init(again).is_err());

        let forced = InitArgs {
            dir: dir.path().to_path_buf(),
            force: true,
        };
        if let Err(err) = init(forced) {
            panic!("forced init failed: {err}");
        }
    }
}
