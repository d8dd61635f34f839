use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_LOGIN: &str = "/authentication/login";
pub const PATH_MENU: &str = "/api/menu";
pub const PATH_CATEGORIES: &str = "/api/categories";
pub const PATH_ITEMS: &str = "/api/items";
pub const PATH_ORDERS: &str = "/api/orders";
pub const PATH_PAYMENTS: &str = "/api/payments";
pub const PATH_TABLES: &str = "/api/tables";
pub const PATH_ORDER_REPORT: &str = "/api/reports/orders";
pub const PATH_PAYMENT_REPORT: &str = "/api/reports/payments";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_FAILING: &str = "/failing";

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    orders_created: Arc<AtomicU64>,
    payments_processed: Arc<AtomicU64>,
    logins: Arc<AtomicU64>,
    saw_bearer_auth: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_orders_created(&self) {
        self.orders_created.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_payments_processed(&self) {
        self.payments_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_logins(&self) {
        self.logins.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_saw_bearer_auth(&self) {
        self.saw_bearer_auth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn orders_created(&self) -> u64 {
        self.orders_created.load(Ordering::Relaxed)
    }

    pub fn payments_processed(&self) -> u64 {
        self.payments_processed.load(Ordering::Relaxed)
    }

    pub fn logins(&self) -> u64 {
        self.logins.load(Ordering::Relaxed)
    }

    pub fn saw_bearer_auth(&self) -> u64 {
        self.saw_bearer_auth.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Deserialize)]
struct CreateOrderRequest {
    #[serde(rename = "tableId")]
    table_id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentRequest {
    #[serde(rename = "orderId")]
    order_id: String,
}

async fn handle_menu(State(stats): State<TestServerStats>) -> Json<Value> {
    stats.inc_requests_total();
    Json(json!({"categories": 3, "items": 12}))
}

async fn handle_categories(State(stats): State<TestServerStats>) -> Json<Value> {
    stats.inc_requests_total();
    Json(json!([{"id": 1, "name": "Mains"}, {"id": 2, "name": "Drinks"}]))
}

async fn handle_items(State(stats): State<TestServerStats>) -> Json<Value> {
    stats.inc_requests_total();
    Json(json!([{"id": 1, "name": "Item 1", "price": 50}]))
}

async fn handle_login(
    State(stats): State<TestServerStats>,
    Json(_body): Json<Value>,
) -> Json<Value> {
    stats.inc_requests_total();
    stats.inc_logins();
    Json(json!({"token": "test-token"}))
}

async fn handle_create_order(
    State(stats): State<TestServerStats>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    stats.inc_requests_total();

    let parsed: Result<CreateOrderRequest, _> = serde_json::from_value(body);
    match parsed {
        Ok(req) if !req.table_id.is_empty() => {
            stats.inc_orders_created();
            (StatusCode::CREATED, Json(json!({"orderId": "order-1"})))
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "tableId is required"})),
        ),
    }
}

async fn handle_get_order(
    State(stats): State<TestServerStats>,
    Path(id): Path<String>,
) -> Json<Value> {
    stats.inc_requests_total();
    Json(json!({"orderId": id, "status": "open"}))
}

async fn handle_payment(
    State(stats): State<TestServerStats>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    stats.inc_requests_total();

    let parsed: Result<PaymentRequest, _> = serde_json::from_value(body);
    match parsed {
        Ok(req) if !req.order_id.is_empty() => {
            stats.inc_payments_processed();
            (StatusCode::OK, Json(json!({"status": "approved"})))
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "orderId is required"})),
        ),
    }
}

async fn handle_tables(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
) -> Json<Value> {
    stats.inc_requests_total();
    track_bearer(&stats, &headers);
    Json(json!([{"id": "t-1", "status": "free"}, {"id": "t-2", "status": "busy"}]))
}

async fn handle_order_report(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
) -> Json<Value> {
    stats.inc_requests_total();
    track_bearer(&stats, &headers);
    Json(json!({"orders": 7}))
}

async fn handle_payment_report(
    State(stats): State<TestServerStats>,
    headers: HeaderMap,
) -> Json<Value> {
    stats.inc_requests_total();
    track_bearer(&stats, &headers);
    Json(json!({"payments": 4}))
}

async fn handle_slow(State(stats): State<TestServerStats>) -> Json<Value> {
    stats.inc_requests_total();
    sleep(Duration::from_millis(50)).await;
    Json(json!({"ok": true}))
}

async fn handle_failing(State(stats): State<TestServerStats>) -> (StatusCode, Json<Value>) {
    stats.inc_requests_total();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "induced failure"})),
    )
}

fn track_bearer(stats: &TestServerStats, headers: &HeaderMap) {
    if headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "))
    {
        stats.inc_saw_bearer_auth();
    }
}

pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route(PATH_MENU, get(handle_menu))
        .route(PATH_CATEGORIES, get(handle_categories))
        .route(PATH_ITEMS, get(handle_items))
        .route(PATH_LOGIN, post(handle_login))
        .route(PATH_ORDERS, post(handle_create_order))
        .route("/api/orders/{id}", get(handle_get_order))
        .route(PATH_PAYMENTS, post(handle_payment))
        .route(PATH_TABLES, get(handle_tables))
        .route(PATH_ORDER_REPORT, get(handle_order_report))
        .route(PATH_PAYMENT_REPORT, get(handle_payment_report))
        .route(PATH_SLOW, get(handle_slow))
        .route(PATH_FAILING, get(handle_failing).post(handle_failing))
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        let base_url = format!("http://{addr}");

        Ok(Self {
            addr,
            base_url,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
