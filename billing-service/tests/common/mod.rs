//! Common test utilities for billing-service integration tests.

use billing_service::config::{AccountingConfig, BillingConfig, DatabaseConfig};
use billing_service::startup::Application;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Decimal fields serialize as JSON strings; parse one back for comparison.
pub fn dec(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected decimal string, got {}", value))
        .parse()
        .unwrap()
}

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,billing_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A running application plus an authenticated client scoped to a unique
/// organization, so tests do not observe each other's data.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub org_id: Uuid,
    pub user_id: Uuid,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Spawn a test application bound to a random port.
pub async fn spawn_app() -> TestApp {
    init_tracing();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set - use scripts/integ-tests.sh to run tests");

    let config = BillingConfig {
        common: CommonConfig {
            port: 0,
            ..CommonConfig::default()
        },
        service_name: "billing-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new(database_url),
            max_connections: 2,
            min_connections: 1,
        },
        accounting: AccountingConfig {
            tax_rate: "0.18".parse().unwrap(),
            revenue_account: "Invoice Revenue".to_string(),
            cash_account: "Cash".to_string(),
        },
    };

    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let base_url = format!("http://127.0.0.1:{}", port);
    let org_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let mut headers = HeaderMap::new();
    headers.insert("X-Org-ID", HeaderValue::from_str(&org_id.to_string()).unwrap());
    headers.insert(
        "X-User-ID",
        HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );
    headers.insert("X-User-Role", HeaderValue::from_static("pharmacist"));

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .unwrap();

    // Wait for the server to be ready with retry
    let mut attempts = 0;
    loop {
        match client.get(format!("{}/health", base_url)).send().await {
            Ok(resp) if resp.status().is_success() => break,
            _ if attempts < 20 => {
                attempts += 1;
                tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            }
            _ => panic!("Server did not become healthy after 20 attempts"),
        }
    }

    TestApp {
        base_url,
        client,
        org_id,
        user_id,
    }
}

/// Create a client and return its id.
pub async fn create_test_client(app: &TestApp, name: &str) -> Uuid {
    let resp = app
        .client
        .post(app.url("/client"))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to create client");
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    body["result"]["client_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap()
}

/// Create an invoice with one line item and return the response body.
pub async fn create_test_invoice(
    app: &TestApp,
    client_id: Uuid,
    quantity: &str,
    price: &str,
    tax_rate: &str,
    discount: &str,
) -> Value {
    let resp = app
        .client
        .post(app.url("/invoice"))
        .json(&json!({
            "client_id": client_id,
            "items": [
                { "item_name": "Saline 0.9%", "quantity": quantity, "unit_price": price }
            ],
            "tax_rate": tax_rate,
            "discount": discount
        }))
        .send()
        .await
        .expect("Failed to create invoice");
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    body
}

/// Record a payment; returns (HTTP status, response body).
pub async fn record_test_payment(
    app: &TestApp,
    invoice_id: &str,
    amount: &str,
) -> (reqwest::StatusCode, Value) {
    let resp = app
        .client
        .post(app.url("/payment"))
        .json(&json!({
            "invoice_id": invoice_id,
            "amount": amount,
            "account": "Cash"
        }))
        .send()
        .await
        .expect("Failed to send payment request");
    let status = resp.status();
    let body: Value = resp.json().await.unwrap();
    (status, body)
}
