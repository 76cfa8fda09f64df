//! Unified activity timeline integration tests.
//!
//! Run with: ./scripts/integ-tests.sh -p billing-service

mod common;

use common::{create_test_client, create_test_invoice, dec, spawn_app};
use serde_json::{json, Value};

async fn seed_activity(app: &common::TestApp) -> uuid::Uuid {
    let client_id = create_test_client(app, "Ward 3").await;

    let order: Value = app
        .client
        .post(app.url("/order"))
        .json(&json!({
            "client_id": client_id,
            "items": [
                { "item_id": uuid::Uuid::new_v4(), "item_name": "Paracetamol", "quantity": "10", "unit_price": "5" }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["result"]["order"]["order_id"].as_str().unwrap();
    let line_id = order["result"]["items"][0]["order_item_id"].as_str().unwrap();

    app.client
        .post(app.url("/return"))
        .json(&json!({
            "order_id": order_id,
            "order_item_id": line_id,
            "returned_quantity": "2",
            "reason": "expired"
        }))
        .send()
        .await
        .unwrap();

    create_test_invoice(app, client_id, "8", "5", "0", "0").await;

    client_id
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn timeline_merges_orders_invoices_and_returns() {
    let app = spawn_app().await;
    seed_activity(&app).await;

    let history: Value = app
        .client
        .get(app.url("/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["success"], true);

    let result = &history["result"];
    assert_eq!(result["total"], 3);

    let entries = result["entries"].as_array().unwrap();
    let types: Vec<&str> = entries
        .iter()
        .map(|e| e["activity_type"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"order"));
    assert!(types.contains(&"invoice"));
    assert!(types.contains(&"return"));

    // Returns carry no monetary value in this view
    let return_entry = entries
        .iter()
        .find(|e| e["activity_type"] == "return")
        .unwrap();
    assert_eq!(dec(&return_entry["amount"]), "0".parse().unwrap());

    // Most recent first
    let dates: Vec<&str> = entries
        .iter()
        .map(|e| e["activity_date"].as_str().unwrap())
        .collect();
    let mut sorted = dates.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn timeline_filters_by_type_and_text() {
    let app = spawn_app().await;
    seed_activity(&app).await;

    let invoices_only: Value = app
        .client
        .get(app.url("/history?activity_type=invoice"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(invoices_only["result"]["total"], 1);
    assert_eq!(
        invoices_only["result"]["entries"][0]["activity_type"],
        "invoice"
    );

    let search: Value = app
        .client
        .get(app.url("/history?q=paracetamol"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // The return entry names the item
    assert_eq!(search["result"]["total"], 1);
    assert_eq!(search["result"]["entries"][0]["activity_type"], "return");
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn timeline_pagination_reports_total() {
    let app = spawn_app().await;
    seed_activity(&app).await;

    let page: Value = app
        .client
        .get(app.url("/history?page=2&page_size=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["result"]["total"], 3);
    assert_eq!(page["result"]["entries"].as_array().unwrap().len(), 1);
}
