//! Ledger summary and financial report integration tests.
//!
//! Run with: ./scripts/integ-tests.sh -p billing-service

mod common;

use common::{create_test_client, create_test_invoice, dec, record_test_payment, spawn_app};
use serde_json::{json, Value};

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn ledger_records_shadow_entries_for_business_events() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let body = create_test_invoice(&app, client_id, "2", "50", "10", "5").await;
    let invoice_id = body["result"]["invoice"]["invoice_id"].as_str().unwrap();
    record_test_payment(&app, invoice_id, "105").await;

    let resp = app
        .client
        .post(app.url("/expense"))
        .json(&json!({
            "name": "Cold chain transport",
            "category": "logistics",
            "amount": "40"
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let entries: Value = app
        .client
        .get(app.url("/ledger?page_size=50"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = entries["result"].as_array().unwrap().clone();

    // invoice revenue credit + payment asset debit + expense debit/credit pair
    assert_eq!(entries.len(), 4);
    assert!(entries
        .iter()
        .any(|e| e["entry_type"] == "revenue" && dec(&e["credit"]) == "105".parse().unwrap()));
    assert!(entries
        .iter()
        .any(|e| e["entry_type"] == "asset" && dec(&e["debit"]) == "105".parse().unwrap()));
    assert!(entries
        .iter()
        .any(|e| e["entry_type"] == "expense" && dec(&e["debit"]) == "40".parse().unwrap()));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn ledger_summary_derives_net_profit_and_tax() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    create_test_invoice(&app, client_id, "2", "50", "0", "0").await;
    app.client
        .post(app.url("/expense"))
        .json(&json!({ "name": "Gloves", "category": "supplies", "amount": "30" }))
        .send()
        .await
        .unwrap();

    let summary: Value = app
        .client
        .get(app.url("/ledger/summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["success"], true);

    let result = &summary["result"];
    assert_eq!(dec(&result["revenue"]), "100".parse().unwrap());
    assert_eq!(dec(&result["expenses"]), "30".parse().unwrap());
    assert_eq!(dec(&result["net_profit"]), "70".parse().unwrap());
    // 70 x 0.18
    assert_eq!(dec(&result["estimated_tax"]), "12.60".parse().unwrap());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn financial_summary_rolls_up_everything() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let body = create_test_invoice(&app, client_id, "2", "50", "10", "5").await;
    let invoice_id = body["result"]["invoice"]["invoice_id"].as_str().unwrap();
    record_test_payment(&app, invoice_id, "50").await;

    app.client
        .post(app.url("/expense"))
        .json(&json!({ "name": "Gloves", "category": "supplies", "amount": "30" }))
        .send()
        .await
        .unwrap();
    app.client
        .post(app.url("/expense"))
        .json(&json!({ "name": "Courier", "category": "logistics", "amount": "15" }))
        .send()
        .await
        .unwrap();

    let summary: Value = app
        .client
        .get(app.url("/financial-reports/summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["success"], true);

    let result = &summary["result"];
    assert_eq!(dec(&result["total_revenue"]), "105".parse().unwrap());
    assert_eq!(dec(&result["total_expenses"]), "45".parse().unwrap());
    assert_eq!(dec(&result["net_profit"]), "60".parse().unwrap());

    let categories = result["expenses_by_category"].as_array().unwrap();
    assert_eq!(categories.len(), 2);

    let trend = result["monthly_trend"].as_array().unwrap();
    assert_eq!(trend.len(), 1);
    assert_eq!(dec(&trend[0]["revenue"]), "105".parse().unwrap());
    assert_eq!(dec(&trend[0]["expenses"]), "45".parse().unwrap());

    // 55.00 still outstanding, due today, so it sits in the freshest bucket
    assert_eq!(
        dec(&result["outstanding"]["days_0_7"]),
        "55".parse().unwrap()
    );
}
