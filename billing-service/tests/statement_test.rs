//! Client statement integration tests.
//!
//! Run with: ./scripts/integ-tests.sh -p billing-service

mod common;

use common::{create_test_client, create_test_invoice, dec, record_test_payment, spawn_app};
use serde_json::Value;

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn statement_merges_invoices_and_payments_with_running_balance() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let body = create_test_invoice(&app, client_id, "2", "50", "10", "5").await;
    let invoice_id = body["result"]["invoice"]["invoice_id"].as_str().unwrap();

    let (status, _) = record_test_payment(&app, invoice_id, "50").await;
    assert!(status.is_success());

    let statement: Value = app
        .client
        .get(app.url(&format!("/ledger/client/{}", client_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(statement["success"], true);

    let rows = statement["result"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);

    // Invoice debit first, then the payment credit
    assert_eq!(dec(&rows[0]["debit"]), "105".parse().unwrap());
    assert_eq!(dec(&rows[0]["balance"]), "105".parse().unwrap());
    assert_eq!(dec(&rows[1]["credit"]), "50".parse().unwrap());
    assert_eq!(dec(&rows[1]["balance"]), "55".parse().unwrap());

    assert_eq!(dec(&statement["result"]["balance"]), "55".parse().unwrap());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn statement_is_reproducible_across_requests() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    // Two invoices and a payment on the same day exercise the tie-break
    let first = create_test_invoice(&app, client_id, "1", "10", "0", "0").await;
    create_test_invoice(&app, client_id, "1", "20", "0", "0").await;
    let invoice_id = first["result"]["invoice"]["invoice_id"].as_str().unwrap();
    record_test_payment(&app, invoice_id, "10").await;

    let mut balances = Vec::new();
    for _ in 0..2 {
        let statement: Value = app
            .client
            .get(app.url(&format!("/ledger/client/{}", client_id)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let rows: Vec<String> = statement["result"]["rows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["balance"].as_str().unwrap().to_string())
            .collect();
        balances.push(rows);
    }
    assert_eq!(balances[0], balances[1]);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn removed_invoices_are_excluded_from_statement() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let body = create_test_invoice(&app, client_id, "1", "30", "0", "0").await;
    let invoice_id = body["result"]["invoice"]["invoice_id"].as_str().unwrap();

    app.client
        .delete(app.url(&format!("/invoice/{}", invoice_id)))
        .send()
        .await
        .unwrap();

    let statement: Value = app
        .client
        .get(app.url(&format!("/ledger/client/{}", client_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(statement["result"]["rows"].as_array().unwrap().is_empty());
}
