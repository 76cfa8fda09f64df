//! Invoice builder integration tests.
//!
//! Run with: ./scripts/integ-tests.sh -p billing-service

mod common;

use common::{create_test_client, create_test_invoice, dec, spawn_app};
use serde_json::{json, Value};

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn invoice_totals_are_derived() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    // 2 x 50 at 10% tax with a 5.00 discount
    let body = create_test_invoice(&app, client_id, "2", "50", "10", "5").await;
    let invoice = &body["result"]["invoice"];

    assert_eq!(dec(&invoice["sub_total"]), "100".parse().unwrap());
    assert_eq!(dec(&invoice["tax_total"]), "10".parse().unwrap());
    assert_eq!(dec(&invoice["total"]), "105".parse().unwrap());
    assert_eq!(invoice["payment_status"], "unpaid");
    assert_eq!(invoice["status"], "pending");
    assert!(invoice["pdf"].as_str().unwrap().ends_with(".pdf"));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn invoice_numbers_increase_per_organization() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let first = create_test_invoice(&app, client_id, "1", "10", "0", "0").await;
    let second = create_test_invoice(&app, client_id, "1", "10", "0", "0").await;

    let n1 = first["result"]["invoice"]["invoice_number"].as_i64().unwrap();
    let n2 = second["result"]["invoice"]["invoice_number"].as_i64().unwrap();
    assert_eq!(n2, n1 + 1);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn empty_item_list_is_rejected_with_envelope() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let resp = app
        .client
        .post(app.url("/invoice"))
        .json(&json!({ "client_id": client_id, "items": [] }))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().len() > 0);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn fully_discounted_invoice_starts_paid() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let body = create_test_invoice(&app, client_id, "1", "10", "0", "10").await;
    let invoice = &body["result"]["invoice"];

    assert_eq!(dec(&invoice["total"]), "0".parse().unwrap());
    assert_eq!(invoice["payment_status"], "paid");
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn invoice_from_order_uses_return_adjusted_quantities() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let order: Value = app
        .client
        .post(app.url("/order"))
        .json(&json!({
            "client_id": client_id,
            "items": [
                { "item_id": uuid::Uuid::new_v4(), "item_name": "Paracetamol", "quantity": "10", "unit_price": "5" },
                { "item_id": uuid::Uuid::new_v4(), "item_name": "Gauze", "quantity": "4", "unit_price": "2" }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = order["result"]["order"]["order_id"].as_str().unwrap();
    let paracetamol_line = order["result"]["items"][0]["order_item_id"].as_str().unwrap();
    let gauze_line = order["result"]["items"][1]["order_item_id"].as_str().unwrap();

    // Partial return on the first line, full return on the second
    for (line, qty) in [(paracetamol_line, "3"), (gauze_line, "4")] {
        let resp = app
            .client
            .post(app.url("/return"))
            .json(&json!({
                "order_id": order_id,
                "order_item_id": line,
                "returned_quantity": qty,
                "reason": "unused"
            }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    let body: Value = app
        .client
        .post(app.url(&format!("/invoice/from-order/{}", order_id)))
        .json(&json!({ "tax_rate": "0", "discount": "0" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);

    // The fully-returned gauze line is excluded entirely
    let items = body["result"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["item_name"], "Paracetamol");
    assert_eq!(dec(&items[0]["quantity"]), "7".parse().unwrap());
    assert_eq!(dec(&items[0]["original_quantity"]), "10".parse().unwrap());
    assert_eq!(dec(&items[0]["returned_quantity"]), "3".parse().unwrap());

    // 7 x 5
    assert_eq!(
        dec(&body["result"]["invoice"]["total"]),
        "35".parse().unwrap()
    );
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn line_item_edit_rederives_totals() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let body = create_test_invoice(&app, client_id, "2", "50", "10", "5").await;
    let invoice_id = body["result"]["invoice"]["invoice_id"].as_str().unwrap();

    let updated: Value = app
        .client
        .patch(app.url(&format!("/invoice/{}", invoice_id)))
        .json(&json!({
            "items": [
                { "item_name": "Saline 0.9%", "quantity": "1", "unit_price": "50" }
            ],
            "tax_rate": "10",
            "discount": "0"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(updated["success"], true);
    assert_eq!(dec(&updated["result"]["invoice"]["total"]), "55".parse().unwrap());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn soft_deleted_invoice_disappears_from_reads() {
    let app = spawn_app().await;
    let client_id = create_test_client(&app, "Ward 3").await;

    let body = create_test_invoice(&app, client_id, "1", "10", "0", "0").await;
    let invoice_id = body["result"]["invoice"]["invoice_id"].as_str().unwrap();

    let resp = app
        .client
        .delete(app.url(&format!("/invoice/{}", invoice_id)))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let resp = app
        .client
        .get(app.url(&format!("/invoice/{}", invoice_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}
