mod common;

use common::{order_payload, TestApp};
use reqwest::{multipart, StatusCode};
use serde_json::json;

/// The manual-payment flow end to end: a customer places an order, the
/// admin approves the payment, and a re-uploaded proof drops the payment
/// back to pending for re-verification.
#[tokio::test]
async fn manual_payment_flow_end_to_end() {
    let app = TestApp::spawn().await;
    let customer = app.customer_token("user-1", "Ada", "ada@example.com");
    let admin = app.admin_token();
    let client = reqwest::Client::new();

    // Customer places an order: 2 x 1000 with a matching total of 2000.
    let order: serde_json::Value = client
        .post(format!("{}/api/orders", app.address))
        .bearer_auth(&customer)
        .json(&order_payload(2, 1000, 2000))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["delivery_status"], "pending");
    let order_id = order["id"].as_str().unwrap();

    // Customer uploads the payment proof.
    let form = multipart::Form::new().part(
        "paymentProof",
        multipart::Part::bytes(b"wire transfer receipt".to_vec())
            .file_name("receipt.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );
    let response = client
        .post(format!(
            "{}/api/orders/{}/payment-proof",
            app.address, order_id
        ))
        .bearer_auth(&customer)
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, response.status());

    // Admin verifies the proof and approves.
    let approved: serde_json::Value = client
        .put(format!(
            "{}/api/orders/{}/payment-status",
            app.address, order_id
        ))
        .bearer_auth(&admin)
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(approved["payment_status"], "approved");

    // Customer re-uploads; approval is void until re-verified.
    let form = multipart::Form::new().part(
        "paymentProof",
        multipart::Part::bytes(b"corrected receipt".to_vec())
            .file_name("receipt2.pdf")
            .mime_str("application/pdf")
            .unwrap(),
    );
    let reuploaded: serde_json::Value = client
        .post(format!(
            "{}/api/orders/{}/payment-proof",
            app.address, order_id
        ))
        .bearer_auth(&customer)
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(reuploaded["payment_status"], "pending");

    // Delivery proceeds to shipped while payment awaits re-verification.
    for status in ["processing", "shipped"] {
        let response = client
            .put(format!(
                "{}/api/orders/{}/delivery-status",
                app.address, order_id
            ))
            .bearer_auth(&admin)
            .json(&json!({ "status": status }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(StatusCode::OK, response.status());
    }

    let final_state: serde_json::Value = client
        .get(format!("{}/api/orders/{}", app.address, order_id))
        .bearer_auth(&customer)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(final_state["payment_status"], "pending");
    assert_eq!(final_state["delivery_status"], "shipped");

    app.cleanup().await;
}
