mod common;

use common::{create_order, TestApp};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn my_orders_only_returns_own_orders() {
    let app = TestApp::spawn().await;
    let ada = app.customer_token("user-1", "Ada", "ada@example.com");
    let grace = app.customer_token("user-2", "Grace", "grace@example.com");

    create_order(&app, &ada).await;
    create_order(&app, &grace).await;
    create_order(&app, &ada).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/orders/me", app.address))
        .bearer_auth(&ada)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, response.status());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let orders = body.as_array().expect("expected an array");
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|order| order["user_id"] == "user-1"));

    app.cleanup().await;
}

#[tokio::test]
async fn my_orders_come_newest_first() {
    let app = TestApp::spawn().await;
    let token = app.customer_token("user-1", "Ada", "ada@example.com");

    let first = create_order(&app, &token).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = create_order(&app, &token).await;

    let client = reqwest::Client::new();
    let body: serde_json::Value = client
        .get(format!("{}/api/orders/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    let orders = body.as_array().expect("expected an array");
    assert_eq!(orders[0]["id"], second["id"]);
    assert_eq!(orders[1]["id"], first["id"]);

    app.cleanup().await;
}

#[tokio::test]
async fn admin_listing_requires_admin_role() {
    let app = TestApp::spawn().await;
    let token = app.customer_token("user-1", "Ada", "ada@example.com");

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/orders", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::FORBIDDEN, response.status());

    app.cleanup().await;
}

#[tokio::test]
async fn admin_listing_returns_all_orders_with_pagination() {
    let app = TestApp::spawn().await;
    let ada = app.customer_token("user-1", "Ada", "ada@example.com");
    let grace = app.customer_token("user-2", "Grace", "grace@example.com");

    create_order(&app, &ada).await;
    create_order(&app, &grace).await;
    create_order(&app, &ada).await;

    let client = reqwest::Client::new();
    let body: serde_json::Value = client
        .get(format!("{}/api/orders?page=1&page_size=2", app.address))
        .bearer_auth(&app.admin_token())
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(body["total"], 3);
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);
    assert_eq!(body["total_pages"], 2);

    app.cleanup().await;
}

#[tokio::test]
async fn admin_listing_filters_by_payment_status_and_text() {
    let app = TestApp::spawn().await;
    let ada = app.customer_token("user-1", "Ada", "ada@example.com");
    let grace = app.customer_token("user-2", "Grace", "grace@example.com");

    let order = create_order(&app, &ada).await;
    create_order(&app, &grace).await;

    let client = reqwest::Client::new();
    let response = client
        .put(format!(
            "{}/api/orders/{}/payment-status",
            app.address,
            order["id"].as_str().unwrap()
        ))
        .bearer_auth(&app.admin_token())
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, response.status());

    let body: serde_json::Value = client
        .get(format!(
            "{}/api/orders?payment_status=approved",
            app.address
        ))
        .bearer_auth(&app.admin_token())
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(body["total"], 1);
    assert_eq!(body["orders"][0]["id"], order["id"]);

    let body: serde_json::Value = client
        .get(format!("{}/api/orders?q=grace", app.address))
        .bearer_auth(&app.admin_token())
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(body["total"], 1);
    assert_eq!(body["orders"][0]["client_name"], "Grace");

    app.cleanup().await;
}

#[tokio::test]
async fn order_detail_visible_to_owner_and_admin_only() {
    let app = TestApp::spawn().await;
    let ada = app.customer_token("user-1", "Ada", "ada@example.com");
    let grace = app.customer_token("user-2", "Grace", "grace@example.com");

    let order = create_order(&app, &ada).await;
    let url = format!(
        "{}/api/orders/{}",
        app.address,
        order["id"].as_str().unwrap()
    );

    let client = reqwest::Client::new();
    let response = client
        .get(&url)
        .bearer_auth(&ada)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, response.status());

    let response = client
        .get(&url)
        .bearer_auth(&app.admin_token())
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::OK, response.status());

    let response = client
        .get(&url)
        .bearer_auth(&grace)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(StatusCode::FORBIDDEN, response.status());

    app.cleanup().await;
}
