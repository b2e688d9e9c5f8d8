use order_service::config::{DatabaseBackend, OrderConfig};
use order_service::services::{JwtService, OrderStore, Role};
use order_service::startup::Application;
use secrecy::Secret;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub store: Arc<dyn OrderStore>,
    pub jwt: JwtService,
    pub storage_path: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let storage_path = std::env::temp_dir()
            .join(format!("order-test-storage-{}", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();

        let mut config = OrderConfig::load().expect("Failed to load configuration");
        config.common.port = 0; // Random port for testing
        config.database.backend = DatabaseBackend::Memory;
        config.storage.local_path = storage_path.clone();
        config.auth.jwt_secret = Secret::new("integration-test-secret".to_string());

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let address = format!("http://127.0.0.1:{}", app.port());
        let store = app.store();
        let jwt = app.jwt();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address,
            store,
            jwt,
            storage_path,
        }
    }

    pub fn token_for(&self, user_id: &str, name: &str, email: &str, role: Role) -> String {
        self.jwt
            .generate_access_token(user_id, email, name, role)
            .expect("Failed to generate test token")
    }

    pub fn customer_token(&self, user_id: &str, name: &str, email: &str) -> String {
        self.token_for(user_id, name, email, Role::Customer)
    }

    pub fn admin_token(&self) -> String {
        self.token_for("admin-1", "Ops", "ops@example.com", Role::Admin)
    }

    /// Cleanup test resources (uploaded files).
    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.storage_path).await;
    }
}

/// A well-formed create-order body: `quantity` x `unit_price` plus a
/// caller-chosen total so tests can make it disagree with the items.
pub fn order_payload(quantity: u32, unit_price: i64, total_amount: i64) -> serde_json::Value {
    json!({
        "items": [{
            "product_id": "prod-1",
            "name": "Linen shirt",
            "quantity": quantity,
            "unit_price": unit_price,
            "size": "M",
            "color": "navy",
            "image": "/images/prod-1.webp"
        }],
        "total_amount": total_amount,
        "shipping_address": {
            "street": "12 Rue de la Paix",
            "city": "Paris",
            "zip": "75002",
            "country": "FR"
        },
        "payment_method": "bank transfer"
    })
}

/// Create an order through the API and return the response body.
pub async fn create_order(app: &TestApp, token: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/orders", app.address))
        .bearer_auth(token)
        .json(&order_payload(2, 1000, 2000))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(reqwest::StatusCode::CREATED, response.status());
    response.json().await.expect("Failed to parse JSON")
}
