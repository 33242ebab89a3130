//! Integration tests for the marketplace server.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p marketplace-cli -- migrate
//!
//! # Start the server
//! cargo run -p marketplace-server
//!
//! # Run the ignored integration tests (ledger tests also need the database URL)
//! cargo test -p marketplace-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `MARKETPLACE_TEST_URL` - Server under test (default `http://localhost:3000`)
//! - `STRIPE_WEBHOOK_SECRET` - Must match the server's, for signed deliveries
//! - `MARKETPLACE_DATABASE_URL` - Migrated database for the ledger tests
//!   (falls back to `DATABASE_URL`)

#![allow(clippy::expect_used)]

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use marketplace_server::stripe::WebhookVerifier;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("MARKETPLACE_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// HTTP client that keeps the session cookie between requests.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A user created through `/auth/register`.
pub struct Registered {
    /// User JSON from the registration response.
    pub user: Value,
    pub email: String,
    pub password: String,
}

/// Register a fresh user. Registration also logs the client in.
pub async fn register(client: &Client, prefix: &str) -> Registered {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(12).collect();
    let username = format!("{prefix}_{suffix}");
    let email = format!("{username}@integration.test");
    let password = "correct horse battery staple".to_string();

    let resp = client
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
            "first_name": "Test",
            "last_name": prefix,
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let user = resp.json().await.expect("Failed to parse registration response");
    Registered {
        user,
        email,
        password,
    }
}

/// Register a fresh user, then log in again explicitly as them.
///
/// Returns the user JSON from `/auth/login`.
pub async fn register_and_login(client: &Client, prefix: &str) -> Value {
    let registered = register(client, prefix).await;

    let resp = client
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": registered.email, "password": registered.password }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK);

    resp.json().await.expect("Failed to parse login response")
}

/// Create a listing as the logged-in user.
pub async fn create_product(client: &Client, price: &str, quantity: i32) -> Value {
    let resp = client
        .post(format!("{}/products", base_url()))
        .json(&json!({
            "name": "Integration lamp",
            "description": "Created by the integration tests",
            "price": price,
            "currency": "USD",
            "quantity": quantity,
        }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::CREATED);

    resp.json().await.expect("Failed to parse product")
}

/// Verifier sharing the server's webhook secret, used to sign test deliveries.
#[must_use]
pub fn webhook_verifier() -> WebhookVerifier {
    let secret = std::env::var("STRIPE_WEBHOOK_SECRET")
        .expect("STRIPE_WEBHOOK_SECRET must match the server under test");
    WebhookVerifier::new(SecretString::from(secret), Duration::from_secs(300))
}

/// Pool on the migrated test database.
pub async fn database() -> PgPool {
    let url = std::env::var("MARKETPLACE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("MARKETPLACE_DATABASE_URL must point at a migrated database");

    PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("Failed to connect to database")
}
