//! HTTP route handlers for the marketplace.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness
//! GET  /health/ready            - Readiness (database)
//!
//! # Auth
//! POST /auth/register           - Create an account
//! POST /auth/login              - Password login
//! POST /auth/logout             - Logout
//! GET  /auth/me                 - Current user
//!
//! # Products (requires auth unless noted)
//! GET  /products                - Other sellers' listings
//! POST /products                - Create listing
//! GET  /products/mine           - Own listings
//! GET  /products/{id}           - Listing detail (public)
//! PUT  /products/{id}           - Edit own listing
//! DELETE /products/{id}         - Delete own listing
//! POST /products/{id}/buy       - Start checkout
//!
//! # Purchases (requires auth)
//! GET  /purchases               - Own purchases
//! GET  /purchases/{id}          - One own purchase
//!
//! # Checkout return pages (requires auth)
//! GET  /checkout/success        - Buyer came back after paying
//! GET  /checkout/cancel         - Buyer abandoned the hosted checkout
//!
//! # Payouts (requires auth)
//! GET|POST /payouts/onboard     - Register and get the onboarding link
//! GET  /payouts/status          - Payout readiness
//!
//! # Webhooks
//! POST /webhooks/stripe         - Signed payment notifications
//! ```

pub mod auth;
pub mod checkout;
pub mod health;
pub mod payouts;
pub mod products;
pub mod purchases;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/mine", get(products::mine))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/{id}/buy", post(products::buy))
}

/// Create the purchase routes router.
pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(purchases::index))
        .route("/{id}", get(purchases::show))
}

/// Create the checkout return routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/success", get(checkout::success))
        .route("/cancel", get(checkout::cancel))
}

/// Create the payout routes router.
pub fn payout_routes() -> Router<AppState> {
    Router::new()
        .route("/onboard", get(payouts::onboard).post(payouts::onboard))
        .route("/status", get(payouts::status))
}

/// Create the webhook routes router.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/stripe", post(webhooks::stripe))
}

/// Create all routes for the marketplace.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/purchases", purchase_routes())
        .nest("/checkout", checkout_routes())
        .nest("/payouts", payout_routes())
        .nest("/webhooks", webhook_routes())
}
