//! Product listing route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

use marketplace_core::ProductId;

use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{Product, ProductInput};
use crate::services::{CheckoutError, CheckoutStarted, ProductDetail};
use crate::state::AppState;

/// Buy request body.
#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    /// Validated by the checkout service, so out-of-range values reach it.
    pub quantity: i64,
}

/// The requested quantity, treating an unreadable body as a bad quantity.
fn requested_quantity(
    body: std::result::Result<Json<BuyRequest>, JsonRejection>,
) -> std::result::Result<i64, CheckoutError> {
    body.map(|Json(request)| request.quantity).map_err(|e| {
        tracing::debug!(error = %e, "Unreadable buy request");
        CheckoutError::InvalidQuantity
    })
}

/// Listings from everyone except the caller.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().others(user.id).await?))
}

/// The caller's own listings.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().mine(user.id).await?))
}

/// Create a listing owned by the caller.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.catalog().create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// One listing, with whether the viewer may buy it.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    let viewer = user.map(|u| u.id);
    Ok(Json(state.catalog().detail(viewer, id).await?))
}

/// Replace the fields of one of the caller's listings.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().update(user.id, id, input).await?))
}

/// Delete one of the caller's listings.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state.catalog().delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reserve stock and open a hosted checkout for it.
///
/// The client redirects the buyer to `checkout_url`.
pub async fn buy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    body: std::result::Result<Json<BuyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutStarted>)> {
    let quantity = requested_quantity(body)?;
    let started = state
        .checkout()
        .initiate_checkout(user.id, id, quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}
