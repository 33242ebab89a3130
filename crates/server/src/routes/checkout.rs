//! Return pages for the hosted checkout.
//!
//! These only report state. Completion is recorded by the payment webhook,
//! so a buyer landing on the success page may still see a pending purchase.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use marketplace_core::PurchaseId;

use super::purchases::buyer_purchase;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Purchase;
use crate::state::AppState;

/// Query string appended to the checkout return URLs.
#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    pub purchase_id: PurchaseId,
}

/// Return page body.
#[derive(Debug, Serialize)]
pub struct ReturnPage {
    pub message: &'static str,
    pub purchase: Purchase,
}

/// Buyer returned after paying.
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ReturnQuery>,
) -> Result<Json<ReturnPage>> {
    let purchase = buyer_purchase(&state, user.id, query.purchase_id).await?;
    let message = if purchase.is_completed() {
        "Payment received. Thank you for your purchase."
    } else {
        "Payment submitted. Your purchase will be confirmed shortly."
    };

    Ok(Json(ReturnPage { message, purchase }))
}

/// Buyer left the hosted checkout without paying.
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ReturnQuery>,
) -> Result<Json<ReturnPage>> {
    let purchase = buyer_purchase(&state, user.id, query.purchase_id).await?;
    tracing::info!(purchase_id = %purchase.id, "Checkout cancelled by buyer");

    Ok(Json(ReturnPage {
        message: "Checkout cancelled. You have not been charged.",
        purchase,
    }))
}
