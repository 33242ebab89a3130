//! Purchase history route handlers.

use axum::{
    Json,
    extract::{Path, State},
};

use marketplace_core::{PurchaseId, UserId};

use crate::db::{PurchaseLedger, PurchaseRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Purchase;
use crate::state::AppState;

/// The caller's purchases, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Purchase>>> {
    let purchases = PurchaseRepository::new(state.pool())
        .list_by_buyer(user.id)
        .await?;
    Ok(Json(purchases))
}

/// One of the caller's purchases.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PurchaseId>,
) -> Result<Json<Purchase>> {
    Ok(Json(buyer_purchase(&state, user.id, id).await?))
}

/// Load a purchase if `buyer` made it. Anyone else's purchase is not found.
pub(crate) async fn buyer_purchase(
    state: &AppState,
    buyer: UserId,
    id: PurchaseId,
) -> Result<Purchase> {
    PurchaseRepository::new(state.pool())
        .get_purchase(id)
        .await?
        .filter(|p| p.buyer_id == buyer)
        .ok_or_else(|| AppError::NotFound("purchase".to_string()))
}
