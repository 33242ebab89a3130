//! Seller payout onboarding route handlers.

use axum::{Json, extract::State};
use serde::Serialize;
use url::Url;

use marketplace_core::PayoutAccountId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::PayoutStatus;
use crate::state::AppState;

/// Onboarding response.
#[derive(Debug, Serialize)]
pub struct OnboardResponse {
    pub status: &'static str,
    pub account_id: PayoutAccountId,
    /// Present while onboarding is incomplete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_url: Option<Url>,
}

/// Register a payout account if needed and hand back the onboarding link.
///
/// Safe to call repeatedly: an existing account is reused and a fresh
/// single-use link is issued each time onboarding is still incomplete.
pub async fn onboard(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OnboardResponse>> {
    let accounts = state.accounts();
    let account = accounts
        .register_payout_account(user.id, &user.email)
        .await?;

    if accounts.is_onboarding_complete(&account).await? {
        return Ok(Json(OnboardResponse {
            status: "ready",
            account_id: account.account_id,
            onboarding_url: None,
        }));
    }

    let link = accounts.onboarding_link(user.id).await?;
    Ok(Json(OnboardResponse {
        status: "onboarding_incomplete",
        account_id: account.account_id,
        onboarding_url: Some(link),
    }))
}

/// Whether the caller can receive payouts.
pub async fn status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<PayoutStatus>> {
    Ok(Json(state.accounts().payout_status(user.id).await?))
}
