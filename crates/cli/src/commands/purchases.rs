//! Purchase reconciliation commands.
//!
//! ```bash
//! # Pending purchases older than an hour
//! mp-cli purchases stale
//!
//! # Pending purchases older than a day
//! mp-cli purchases stale --older-than-minutes 1440
//! ```
//!
//! A purchase stays pending when the buyer abandons the hosted checkout or
//! when the checkout session could not be created after stock was reserved.
//! Both hold inventory until someone looks at them.

use chrono::{Duration, Utc};

use marketplace_server::db::{PurchaseRepository, create_pool};

use super::{CommandError, database_url};

/// Log every pending purchase created more than `older_than_minutes` ago.
///
/// Returns how many were found.
pub async fn stale(older_than_minutes: i64) -> Result<usize, CommandError> {
    if older_than_minutes < 0 {
        return Err(CommandError::InvalidArgument(
            "--older-than-minutes must not be negative".to_string(),
        ));
    }

    let cutoff = Duration::try_minutes(older_than_minutes)
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .ok_or_else(|| {
            CommandError::InvalidArgument("--older-than-minutes is too large".to_string())
        })?;

    let pool = create_pool(&database_url()?).await?;
    let purchases = PurchaseRepository::new(&pool)
        .list_stale_pending(cutoff)
        .await?;

    for purchase in &purchases {
        tracing::info!(
            purchase_id = %purchase.id,
            buyer_id = %purchase.buyer_id,
            product = %purchase.product_name,
            quantity = purchase.quantity,
            amount = %purchase.unit_price,
            created_at = %purchase.created_at,
            "Stale pending purchase"
        );
    }

    tracing::info!(
        count = purchases.len(),
        older_than_minutes,
        "Stale pending purchase report complete"
    );
    Ok(purchases.len())
}
