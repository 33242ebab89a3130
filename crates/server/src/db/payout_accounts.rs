//! Payout account repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marketplace_core::{PayoutAccountId, UserId};

use super::{PayoutAccountStore, RepositoryError, map_unique_violation};
use crate::models::PayoutAccount;

#[derive(Debug, sqlx::FromRow)]
struct PayoutAccountRow {
    user_id: i32,
    account_id: String,
    onboarding_complete: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PayoutAccountRow> for PayoutAccount {
    type Error = RepositoryError;

    fn try_from(r: PayoutAccountRow) -> Result<Self, Self::Error> {
        let account_id = PayoutAccountId::parse(&r.account_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("user {}: {e}", r.user_id))
        })?;

        Ok(Self {
            user_id: UserId::new(r.user_id),
            account_id,
            onboarding_complete: r.onboarding_complete,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Repository for the user to connected account mapping.
pub struct PayoutAccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PayoutAccountRepository<'a> {
    /// Create a new payout account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl PayoutAccountStore for PayoutAccountRepository<'_> {
    async fn get_by_user(&self, user: UserId) -> Result<Option<PayoutAccount>, RepositoryError> {
        let row = sqlx::query_as::<_, PayoutAccountRow>(
            r"
            SELECT user_id, account_id, onboarding_complete, created_at, updated_at
            FROM marketplace.payout_accounts
            WHERE user_id = $1
            ",
        )
        .bind(user.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(PayoutAccount::try_from).transpose()
    }

    async fn insert(
        &self,
        user: UserId,
        account_id: &PayoutAccountId,
    ) -> Result<PayoutAccount, RepositoryError> {
        let row = sqlx::query_as::<_, PayoutAccountRow>(
            r"
            INSERT INTO marketplace.payout_accounts (user_id, account_id)
            VALUES ($1, $2)
            RETURNING user_id, account_id, onboarding_complete, created_at, updated_at
            ",
        )
        .bind(user.as_i32())
        .bind(account_id.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "payout account"))?;

        PayoutAccount::try_from(row)
    }

    async fn set_onboarding_complete(
        &self,
        user: UserId,
        complete: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE marketplace.payout_accounts
            SET onboarding_complete = $2, updated_at = NOW()
            WHERE user_id = $1
            ",
        )
        .bind(user.as_i32())
        .bind(complete)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
