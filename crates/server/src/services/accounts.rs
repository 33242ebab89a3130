//! Seller payout accounts.
//!
//! Maps users to connected accounts at the payment processor and answers
//! whether a seller can be paid. A failed processor call is always an error;
//! it never reads as "no account".

use thiserror::Error;
use tracing::instrument;
use url::Url;

use marketplace_core::{Email, PayoutAccountId, UserId};

use super::app_url;
use super::provider::{PayoutAccountProvider, ProviderError};
use crate::db::{PayoutAccountStore, RepositoryError};
use crate::models::{PayoutAccount, PayoutStatus};

/// Errors from payout account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The processor call failed or timed out.
    #[error("payment processor error: {0}")]
    ExternalService(#[from] ProviderError),

    /// The user has no payout account yet.
    #[error("no payout account registered")]
    NotRegistered,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Payout account directory.
pub struct AccountDirectory<'a, S, P> {
    store: S,
    provider: &'a P,
    country: &'a str,
    base_url: &'a Url,
}

impl<'a, S, P> AccountDirectory<'a, S, P>
where
    S: PayoutAccountStore,
    P: PayoutAccountProvider,
{
    #[must_use]
    pub const fn new(store: S, provider: &'a P, country: &'a str, base_url: &'a Url) -> Self {
        Self {
            store,
            provider,
            country,
            base_url,
        }
    }

    /// The user's connected account, if any.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Repository` if the lookup fails.
    pub async fn payout_account_id(
        &self,
        user: UserId,
    ) -> Result<Option<PayoutAccountId>, AccountError> {
        Ok(self.store.get_by_user(user).await?.map(|a| a.account_id))
    }

    /// Create a connected account for `user` unless one already exists.
    ///
    /// Returns the existing account unchanged when there is one. No local
    /// record is written if the processor call fails.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::ExternalService` if the processor call fails.
    #[instrument(skip(self, email), fields(user_id = %user))]
    pub async fn register_payout_account(
        &self,
        user: UserId,
        email: &Email,
    ) -> Result<PayoutAccount, AccountError> {
        if let Some(existing) = self.store.get_by_user(user).await? {
            return Ok(existing);
        }

        let account_id = self.provider.create_account(email, self.country).await?;

        match self.store.insert(user, &account_id).await {
            Ok(account) => {
                tracing::info!(account_id = %account.account_id, "Registered payout account");
                Ok(account)
            }
            Err(RepositoryError::Conflict(_)) => {
                // A concurrent registration won; keep its mapping.
                tracing::warn!(
                    orphaned_account_id = %account_id,
                    "Payout account registered concurrently; new account left unused"
                );
                self.store
                    .get_by_user(user)
                    .await?
                    .ok_or(AccountError::Repository(RepositoryError::NotFound))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ask the processor whether onboarding is done and cache the answer.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::ExternalService` if the processor call fails.
    #[instrument(skip(self, account), fields(account_id = %account.account_id))]
    pub async fn is_onboarding_complete(
        &self,
        account: &PayoutAccount,
    ) -> Result<bool, AccountError> {
        let status = self.provider.get_account(&account.account_id).await?;
        let complete = status.onboarding_complete();

        if complete != account.onboarding_complete {
            self.store
                .set_onboarding_complete(account.user_id, complete)
                .await?;
        }

        Ok(complete)
    }

    /// Whether `user` can receive payouts.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::ExternalService` if the status check fails.
    pub async fn payout_status(&self, user: UserId) -> Result<PayoutStatus, AccountError> {
        let Some(account) = self.store.get_by_user(user).await? else {
            return Ok(PayoutStatus::NotRegistered);
        };

        if self.is_onboarding_complete(&account).await? {
            Ok(PayoutStatus::Ready(account.account_id))
        } else {
            Ok(PayoutStatus::OnboardingIncomplete(account.account_id))
        }
    }

    /// One-time link to the processor's onboarding flow.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotRegistered` if the user has no account and
    /// `AccountError::ExternalService` if the processor call fails.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn onboarding_link(&self, user: UserId) -> Result<Url, AccountError> {
        let account = self
            .store
            .get_by_user(user)
            .await?
            .ok_or(AccountError::NotRegistered)?;

        let refresh_url = app_url(self.base_url, "/payouts/onboard");
        let return_url = app_url(self.base_url, "/payouts/status");

        Ok(self
            .provider
            .create_onboarding_link(&account.account_id, &refresh_url, &return_url)
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{FakeProvider, MemoryStore};

    fn base_url() -> Url {
        Url::parse("https://market.test").unwrap()
    }

    fn email() -> Email {
        Email::parse("seller@market.test").unwrap()
    }

    #[tokio::test]
    async fn test_register_creates_one_account() {
        let store = MemoryStore::new();
        let provider = FakeProvider::new();
        let base = base_url();
        let directory = AccountDirectory::new(store.clone(), &provider, "BG", &base);
        let user = UserId::new(1);

        let first = directory.register_payout_account(user, &email()).await.unwrap();
        let second = directory.register_payout_account(user, &email()).await.unwrap();

        assert_eq!(first.account_id, second.account_id);
        assert_eq!(provider.accounts_created(), 1);
        assert_eq!(
            directory.payout_account_id(user).await.unwrap(),
            Some(first.account_id)
        );
    }

    #[tokio::test]
    async fn test_register_failure_writes_nothing() {
        let store = MemoryStore::new();
        let provider = FakeProvider::new();
        provider.set_failing(true);
        let base = base_url();
        let directory = AccountDirectory::new(store.clone(), &provider, "BG", &base);

        let result = directory.register_payout_account(UserId::new(1), &email()).await;

        assert!(matches!(result, Err(AccountError::ExternalService(_))));
        assert!(store.account(UserId::new(1)).is_none());
    }

    #[tokio::test]
    async fn test_payout_status_transitions() {
        let store = MemoryStore::new();
        let provider = FakeProvider::new();
        let base = base_url();
        let directory = AccountDirectory::new(store.clone(), &provider, "BG", &base);
        let user = UserId::new(7);

        assert_eq!(
            directory.payout_status(user).await.unwrap(),
            PayoutStatus::NotRegistered
        );

        let account = directory.register_payout_account(user, &email()).await.unwrap();
        assert_eq!(
            directory.payout_status(user).await.unwrap(),
            PayoutStatus::OnboardingIncomplete(account.account_id.clone())
        );

        provider.complete_onboarding(&account.account_id);
        assert_eq!(
            directory.payout_status(user).await.unwrap(),
            PayoutStatus::Ready(account.account_id)
        );
        assert!(store.account(user).unwrap().onboarding_complete);
    }

    #[tokio::test]
    async fn test_payout_status_failure_is_not_not_registered() {
        let store = MemoryStore::new();
        store.seed_account(UserId::new(3), "acct_existing", true);
        let provider = FakeProvider::new();
        provider.set_failing(true);
        let base = base_url();
        let directory = AccountDirectory::new(store, &provider, "BG", &base);

        let result = directory.payout_status(UserId::new(3)).await;

        assert!(matches!(result, Err(AccountError::ExternalService(_))));
    }

    #[tokio::test]
    async fn test_onboarding_link_requires_account() {
        let store = MemoryStore::new();
        let provider = FakeProvider::new();
        let base = base_url();
        let directory = AccountDirectory::new(store, &provider, "BG", &base);

        assert!(matches!(
            directory.onboarding_link(UserId::new(1)).await,
            Err(AccountError::NotRegistered)
        ));

        directory
            .register_payout_account(UserId::new(1), &email())
            .await
            .unwrap();
        let link = directory.onboarding_link(UserId::new(1)).await.unwrap();
        assert_eq!(link.as_str(), "https://connect.fake/setup/acct_fake1");
    }
}
