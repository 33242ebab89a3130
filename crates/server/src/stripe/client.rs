//! Stripe REST API client.
//!
//! Requests are form-encoded and authenticated with the platform secret key.
//! Checkout sessions are created on the seller's connected account via the
//! `Stripe-Account` header.

use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use marketplace_core::{Email, PayoutAccountId};

use super::error::StripeError;
use super::types::{Account, AccountLink, CheckoutSession, ErrorResponse};
use crate::config::StripeConfig;
use crate::services::provider::{
    AccountStatus, CheckoutSessionProvider, CheckoutSessionRequest, CreatedSession,
    PayoutAccountProvider, ProviderError,
};

/// Stripe API client for connected accounts and checkout sessions.
#[derive(Clone)]
pub struct StripeClient {
    /// HTTP client with the configured request timeout.
    client: Client,
    /// API base, `https://api.stripe.com` unless overridden.
    api_base: Url,
    /// Platform secret key.
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base.as_str())
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Config` if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StripeError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StripeError> {
        self.api_base
            .join(path)
            .map_err(|e| StripeError::Config(format!("invalid endpoint {path}: {e}")))
    }

    /// Send an authenticated request and decode the JSON response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StripeError> {
        let response = request
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: Option<ErrorResponse> = response.json().await.ok();
            let (kind, message) = body.map_or((None, None), |b| (b.error.kind, b.error.message));
            error!(
                status = status.as_u16(),
                error_type = ?kind,
                "Stripe API error"
            );
            return Err(StripeError::Api {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| status.to_string()),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StripeError::Response(e.to_string()))
    }

    /// Create a standard connected account.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Stripe returns an error.
    #[instrument(skip(self, email))]
    pub async fn create_connected_account(
        &self,
        email: &str,
        country: &str,
    ) -> Result<Account, StripeError> {
        let params = [("type", "standard"), ("country", country), ("email", email)];
        let request = self.client.post(self.endpoint("/v1/accounts")?).form(&params);

        let account: Account = self.send(request).await?;
        debug!(account_id = %account.id, "Created Stripe account");
        Ok(account)
    }

    /// Retrieve a connected account.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Stripe returns an error.
    #[instrument(skip(self))]
    pub async fn retrieve_account(&self, account_id: &str) -> Result<Account, StripeError> {
        let request = self
            .client
            .get(self.endpoint(&format!("/v1/accounts/{account_id}"))?);
        self.send(request).await
    }

    /// Create an onboarding link for a connected account.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Stripe returns an error.
    #[instrument(skip(self, refresh_url, return_url))]
    pub async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink, StripeError> {
        let params = [
            ("account", account_id),
            ("refresh_url", refresh_url),
            ("return_url", return_url),
            ("type", "account_onboarding"),
        ];
        let request = self
            .client
            .post(self.endpoint("/v1/account_links")?)
            .form(&params);
        self.send(request).await
    }

    /// Create a one-line-item payment session on a connected account.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Stripe returns an error.
    #[instrument(skip(self, request), fields(purchase_id = %request.purchase_id))]
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let purchase_id = request.purchase_id.to_string();
        let mut params: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            (
                "line_items[0][price_data][currency]",
                request.currency.code().to_ascii_lowercase(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                request.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.product_name.clone(),
            ),
            ("line_items[0][quantity]", request.quantity.to_string()),
            ("metadata[purchase_id]", purchase_id.clone()),
            ("client_reference_id", purchase_id),
            ("success_url", request.success_url.to_string()),
            ("cancel_url", request.cancel_url.to_string()),
        ];
        // Stripe rejects an empty description
        if !request.product_description.is_empty() {
            params.push((
                "line_items[0][price_data][product_data][description]",
                request.product_description.clone(),
            ));
        }

        let http_request = self
            .client
            .post(self.endpoint("/v1/checkout/sessions")?)
            .header("Stripe-Account", request.account.as_str())
            .form(&params);

        let session: CheckoutSession = self.send(http_request).await?;
        debug!(session_id = %session.id, "Created Stripe checkout session");
        Ok(session)
    }
}

fn parse_url(raw: &str) -> Result<Url, ProviderError> {
    Url::parse(raw).map_err(|e| ProviderError::InvalidResponse(format!("invalid url: {e}")))
}

impl PayoutAccountProvider for StripeClient {
    async fn create_account(
        &self,
        email: &Email,
        country: &str,
    ) -> Result<PayoutAccountId, ProviderError> {
        let account = self.create_connected_account(email.as_str(), country).await?;
        PayoutAccountId::parse(&account.id)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn get_account(&self, account: &PayoutAccountId) -> Result<AccountStatus, ProviderError> {
        let account = self.retrieve_account(account.as_str()).await?;
        Ok(AccountStatus {
            charges_enabled: account.charges_enabled,
            details_submitted: account.details_submitted,
        })
    }

    async fn create_onboarding_link(
        &self,
        account: &PayoutAccountId,
        refresh_url: &Url,
        return_url: &Url,
    ) -> Result<Url, ProviderError> {
        let link = self
            .create_account_link(account.as_str(), refresh_url.as_str(), return_url.as_str())
            .await?;
        parse_url(&link.url)
    }
}

impl CheckoutSessionProvider for StripeClient {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CreatedSession, ProviderError> {
        let session = self.create_checkout_session(request).await?;
        let url = session.url.ok_or_else(|| {
            ProviderError::InvalidResponse(format!("session {} has no url", session.id))
        })?;

        Ok(CreatedSession {
            redirect_url: parse_url(&url)?,
            id: session.id,
        })
    }
}
