//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the response is built; clients only ever see a
//! short JSON message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::{AccountError, CatalogError, CheckoutError};

/// Application-level error type for the marketplace server.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Payout account error: {0}")]
    Account(#[from] AccountError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::InvalidUsername(_)
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Catalog(err) => match err {
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogError::NotFound => StatusCode::NOT_FOUND,
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CheckoutError::SelfPurchaseNotAllowed => StatusCode::FORBIDDEN,
                CheckoutError::ProductNotFound => StatusCode::NOT_FOUND,
                CheckoutError::SellerNotPayable | CheckoutError::InsufficientInventory { .. } => {
                    StatusCode::CONFLICT
                }
                CheckoutError::ExternalService(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::Price(_) | CheckoutError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Account(err) => match err {
                AccountError::ExternalService(_) => StatusCode::BAD_GATEWAY,
                AccountError::NotRegistered => StatusCode::NOT_FOUND,
                AccountError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    // Don't expose internal error details to clients
    fn public_message(&self, status: StatusCode) -> String {
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return "Internal server error".to_string();
        }
        if status == StatusCode::BAD_GATEWAY {
            return "Payment processor unavailable, please try again".to_string();
        }

        match self {
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this username or email already exists".to_string()
            }
            Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
            Self::Auth(AuthError::WeakPassword(msg) | AuthError::InvalidUsername(msg)) => {
                msg.clone()
            }
            Self::Catalog(err) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Account(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let message = self.public_message(status);
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationError;
    use crate::services::provider::ProviderError;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("purchase".to_string());
        assert_eq!(err.to_string(), "Not found: purchase");
    }

    #[test]
    fn test_checkout_error_status_codes() {
        assert_eq!(status(CheckoutError::InvalidQuantity), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(CheckoutError::SelfPurchaseNotAllowed),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status(CheckoutError::ProductNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(CheckoutError::SellerNotPayable), StatusCode::CONFLICT);
        assert_eq!(
            status(CheckoutError::InsufficientInventory {
                requested: 3,
                available: 2
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(CheckoutError::ExternalService(ProviderError::Unavailable(
                "down".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(CheckoutError::Repository(RepositoryError::DataCorruption(
                "bad row".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_other_error_status_codes() {
        assert_eq!(
            status(CatalogError::Validation(ValidationError::EmptyName)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(CatalogError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(AuthError::UserAlreadyExists), StatusCode::CONFLICT);
        assert_eq!(status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AccountError::NotRegistered), StatusCode::NOT_FOUND);
        assert_eq!(
            status(CatalogError::Validation(ValidationError::PriceTooLarge)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(AppError::NotFound("purchase".to_string())),
            StatusCode::NOT_FOUND
        );
    }
}
