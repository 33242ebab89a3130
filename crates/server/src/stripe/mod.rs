//! Stripe integration for seller payouts and hosted checkout.
//!
//! This module provides:
//! - [`StripeClient`], implementing the payout account and checkout session
//!   provider traits against the Stripe REST API
//! - [`WebhookVerifier`] for `Stripe-Signature` header verification
//! - Event types for webhook deliveries
//!
//! # Flow
//!
//! 1. A seller registers; a standard connected account is created for them
//! 2. The seller finishes onboarding through an account link
//! 3. A buyer checks out; a session is created on the seller's account
//! 4. Stripe delivers `checkout.session.completed` to `/webhooks/stripe`
//! 5. The purchase named in the session metadata is marked completed

mod client;
mod error;
mod types;
mod webhook;

pub use client::StripeClient;
pub use error::StripeError;
pub use types::{Account, AccountLink, CheckoutSession};
pub use webhook::{
    CHECKOUT_SESSION_COMPLETED, CheckoutSessionObject, Event, SIGNATURE_HEADER, SignatureError,
    WebhookVerifier,
};
