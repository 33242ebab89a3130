//! Marketplace Core - Shared domain types.
//!
//! This crate provides the types shared by every marketplace component:
//! - `server` - HTTP server hosting the catalog, checkout and webhook endpoints
//! - `cli` - Command-line tools for migrations and operational reports
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, email addresses, money and purchase status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
