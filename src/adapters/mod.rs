//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum HTTP surface (webhook endpoint, health)
//! - `postgres` - sqlx-backed repositories
//! - `stripe` - Stripe API client
//! - `auth` - user directory backed by the auth service admin API
//! - `email` - Resend transactional email client
//! - `error_reporter` - tracing-backed error sink

pub mod auth;
pub mod email;
pub mod error_reporter;
pub mod http;
pub mod postgres;
pub mod stripe;
