//! HTTP adapters built on Axum.

pub mod billing;

pub use billing::{billing_router, BillingAppState};
