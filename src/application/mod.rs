//! Application layer - command handlers.
//!
//! Orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    Disposition, ReconcileReport, ResolutionPath, SideEffect, SideEffectOutcome,
    WebhookReconciler,
};
