//! Application handlers.

pub mod billing;

pub use billing::{
    Disposition, ReconcileReport, ResolutionPath, SideEffect, SideEffectOutcome,
    WebhookReconciler,
};
