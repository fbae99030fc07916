//! Billing handlers.

mod reconcile_webhook;

pub use reconcile_webhook::{
    Disposition, ReconcileReport, ResolutionPath, SideEffect, SideEffectOutcome,
    WebhookReconciler,
};
