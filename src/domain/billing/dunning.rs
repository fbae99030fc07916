//! Dunning tracking: per-invoice payment-failure escalation state.
//!
//! State machine per invoice:
//! `none -> tracked(emails_sent=0) -> tracked(1) -> ... -> resolved`.
//! The counter gates each escalation stage to fire at most once per invoice
//! regardless of webhook redelivery; resolution is terminal.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// Escalation stages of the dunning sequence.
///
/// Only the first stage is sent today; the counter exists so additional
/// stages can be added without re-architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationStage {
    /// Immediate notice with the hosted payment URL.
    InitialNotice,
}

impl EscalationStage {
    /// One-based stage number, matching the `emails_sent` value after it fires.
    pub fn number(&self) -> u32 {
        match self {
            EscalationStage::InitialNotice => 1,
        }
    }

    /// The stage that should fire when `emails_sent` stands at the given count.
    pub fn next_after(emails_sent: u32) -> Option<Self> {
        match emails_sent {
            0 => Some(EscalationStage::InitialNotice),
            _ => None,
        }
    }
}

/// Tracking record for one failed invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DunningRecord {
    /// Provider invoice id - unique idempotency key.
    pub stripe_invoice_id: String,

    /// Parent subscription id (cancellation resolves by this key).
    pub stripe_subscription_id: Option<String>,

    /// Provider customer id.
    pub stripe_customer_id: String,

    /// Local user the invoice belongs to.
    pub user_id: UserId,

    /// Amount due in pence, snapshot at failure time.
    pub amount_due: i64,

    /// Hosted payment page URL, snapshot at failure time.
    pub hosted_invoice_url: Option<String>,

    /// Escalation emails sent so far. Never decreases.
    pub emails_sent: u32,

    /// Terminal flag: payment recovered or subscription cancelled.
    pub resolved: bool,

    /// When the record was resolved.
    pub resolved_at: Option<Timestamp>,

    /// When the failure was first seen.
    pub created_at: Timestamp,
}

impl DunningRecord {
    /// Creates a fresh record for a newly-failed invoice.
    pub fn new(
        stripe_invoice_id: impl Into<String>,
        stripe_subscription_id: Option<String>,
        stripe_customer_id: impl Into<String>,
        user_id: UserId,
        amount_due: i64,
        hosted_invoice_url: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            stripe_invoice_id: stripe_invoice_id.into(),
            stripe_subscription_id,
            stripe_customer_id: stripe_customer_id.into(),
            user_id,
            amount_due,
            hosted_invoice_url,
            emails_sent: 0,
            resolved: false,
            resolved_at: None,
            created_at: now,
        }
    }

    /// The next escalation stage due, if any.
    ///
    /// Resolved records never escalate again.
    pub fn next_stage(&self) -> Option<EscalationStage> {
        if self.resolved {
            return None;
        }
        EscalationStage::next_after(self.emails_sent)
    }

    /// Records that an escalation email went out.
    pub fn record_email_sent(&mut self) {
        self.emails_sent += 1;
    }

    /// Marks the record resolved. Idempotent: the first resolution wins.
    pub fn resolve(&mut self, at: Timestamp) {
        if !self.resolved {
            self.resolved = true;
            self.resolved_at = Some(at);
        }
    }
}
