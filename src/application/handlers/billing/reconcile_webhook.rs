//! WebhookReconciler - command handler for Stripe webhook deliveries.
//!
//! Projects provider subscription state onto local entitlement, tracks
//! payment failures for dunning, and fires best-effort side effects
//! (emails, in-app notifications).
//!
//! ## Error policy
//!
//! The provider retries on any non-2xx answer, so errors split three ways:
//!
//! - Signature failures downgrade the delivery to unverified processing
//!   and are logged, never returned.
//! - Expected anomalies (no local user matches the customer, a side effect
//!   fails) are acknowledged with a report to the error sink; retrying the
//!   delivery would not change the outcome.
//! - Unexpected failures (unparseable payload, dunning store unavailable)
//!   escape as errors so the provider redelivers. Every handler is
//!   idempotent, so redelivery is always safe.

use std::sync::Arc;

use crate::domain::billing::{
    DunningRecord, Entitlement, EntitlementUpdate, InvoiceObject, Notification, NotificationKind,
    PriceCatalog, ProviderStatus, StripeEvent, StripeEventType, StripeWebhookVerifier,
    SubscriptionObject, Tier, WebhookError,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{
    DunningRepository, EmailSender, ErrorContext, ErrorReporter, NotificationStore,
    PaymentProvider, SaveResult, SubscriberProfileRepository, UserDirectory,
};

/// How a customer was matched to a local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPath {
    /// `metadata.user_id` on the subscription object.
    MetadataHint,
    /// Stored customer mapping on a subscriber profile.
    StoredMapping,
    /// Provider customer email matched against the user directory.
    EmailBridge,
}

/// A best-effort side effect and whether it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideEffectOutcome {
    pub effect: SideEffect,
    pub succeeded: bool,
}

/// Side effects the reconciler attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    EntitlementWrite,
    WelcomeEmail,
    WelcomeNotification,
    StatusChangeNotification,
    PaymentFailedEmail,
    PaymentFailedNotification,
    PaymentRecoveredNotification,
}

/// What the reconciler did with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Entitlement projection applied for a resolved user.
    Applied {
        user_id: UserId,
        entitlement_written: bool,
    },
    /// Payment failure tracked (or already tracked) for an invoice.
    DunningTracked {
        invoice_id: String,
        email_sent: bool,
    },
    /// Invoice paid; any tracking for it is now resolved.
    DunningResolved {
        invoice_id: String,
        was_tracked: bool,
    },
    /// No local user matched the provider customer. Acknowledged and
    /// reported out of band.
    NoUserFound { customer_id: String },
    /// Event type the reconciler does not handle.
    Ignored,
}

/// Outcome report for one webhook delivery.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// Stripe event type string, echoed in the acknowledgement.
    pub event_type: String,
    /// Whether the delivery carried a valid signature.
    pub verified: bool,
    pub disposition: Disposition,
    pub side_effects: Vec<SideEffectOutcome>,
}

impl ReconcileReport {
    fn new(event_type: impl Into<String>, verified: bool) -> Self {
        Self {
            event_type: event_type.into(),
            verified,
            disposition: Disposition::Ignored,
            side_effects: Vec::new(),
        }
    }

    fn record(&mut self, effect: SideEffect, succeeded: bool) {
        self.side_effects.push(SideEffectOutcome { effect, succeeded });
    }
}

/// Handler for Stripe webhook deliveries.
pub struct WebhookReconciler {
    profiles: Arc<dyn SubscriberProfileRepository>,
    dunning: Arc<dyn DunningRepository>,
    provider: Arc<dyn PaymentProvider>,
    directory: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationStore>,
    emails: Arc<dyn EmailSender>,
    error_reporter: Arc<dyn ErrorReporter>,
    catalog: PriceCatalog,
    verifier: Option<StripeWebhookVerifier>,
}

impl WebhookReconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiles: Arc<dyn SubscriberProfileRepository>,
        dunning: Arc<dyn DunningRepository>,
        provider: Arc<dyn PaymentProvider>,
        directory: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationStore>,
        emails: Arc<dyn EmailSender>,
        error_reporter: Arc<dyn ErrorReporter>,
        catalog: PriceCatalog,
        verifier: Option<StripeWebhookVerifier>,
    ) -> Self {
        Self {
            profiles,
            dunning,
            provider,
            directory,
            notifications,
            emails,
            error_reporter,
            catalog,
            verifier,
        }
    }

    /// Processes one webhook delivery.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures the provider should retry:
    /// unparseable payloads and dunning store failures. Signature failures
    /// and expected anomalies are absorbed into the report.
    pub async fn reconcile(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<ReconcileReport, WebhookError> {
        let verified = self.verify_signature(payload, signature);

        let event = StripeEvent::parse(payload)?;
        let event_type = event.parsed_type();

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            verified,
            "processing webhook event"
        );

        let mut report = ReconcileReport::new(&event.event_type, verified);

        match event_type {
            StripeEventType::SubscriptionCreated | StripeEventType::SubscriptionUpdated => {
                let subscription: SubscriptionObject = event.deserialize_object()?;
                let is_creation = event_type == StripeEventType::SubscriptionCreated;
                self.apply_subscription(&event, &subscription, is_creation, &mut report)
                    .await?;
            }
            StripeEventType::SubscriptionDeleted => {
                let subscription: SubscriptionObject = event.deserialize_object()?;
                self.apply_subscription_deleted(&event, &subscription, &mut report)
                    .await?;
            }
            StripeEventType::InvoicePaymentFailed => {
                let invoice: InvoiceObject = event.deserialize_object()?;
                self.track_payment_failure(&event, &invoice, &mut report)
                    .await?;
            }
            StripeEventType::InvoicePaid => {
                let invoice: InvoiceObject = event.deserialize_object()?;
                self.resolve_payment(&invoice, &mut report).await?;
            }
            StripeEventType::Unknown => {
                tracing::debug!(event_type = %event.event_type, "ignoring unhandled event type");
                report.disposition = Disposition::Ignored;
            }
        }

        Ok(report)
    }

    /// Checks the delivery signature, downgrading to unverified processing
    /// on any failure. A forged `subscription.deleted` can at worst revoke
    /// entitlement that the next genuine event restores.
    fn verify_signature(&self, payload: &[u8], signature: Option<&str>) -> bool {
        let Some(verifier) = &self.verifier else {
            tracing::warn!("no webhook secret configured, processing unverified");
            return false;
        };
        let Some(signature) = signature else {
            tracing::warn!("missing signature header, processing unverified");
            return false;
        };
        match verifier.verify(payload, signature) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "signature verification failed, processing unverified");
                false
            }
        }
    }

    /// Resolves the local user for a provider customer.
    ///
    /// Three tiers, cheapest first: metadata hint, stored mapping, email
    /// bridge. A repository failure in one tier logs and falls through to
    /// the next. Hint and email resolutions backfill the stored mapping so
    /// later events converge on the cheap tier.
    async fn resolve_user(
        &self,
        customer_id: &str,
        hint: Option<&str>,
    ) -> Result<Option<(UserId, ResolutionPath)>, WebhookError> {
        if let Some(hint) = hint {
            match UserId::new(hint) {
                Ok(user_id) => {
                    self.backfill_mapping(&user_id, customer_id).await;
                    return Ok(Some((user_id, ResolutionPath::MetadataHint)));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "invalid user id hint in subscription metadata");
                }
            }
        }

        match self.profiles.find_user_by_customer_id(customer_id).await {
            Ok(Some(user_id)) => return Ok(Some((user_id, ResolutionPath::StoredMapping))),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, customer_id, "stored mapping lookup failed");
            }
        }

        let customer = self
            .provider
            .get_customer(customer_id)
            .await
            .map_err(|e| WebhookError::Provider(e.to_string()))?;

        let Some(email) = customer.and_then(|c| c.email) else {
            return Ok(None);
        };

        match self.directory.find_user_by_email(&email).await {
            Ok(Some(user_id)) => {
                self.backfill_mapping(&user_id, customer_id).await;
                Ok(Some((user_id, ResolutionPath::EmailBridge)))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                tracing::warn!(error = %err, "directory lookup failed");
                Ok(None)
            }
        }
    }

    /// Stores the customer mapping. Best-effort: a failure only costs the
    /// next event a trip through the slower tiers.
    async fn backfill_mapping(&self, user_id: &UserId, customer_id: &str) {
        if let Err(err) = self.profiles.backfill_customer_id(user_id, customer_id).await {
            tracing::warn!(error = %err, %user_id, customer_id, "customer mapping backfill failed");
        }
    }

    async fn report_no_user(&self, event: &StripeEvent, customer_id: &str) {
        tracing::warn!(
            event_id = %event.id,
            customer_id,
            "no local user matched provider customer"
        );
        let context = ErrorContext::new(
            "user_resolution_failed",
            format!("no local user for customer {customer_id}"),
        )
        .with_event_id(&event.id)
        .with_customer_id(customer_id);
        self.error_reporter.report(&context).await;
    }

    /// Handles `customer.subscription.created` / `.updated`.
    ///
    /// Welcome effects only fire for the creation event: an update is never
    /// a first activation, even when it is the first delivery we see for
    /// the user.
    async fn apply_subscription(
        &self,
        event: &StripeEvent,
        subscription: &SubscriptionObject,
        is_creation: bool,
        report: &mut ReconcileReport,
    ) -> Result<(), WebhookError> {
        let resolved = self
            .resolve_user(&subscription.customer, subscription.user_id_hint())
            .await?;
        let Some((user_id, path)) = resolved else {
            self.report_no_user(event, &subscription.customer).await;
            report.disposition = Disposition::NoUserFound {
                customer_id: subscription.customer.clone(),
            };
            return Ok(());
        };

        tracing::debug!(%user_id, ?path, "resolved subscription owner");

        let status = ProviderStatus::from_str(&subscription.status);
        let price_id = subscription.primary_price_id();
        let tier = self.catalog.resolve(price_id);
        if tier == Tier::Unknown {
            tracing::warn!(
                price_id = price_id.unwrap_or("<none>"),
                catalog_version = self.catalog.version(),
                "price id not in catalog, granting entitlement without a tier"
            );
        }

        let period_start = Timestamp::from_unix_secs(subscription.current_period_start);
        let period_end = Timestamp::from_unix_secs(subscription.current_period_end);
        let entitlement = Entitlement::project(status, tier, period_end);
        let update = EntitlementUpdate {
            entitlement,
            period_start: Some(period_start),
            period_end: Some(period_end),
        };

        let written = self.write_entitlement(&user_id, &subscription.customer, &update).await;
        report.record(SideEffect::EntitlementWrite, written);

        if is_creation && entitlement.is_subscribed() {
            self.fire_welcome_effects(&user_id, &subscription.customer, tier, report)
                .await;
        }

        if let Some(previous) = event.previous_status() {
            if previous != subscription.status {
                self.notify_status_change(&user_id, previous, &subscription.status, report)
                    .await;
            }
        }

        report.disposition = Disposition::Applied {
            user_id,
            entitlement_written: written,
        };
        Ok(())
    }

    /// Handles `customer.subscription.deleted`.
    ///
    /// Dunning is resolved by subscription id before user resolution so a
    /// cancelled subscription stops escalating even when no local user can
    /// be matched any more.
    async fn apply_subscription_deleted(
        &self,
        event: &StripeEvent,
        subscription: &SubscriptionObject,
        report: &mut ReconcileReport,
    ) -> Result<(), WebhookError> {
        let now = Timestamp::now();
        match self
            .dunning
            .resolve_by_subscription_id(&subscription.id, now)
            .await
        {
            Ok(resolved) if resolved > 0 => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    resolved,
                    "resolved dunning records for cancelled subscription"
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "dunning resolution on cancellation failed");
                let context = ErrorContext::new(
                    "dunning_resolution_failed",
                    format!(
                        "resolving dunning for subscription {} failed: {err}",
                        subscription.id
                    ),
                )
                .with_event_id(&event.id);
                self.error_reporter.report(&context).await;
            }
        }

        let resolved = self
            .resolve_user(&subscription.customer, subscription.user_id_hint())
            .await?;
        let Some((user_id, _)) = resolved else {
            self.report_no_user(event, &subscription.customer).await;
            report.disposition = Disposition::NoUserFound {
                customer_id: subscription.customer.clone(),
            };
            return Ok(());
        };

        let update = EntitlementUpdate {
            entitlement: Entitlement::Inactive,
            period_start: None,
            period_end: None,
        };
        let written = self.write_entitlement(&user_id, &subscription.customer, &update).await;
        report.record(SideEffect::EntitlementWrite, written);

        // A deletion payload usually already carries status "canceled";
        // only an actual transition is worth telling the user about.
        if subscription.status != "canceled" {
            self.notify_status_change(&user_id, &subscription.status, "canceled", report)
                .await;
        }

        report.disposition = Disposition::Applied {
            user_id,
            entitlement_written: written,
        };
        Ok(())
    }

    /// Handles `invoice.payment_failed`.
    async fn track_payment_failure(
        &self,
        event: &StripeEvent,
        invoice: &InvoiceObject,
        report: &mut ReconcileReport,
    ) -> Result<(), WebhookError> {
        let resolved = self.resolve_user(&invoice.customer, None).await?;
        let Some((user_id, _)) = resolved else {
            self.report_no_user(event, &invoice.customer).await;
            report.disposition = Disposition::NoUserFound {
                customer_id: invoice.customer.clone(),
            };
            return Ok(());
        };

        let now = Timestamp::now();
        let record = match self.dunning.find_unresolved_by_invoice_id(&invoice.id).await? {
            Some(existing) => existing,
            None => {
                let fresh = DunningRecord::new(
                    &invoice.id,
                    invoice.subscription.clone(),
                    &invoice.customer,
                    user_id.clone(),
                    invoice.amount_due,
                    invoice.hosted_invoice_url.clone(),
                    now,
                );
                match self.dunning.insert(&fresh).await? {
                    SaveResult::Inserted => fresh,
                    // Lost the race against a concurrent delivery: defer to
                    // the row that won.
                    SaveResult::AlreadyExists => self
                        .dunning
                        .find_unresolved_by_invoice_id(&invoice.id)
                        .await?
                        .unwrap_or(fresh),
                }
            }
        };

        let mut email_sent = false;
        if let Some(stage) = record.next_stage() {
            tracing::info!(
                invoice_id = %invoice.id,
                stage = stage.number(),
                "sending dunning escalation"
            );
            // The counter advances whether or not the send succeeds, so a
            // flaky email provider cannot double-send on redelivery.
            email_sent = self.send_payment_failed_email(invoice).await;
            report.record(SideEffect::PaymentFailedEmail, email_sent);
            self.dunning.record_email_sent(&invoice.id).await?;

            let ok = self
                .insert_notification(Notification::new(
                    user_id.clone(),
                    NotificationKind::PaymentFailed,
                    "Payment failed",
                    "We could not collect your latest subscription payment. \
                     Please update your payment details.",
                    serde_json::json!({
                        "invoice_id": invoice.id,
                        "amount_due": invoice.amount_due,
                        "hosted_invoice_url": invoice.hosted_invoice_url,
                    }),
                ))
                .await;
            report.record(SideEffect::PaymentFailedNotification, ok);
        } else {
            tracing::debug!(
                invoice_id = %invoice.id,
                emails_sent = record.emails_sent,
                "no dunning stage due, duplicate delivery"
            );
        }

        report.disposition = Disposition::DunningTracked {
            invoice_id: invoice.id.clone(),
            email_sent,
        };
        Ok(())
    }

    /// Handles `invoice.paid`.
    async fn resolve_payment(
        &self,
        invoice: &InvoiceObject,
        report: &mut ReconcileReport,
    ) -> Result<(), WebhookError> {
        let now = Timestamp::now();
        let previous = self.dunning.resolve_by_invoice_id(&invoice.id, now).await?;

        let was_tracked = previous.is_some();
        if let Some(record) = previous {
            tracing::info!(
                invoice_id = %invoice.id,
                user_id = %record.user_id,
                "payment recovered, dunning resolved"
            );
            let ok = self
                .insert_notification(Notification::new(
                    record.user_id,
                    NotificationKind::PaymentRecovered,
                    "Payment received",
                    "Thanks, your payment went through and your subscription is back in \
                     good standing.",
                    serde_json::json!({ "invoice_id": invoice.id }),
                ))
                .await;
            report.record(SideEffect::PaymentRecoveredNotification, ok);
        }

        report.disposition = Disposition::DunningResolved {
            invoice_id: invoice.id.clone(),
            was_tracked,
        };
        Ok(())
    }

    /// Writes the entitlement projection. Failures are logged and absorbed
    /// so sibling side effects still run; the next provider event rewrites
    /// the full state anyway.
    async fn write_entitlement(
        &self,
        user_id: &UserId,
        customer_id: &str,
        update: &EntitlementUpdate,
    ) -> bool {
        match self
            .profiles
            .apply_entitlement(user_id, customer_id, update)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, %user_id, "entitlement write failed");
                let context = ErrorContext::new(
                    "entitlement_write_failed",
                    format!("entitlement write for {user_id} failed: {err}"),
                )
                .with_customer_id(customer_id);
                self.error_reporter.report(&context).await;
                false
            }
        }
    }

    /// Fires the one-time welcome email and notification on the first
    /// activation. The onboarding flag gates both: only the call that flips
    /// it sends anything.
    async fn fire_welcome_effects(
        &self,
        user_id: &UserId,
        customer_id: &str,
        tier: Tier,
        report: &mut ReconcileReport,
    ) {
        let first_activation = match self.profiles.mark_onboarded(user_id).await {
            Ok(flipped) => flipped,
            Err(err) => {
                tracing::warn!(error = %err, %user_id, "onboarding flag update failed");
                let context = ErrorContext::new(
                    "onboarding_update_failed",
                    format!("onboarding flag update for {user_id} failed: {err}"),
                )
                .with_customer_id(customer_id);
                self.error_reporter.report(&context).await;
                return;
            }
        };
        if !first_activation {
            return;
        }

        let email_sent = match self.provider.get_customer(customer_id).await {
            Ok(Some(customer)) => match customer.email {
                Some(email) => match self.emails.send_welcome(&email, tier).await {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(error = %err, "welcome email send failed");
                        let context = ErrorContext::new(
                            "email_send_failed",
                            format!("welcome email for {user_id} failed: {err}"),
                        )
                        .with_customer_id(customer_id);
                        self.error_reporter.report(&context).await;
                        false
                    }
                },
                None => {
                    tracing::warn!(customer_id, "customer has no email, skipping welcome email");
                    false
                }
            },
            Ok(None) => {
                tracing::warn!(customer_id, "customer not found, skipping welcome email");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "customer fetch for welcome email failed");
                false
            }
        };
        report.record(SideEffect::WelcomeEmail, email_sent);

        let ok = self
            .insert_notification(Notification::new(
                user_id.clone(),
                NotificationKind::Welcome,
                "Welcome to SparkHub",
                "Your subscription is active. Head to your dashboard to get started.",
                serde_json::json!({ "tier": tier.as_str() }),
            ))
            .await;
        report.record(SideEffect::WelcomeNotification, ok);
    }

    async fn notify_status_change(
        &self,
        user_id: &UserId,
        previous: &str,
        current: &str,
        report: &mut ReconcileReport,
    ) {
        let ok = self
            .insert_notification(Notification::new(
                user_id.clone(),
                NotificationKind::SubscriptionStatusChanged,
                "Subscription updated",
                format!("Your subscription changed from {previous} to {current}."),
                serde_json::json!({ "previous": previous, "current": current }),
            ))
            .await;
        report.record(SideEffect::StatusChangeNotification, ok);
    }

    /// Sends the dunning email to the invoice email, falling back to the
    /// provider customer record. Returns whether the send succeeded.
    async fn send_payment_failed_email(&self, invoice: &InvoiceObject) -> bool {
        let email = match &invoice.customer_email {
            Some(email) => Some(email.clone()),
            None => match self.provider.get_customer(&invoice.customer).await {
                Ok(customer) => customer.and_then(|c| c.email),
                Err(err) => {
                    tracing::warn!(error = %err, "customer fetch for dunning email failed");
                    None
                }
            },
        };
        let Some(email) = email else {
            tracing::warn!(invoice_id = %invoice.id, "no email for dunning notice");
            return false;
        };

        match self
            .emails
            .send_payment_failed(
                &email,
                invoice.amount_due,
                invoice.hosted_invoice_url.as_deref(),
            )
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, invoice_id = %invoice.id, "dunning email send failed");
                let context = ErrorContext::new(
                    "email_send_failed",
                    format!("dunning notice for invoice {} failed: {err}", invoice.id),
                )
                .with_customer_id(&invoice.customer);
                self.error_reporter.report(&context).await;
                false
            }
        }
    }

    async fn insert_notification(&self, notification: Notification) -> bool {
        match self.notifications.insert(&notification).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, kind = notification.kind.as_str(), "notification insert failed");
                let context = ErrorContext::new(
                    "notification_insert_failed",
                    format!("{} notification insert failed: {err}", notification.kind.as_str()),
                );
                self.error_reporter.report(&context).await;
                false
            }
        }
    }
}
