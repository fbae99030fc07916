//! PostgreSQL implementation of DunningRepository.
//!
//! Race safety comes from a partial unique index on
//! `failed_payment_tracking (stripe_invoice_id) WHERE resolved = false`
//! paired with `ON CONFLICT DO NOTHING`: concurrent deliveries of the same
//! failure agree on one tracking row, and a resolved invoice can start a
//! fresh tracking cycle if it ever fails again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::DunningRecord;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{DunningRepository, SaveResult};

/// PostgreSQL implementation of the DunningRepository port.
pub struct PostgresDunningRepository {
    pool: PgPool,
}

impl PostgresDunningRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DunningRow {
    stripe_invoice_id: String,
    stripe_subscription_id: Option<String>,
    stripe_customer_id: String,
    user_id: Uuid,
    amount_due: i64,
    hosted_invoice_url: Option<String>,
    emails_sent: i32,
    resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DunningRow> for DunningRecord {
    type Error = DomainError;

    fn try_from(row: DunningRow) -> Result<Self, Self::Error> {
        Ok(DunningRecord {
            stripe_invoice_id: row.stripe_invoice_id,
            stripe_subscription_id: row.stripe_subscription_id,
            stripe_customer_id: row.stripe_customer_id,
            user_id: UserId::new(row.user_id.to_string()).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            amount_due: row.amount_due,
            hosted_invoice_url: row.hosted_invoice_url,
            emails_sent: row.emails_sent.max(0) as u32,
            resolved: row.resolved,
            resolved_at: row.resolved_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_user_id_as_uuid(user_id: &UserId) -> Result<Uuid, DomainError> {
    Uuid::parse_str(user_id.as_str()).map_err(|e| {
        DomainError::new(
            ErrorCode::ValidationFailed,
            format!("User ID must be a valid UUID: {}", e),
        )
    })
}

const SELECT_COLUMNS: &str = "stripe_invoice_id, stripe_subscription_id, stripe_customer_id, \
                              user_id, amount_due, hosted_invoice_url, emails_sent, resolved, \
                              resolved_at, created_at";

#[async_trait]
impl DunningRepository for PostgresDunningRepository {
    async fn find_unresolved_by_invoice_id(
        &self,
        invoice_id: &str,
    ) -> Result<Option<DunningRecord>, DomainError> {
        let row: Option<DunningRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM failed_payment_tracking \
             WHERE stripe_invoice_id = $1 AND resolved = false"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load dunning record: {}", e)))?;

        row.map(DunningRecord::try_from).transpose()
    }

    async fn insert(&self, record: &DunningRecord) -> Result<SaveResult, DomainError> {
        let user_uuid = parse_user_id_as_uuid(&record.user_id)?;

        let result = sqlx::query(
            r#"
            INSERT INTO failed_payment_tracking (
                stripe_invoice_id, stripe_subscription_id, stripe_customer_id,
                user_id, amount_due, hosted_invoice_url, emails_sent, resolved, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, false, $8)
            ON CONFLICT (stripe_invoice_id) WHERE resolved = false DO NOTHING
            "#,
        )
        .bind(&record.stripe_invoice_id)
        .bind(&record.stripe_subscription_id)
        .bind(&record.stripe_customer_id)
        .bind(user_uuid)
        .bind(record.amount_due)
        .bind(&record.hosted_invoice_url)
        .bind(record.emails_sent as i32)
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert dunning record: {}", e)))?;

        if result.rows_affected() == 1 {
            Ok(SaveResult::Inserted)
        } else {
            Ok(SaveResult::AlreadyExists)
        }
    }

    async fn record_email_sent(&self, invoice_id: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE failed_payment_tracking
            SET emails_sent = emails_sent + 1, updated_at = now()
            WHERE stripe_invoice_id = $1 AND resolved = false
            "#,
        )
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record dunning email: {}", e)))?;

        Ok(())
    }

    async fn resolve_by_invoice_id(
        &self,
        invoice_id: &str,
        at: Timestamp,
    ) -> Result<Option<DunningRecord>, DomainError> {
        let row: Option<DunningRow> = sqlx::query_as(&format!(
            r#"
            UPDATE failed_payment_tracking
            SET resolved = true, resolved_at = $2, updated_at = now()
            WHERE stripe_invoice_id = $1 AND resolved = false
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to resolve dunning record: {}", e)))?;

        // RETURNING yields the post-update row; the caller expects the
        // pre-resolution view.
        row.map(|row| {
            DunningRecord::try_from(row).map(|mut record| {
                record.resolved = false;
                record.resolved_at = None;
                record
            })
        })
        .transpose()
    }

    async fn resolve_by_subscription_id(
        &self,
        subscription_id: &str,
        at: Timestamp,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE failed_payment_tracking
            SET resolved = true, resolved_at = $2, updated_at = now()
            WHERE stripe_subscription_id = $1 AND resolved = false
            "#,
        )
        .bind(subscription_id)
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to resolve dunning records: {}", e))
        })?;

        Ok(result.rows_affected())
    }
}
