//! PostgreSQL implementation of SubscriberProfileRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Entitlement, EntitlementUpdate, SubscriberProfile, Tier};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::SubscriberProfileRepository;

/// PostgreSQL implementation of the SubscriberProfileRepository port.
///
/// Every write is an upsert keyed on `user_id`: a user's first subscription
/// event creates the profile row implicitly.
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
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

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    stripe_customer_id: Option<String>,
    subscribed: bool,
    tier: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    subscription_start: Option<DateTime<Utc>>,
    subscription_end: Option<DateTime<Utc>>,
    onboarding_completed: bool,
}

impl TryFrom<ProfileRow> for SubscriberProfile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        // A subscribed row without an expiry violates the write invariant;
        // read it as inactive rather than inventing a date.
        let entitlement = match (row.subscribed, row.expires_at) {
            (true, Some(expires_at)) => Entitlement::Active {
                tier: row.tier.as_deref().map(Tier::from_str).unwrap_or(Tier::Unknown),
                expires_at: Timestamp::from_datetime(expires_at),
            },
            _ => Entitlement::Inactive,
        };

        Ok(SubscriberProfile {
            user_id: UserId::new(row.user_id.to_string()).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            stripe_customer_id: row.stripe_customer_id,
            entitlement,
            subscription_start: row.subscription_start.map(Timestamp::from_datetime),
            subscription_end: row.subscription_end.map(Timestamp::from_datetime),
            onboarding_completed: row.onboarding_completed,
        })
    }
}

#[async_trait]
impl SubscriberProfileRepository for PostgresProfileRepository {
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriberProfile>, DomainError> {
        let user_uuid = parse_user_id_as_uuid(user_id)?;

        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT user_id, stripe_customer_id, subscribed, tier, expires_at, \
             subscription_start, subscription_end, onboarding_completed \
             FROM subscriber_profiles WHERE user_id = $1",
        )
        .bind(user_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load profile: {}", e)))?;

        row.map(SubscriberProfile::try_from).transpose()
    }

    async fn find_customer_id(&self, user_id: &UserId) -> Result<Option<String>, DomainError> {
        let user_uuid = parse_user_id_as_uuid(user_id)?;

        let row: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT stripe_customer_id FROM subscriber_profiles WHERE user_id = $1",
        )
        .bind(user_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to load customer mapping: {}", e))
        })?;

        Ok(row.and_then(|(customer_id,)| customer_id))
    }

    async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserId>, DomainError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM subscriber_profiles WHERE stripe_customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to look up customer mapping: {}", e))
        })?;

        row.map(|(user_uuid,)| {
            UserId::new(user_uuid.to_string())
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))
        })
        .transpose()
    }

    async fn backfill_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        let user_uuid = parse_user_id_as_uuid(user_id)?;

        sqlx::query(
            r#"
            INSERT INTO subscriber_profiles (user_id, stripe_customer_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                updated_at = now()
            "#,
        )
        .bind(user_uuid)
        .bind(customer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to backfill customer mapping: {}", e))
        })?;

        Ok(())
    }

    async fn apply_entitlement(
        &self,
        user_id: &UserId,
        customer_id: &str,
        update: &EntitlementUpdate,
    ) -> Result<(), DomainError> {
        let user_uuid = parse_user_id_as_uuid(user_id)?;
        let subscribed = update.entitlement.is_subscribed();
        let tier = update.entitlement.tier().map(|t| t.as_str());
        let expires_at = update.entitlement.expires_at().map(|t| *t.as_datetime());
        let period_start = update.period_start.map(|t| *t.as_datetime());
        let period_end = update.period_end.map(|t| *t.as_datetime());

        sqlx::query(
            r#"
            INSERT INTO subscriber_profiles (
                user_id, stripe_customer_id, subscribed, tier, expires_at,
                subscription_start, subscription_end
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                subscribed = EXCLUDED.subscribed,
                tier = EXCLUDED.tier,
                expires_at = EXCLUDED.expires_at,
                subscription_start = EXCLUDED.subscription_start,
                subscription_end = EXCLUDED.subscription_end,
                updated_at = now()
            "#,
        )
        .bind(user_uuid)
        .bind(customer_id)
        .bind(subscribed)
        .bind(tier)
        .bind(expires_at)
        .bind(period_start)
        .bind(period_end)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to write entitlement: {}", e)))?;

        Ok(())
    }

    async fn mark_onboarded(&self, user_id: &UserId) -> Result<bool, DomainError> {
        let user_uuid = parse_user_id_as_uuid(user_id)?;

        // The predicate makes the flip race-safe: concurrent deliveries
        // agree on a single winner.
        let result = sqlx::query(
            r#"
            UPDATE subscriber_profiles
            SET onboarding_completed = true, updated_at = now()
            WHERE user_id = $1 AND onboarding_completed = false
            "#,
        )
        .bind(user_uuid)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to set onboarding flag: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }
}
