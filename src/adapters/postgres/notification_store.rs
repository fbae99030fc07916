//! PostgreSQL implementation of NotificationStore.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::Notification;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::NotificationStore;

/// PostgreSQL implementation of the NotificationStore port.
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<(), DomainError> {
        let user_uuid = Uuid::parse_str(notification.user_id.as_str()).map_err(|e| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("User ID must be a valid UUID: {}", e),
            )
        })?;

        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, message, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_uuid)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.payload)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert notification: {}", e)))?;

        Ok(())
    }
}
