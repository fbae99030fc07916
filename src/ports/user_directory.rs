//! User directory port - email to local user id resolution.
//!
//! Last tier of the identity resolution chain: when neither the metadata
//! hint nor a stored mapping identifies the user, the customer's email is
//! matched against the platform's user directory.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

/// Port for looking up local users by email.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find the user registered under the given email.
    ///
    /// Matching is case-insensitive. Returns `None` when no account uses
    /// this email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, DomainError>;
}
