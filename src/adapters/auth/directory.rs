//! User directory adapter backed by the auth service admin API.
//!
//! Implements the `UserDirectory` port by paging through the admin user
//! listing and matching on email. The admin API has no email filter, so the
//! adapter walks pages until it finds a match or exhausts a hard page cap.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::UserDirectory;

/// Users fetched per page.
const PAGE_SIZE: u32 = 200;

/// Hard cap on pages walked per lookup. At 200 users a page this covers
/// 4000 accounts; beyond that the lookup gives up rather than hammer the
/// auth service from a webhook handler.
const MAX_PAGES: u32 = 20;

/// Configuration for the auth directory adapter.
#[derive(Clone)]
pub struct AuthDirectoryConfig {
    /// Base URL of the auth service (e.g. "https://auth.sparkhub.co.uk").
    pub base_url: String,
    /// Service-role key for the admin API.
    pub service_key: SecretString,
}

impl AuthDirectoryConfig {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: SecretString::new(service_key.into()),
        }
    }
}

/// HTTP implementation of the UserDirectory port.
pub struct HttpUserDirectory {
    config: AuthDirectoryConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<DirectoryUser>,
}

#[derive(Debug, Deserialize)]
struct DirectoryUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl HttpUserDirectory {
    pub fn new(config: AuthDirectoryConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<DirectoryUser>, DomainError> {
        let url = format!(
            "{}/auth/v1/admin/users?page={}&per_page={}",
            self.config.base_url.trim_end_matches('/'),
            page,
            PAGE_SIZE
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.service_key.expose_secret())
            .send()
            .await
            .map_err(|e| DomainError::external_service(format!("Directory request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DomainError::external_service(format!(
                "Directory returned {}",
                response.status()
            )));
        }

        let page: UserPage = response.json().await.map_err(|e| {
            DomainError::external_service(format!("Failed to parse directory response: {}", e))
        })?;

        Ok(page.users)
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, DomainError> {
        let needle = email.to_lowercase();

        for page in 1..=MAX_PAGES {
            let users = self.fetch_page(page).await?;
            let page_len = users.len();

            for user in users {
                let matches = user
                    .email
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase() == needle);
                if matches {
                    let user_id = UserId::new(user.id).map_err(|e| {
                        DomainError::external_service(format!("Directory returned invalid id: {}", e))
                    })?;
                    return Ok(Some(user_id));
                }
            }

            if (page_len as u32) < PAGE_SIZE {
                return Ok(None);
            }
        }

        tracing::warn!("directory lookup hit the page cap without a match");
        Ok(None)
    }
}
