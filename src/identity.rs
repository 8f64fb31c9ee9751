// src/identity.rs

//! Identity gateway. Sign-in is delegated to an external OpenID Connect
//! provider; the service only exchanges an access token for a profile.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

/// Standard userinfo claims used by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a provider access token to the signed-in user's profile.
    async fn user_info(&self, access_token: &str) -> Result<IdentityProfile, AppError>;
}

/// Calls the provider's userinfo endpoint with the bearer token.
pub struct OidcIdentityProvider {
    client: reqwest::Client,
    userinfo_url: Url,
}

impl OidcIdentityProvider {
    pub fn new(userinfo_url: Url) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(Self {
            client,
            userinfo_url,
        })
    }
}

#[async_trait]
impl IdentityProvider for OidcIdentityProvider {
    async fn user_info(&self, access_token: &str) -> Result<IdentityProfile, AppError> {
        let response = self
            .client
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Identity provider request failed: {:?}", e);
                AppError::ServiceUnavailable("Identity provider unreachable".to_string())
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AppError::AuthError("Invalid access token".to_string()));
            }
            status => {
                tracing::warn!("Identity provider answered {}", status);
                return Err(AppError::ServiceUnavailable(format!(
                    "Identity provider answered {}",
                    status
                )));
            }
        }

        response.json::<IdentityProfile>().await.map_err(|e| {
            tracing::error!("Malformed userinfo response: {:?}", e);
            AppError::ServiceUnavailable("Malformed identity provider response".to_string())
        })
    }
}

/// Fixed token → profile table, for local development and tests.
#[derive(Default)]
pub struct StaticIdentityProvider {
    profiles: HashMap<String, IdentityProfile>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, access_token: &str, profile: IdentityProfile) -> Self {
        self.profiles.insert(access_token.to_string(), profile);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn user_info(&self, access_token: &str) -> Result<IdentityProfile, AppError> {
        self.profiles
            .get(access_token)
            .cloned()
            .ok_or_else(|| AppError::AuthError("Invalid access token".to_string()))
    }
}
