// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A learner or administrator profile.
/// Stored as a document at `users/{id}` in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque subject identifier issued by the identity provider.
    pub id: String,

    pub name: String,

    pub email: String,

    /// Profile picture URL as reported by the identity provider.
    #[serde(default)]
    pub picture: Option<String>,

    #[serde(default)]
    pub language: Language,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub created_at: DateTime<Utc>,

    pub last_login_at: DateTime<Utc>,
}

impl User {
    pub fn document_path(id: &str) -> String {
        format!("users/{}", id)
    }
}

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// Interface language preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ms,
}

/// DTO for user login: the access token obtained from the identity provider.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 4096))]
    pub access_token: String,
}

/// DTO for updating the current user's preferences.
#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub language: Language,
}
