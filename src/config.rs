// src/config.rs

use std::{env, path::PathBuf};

use dotenvy::dotenv;
use url::Url;

use crate::error::AppError;

/// Points awarded for a correct answer when a question does not set its own.
pub const DEFAULT_QUESTION_POINTS: u32 = 10;

/// Default pre-quiz threshold. Any completed pre-quiz unlocks the lesson.
pub const DEFAULT_PRE_QUIZ_PASSING_PERCENTAGE: u8 = 0;

/// Largest accepted media upload, in bytes.
pub const MAX_MEDIA_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Lifetime of issued tokens, in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Userinfo endpoint of the identity provider.
    pub oidc_userinfo_url: Url,
    /// Emails that receive the admin role on first login.
    pub admin_emails: Vec<String>,
    pub pre_quiz_passing_percentage: u8,
    pub port: u16,
    /// Directory holding uploaded images and PDFs, served under `/media`.
    pub media_dir: PathBuf,
    /// Externally visible origin, used to build media URLs.
    pub public_base_url: Url,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = parsed("JWT_EXPIRATION", 86_400)?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let oidc_userinfo_url = Url::parse(&required("OIDC_USERINFO_URL")?).map_err(|e| {
            AppError::InternalServerError(format!("OIDC_USERINFO_URL is not a valid URL: {}", e))
        })?;

        let admin_emails = env::var("ADMIN_EMAILS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        let pre_quiz_passing_percentage: u8 = parsed(
            "PRE_QUIZ_PASSING_PERCENTAGE",
            DEFAULT_PRE_QUIZ_PASSING_PERCENTAGE,
        )?;
        if pre_quiz_passing_percentage > 100 {
            return Err(AppError::InternalServerError(
                "PRE_QUIZ_PASSING_PERCENTAGE must be between 0 and 100".to_string(),
            ));
        }

        let port = parsed("PORT", 3000)?;

        let media_dir = env::var("MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));
        let public_base_url = Url::parse(&public_base_url).map_err(|e| {
            AppError::InternalServerError(format!("PUBLIC_BASE_URL is not a valid URL: {}", e))
        })?;

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            oidc_userinfo_url,
            admin_emails,
            pre_quiz_passing_percentage,
            port,
            media_dir,
            public_base_url,
        })
    }

    /// Public URL of an uploaded media file.
    pub fn media_url(&self, name: &str) -> Result<Url, AppError> {
        self.public_base_url
            .join(&format!("media/{}", name))
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::InternalServerError(format!("{} must be set", key)))
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::InternalServerError(format!("{} has an invalid value", key))),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
