// src/utils/jwt.rs

//! Session tokens issued after an identity-provider login.
//!
//! A token carries the learner's id, role and a unique `jti`. Logging out
//! writes `revoked_tokens/{jti}` to the document store; `auth_middleware`
//! refuses any token with such a record until it expires on its own.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::user::ROLE_ADMIN, state::AppState};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Identity provider subject, also the user document id.
    pub sub: String,
    pub role: String,
    /// Token id, the key of its revocation record.
    pub jti: String,
    /// Unix seconds.
    pub exp: u64,
}

impl Claims {
    pub fn revocation_path(&self) -> String {
        revocation_path(&self.jti)
    }
}

pub fn revocation_path(jti: &str) -> String {
    format!("revoked_tokens/{}", jti)
}

/// Issues a token for `user_id` valid for `ttl_seconds`.
pub fn sign_jwt(
    user_id: &str,
    role: &str,
    secret: &str,
    ttl_seconds: u64,
) -> Result<String, AppError> {
    let issued_at = u64::try_from(Utc::now().timestamp())
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let claims = Claims {
        sub: user_id.to_owned(),
        role: role.to_owned(),
        jti: Uuid::new_v4().to_string(),
        exp: issued_at.saturating_add(ttl_seconds),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Checks signature and expiry. Revocation is checked by the middleware.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))
}

/// Requires a live bearer token and exposes its `Claims` to handlers.
///
/// A revoked token is a 401. If the revocation record cannot be read the
/// request fails with 503 rather than letting the token through.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;

    if state
        .documents
        .get(&claims.revocation_path())
        .await?
        .is_some()
    {
        return Err(AppError::AuthError("Token has been revoked".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Admin-only guard. Layer it inside `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    if claims.role != ROLE_ADMIN {
        return Err(AppError::Forbidden("Admin role required".to_string()));
    }

    Ok(next.run(req).await)
}
