// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    identity::IdentityProfile,
    models::user::{
        LoginRequest, ROLE_ADMIN, ROLE_USER, UpdatePreferencesRequest, User,
    },
    state::AppState,
    utils::{
        jwt::{Claims, sign_jwt},
        sse::change_stream,
    },
};

/// Signs a user in with an identity-provider access token.
///
/// Creates the profile document on first login, refreshes it on every later one,
/// then returns a session JWT.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let profile = state.identity.user_info(&payload.access_token).await?;
    let path = User::document_path(&profile.sub);
    let now = Utc::now();
    let display_name = display_name(&profile);

    let user = match state.documents.get(&path).await? {
        Some(_) => {
            let merged = state
                .documents
                .update(
                    &path,
                    json!({
                        "name": display_name,
                        "email": profile.email,
                        "picture": profile.picture,
                        "last_login_at": now,
                    }),
                )
                .await?;
            decode_user(merged)?
        }
        None => {
            let role = if state.config.is_admin_email(&profile.email) {
                ROLE_ADMIN
            } else {
                ROLE_USER
            };
            let user = User {
                id: profile.sub.clone(),
                name: display_name,
                email: profile.email.clone(),
                picture: profile.picture.clone(),
                language: Default::default(),
                role: role.to_string(),
                created_at: now,
                last_login_at: now,
            };
            state
                .documents
                .set(&path, serde_json::to_value(&user).map_err(internal)?)
                .await?;
            tracing::info!("Created profile for {} ({})", user.id, user.role);
            user
        }
    };

    let token = sign_jwt(
        &user.id,
        &user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user
    })))
}

/// Revokes the presented token. Other tokens of the same user stay valid.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    state
        .documents
        .set(
            &claims.revocation_path(),
            json!({
                "user_id": claims.sub,
                "expires_at": claims.exp,
                "revoked_at": Utc::now(),
            }),
        )
        .await?;
    tracing::info!("User {} signed out", claims.sub);

    Ok(StatusCode::NO_CONTENT)
}

/// Get current user's profile.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_user(&state, &claims.sub).await?))
}

/// Update the current user's interface language.
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, AppError> {
    load_user(&state, &claims.sub).await?;

    let merged = state
        .documents
        .update(
            &User::document_path(&claims.sub),
            json!({ "language": payload.language }),
        )
        .await?;

    Ok(Json(decode_user(merged)?))
}

/// Server-sent events for changes to the current user's profile document.
pub async fn stream_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let subscription = state.documents.subscribe(&User::document_path(&claims.sub));
    change_stream(subscription, "profile")
}

async fn load_user(state: &AppState, user_id: &str) -> Result<User, AppError> {
    let doc = state
        .documents
        .get(&User::document_path(user_id))
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;
    decode_user(doc)
}

fn decode_user(doc: serde_json::Value) -> Result<User, AppError> {
    serde_json::from_value(doc).map_err(internal)
}

fn internal(e: serde_json::Error) -> AppError {
    AppError::InternalServerError(format!("Malformed user document: {}", e))
}

fn display_name(profile: &IdentityProfile) -> String {
    profile
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| {
            profile
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let profile = IdentityProfile {
            sub: "s".to_string(),
            email: "hafiz@example.my".to_string(),
            name: Some("  ".to_string()),
            picture: None,
        };
        assert_eq!(display_name(&profile), "hafiz");
    }
}
