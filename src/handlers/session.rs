// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    error::AppError,
    learning::session,
    models::{
        session::{RestartSessionRequest, SessionEvent},
        topic::Topic,
    },
    state::AppState,
    utils::jwt::Claims,
};

/// Current active session, or `null` when none exists.
pub async fn get_active_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let topic: Topic = topic.parse()?;
    let active = session::get_active_session(state.learning.as_ref(), &claims.sub, topic).await?;
    Ok(Json(active))
}

/// Starts a new session. 409 if one is already active.
pub async fn create_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let topic: Topic = topic.parse()?;
    let created =
        session::create_session(state.learning.as_ref(), &claims.sub, topic, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Applies one progression event to the active session.
pub async fn advance_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(topic): Path<String>,
    Json(event): Json<SessionEvent>,
) -> Result<impl IntoResponse, AppError> {
    let topic: Topic = topic.parse()?;
    let updated = session::advance(
        state.learning.as_ref(),
        &claims.sub,
        topic,
        &event,
        Utc::now(),
    )
    .await?;
    Ok(Json(updated))
}

/// Abandons the active session and starts over. Requires `{"confirm": true}`.
pub async fn restart_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(topic): Path<String>,
    Json(req): Json<RestartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let topic: Topic = topic.parse()?;
    let fresh = session::abandon_and_restart(
        state.learning.as_ref(),
        &claims.sub,
        topic,
        req.confirm,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(fresh)))
}

/// Finished and abandoned sessions for the topic, oldest first.
pub async fn get_session_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let topic: Topic = topic.parse()?;
    let history = session::get_history(state.learning.as_ref(), &claims.sub, topic).await?;
    Ok(Json(history))
}
