// src/handlers/assessment.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    learning::{certificate, gate},
    models::topic::Topic,
    state::AppState,
    utils::jwt::Claims,
};

/// Pre-assessment flag for every topic.
pub async fn get_pre_assessment_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let status = gate::pre_assessment_status(state.learning.as_ref(), &claims.sub).await?;
    Ok(Json(status))
}

/// Whether the topic's lesson is open to the current user.
/// A backend failure is a 503, never a silent "locked".
pub async fn get_topic_unlock(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let topic: Topic = topic.parse()?;
    let unlocked = gate::is_unlocked(state.learning.as_ref(), &claims.sub, topic).await?;

    Ok(Json(json!({
        "topic": topic,
        "unlocked": unlocked
    })))
}

/// Certificate eligibility with completed and missing topics.
pub async fn get_certificate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let status = certificate::certificate_status(state.learning.as_ref(), &claims.sub).await?;
    Ok(Json(status))
}
