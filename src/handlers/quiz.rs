// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    learning::{gate, scoring},
    models::{
        attempt::{AttemptResponse, QuizAttempt, SubmitAttemptRequest},
        quiz::PublicQuiz,
        topic::AssessmentKind,
    },
    state::AppState,
    utils::{jwt::Claims, sse::change_stream},
};

/// Lists every quiz, newest first, without answer keys.
pub async fn list_quizzes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let quizzes = state.learning.list_quizzes().await?;
    let public: Vec<PublicQuiz> = quizzes.iter().map(PublicQuiz::from).collect();
    Ok(Json(public))
}

/// Fetches one quiz without answer keys.
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state
        .learning
        .get_quiz(&id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(PublicQuiz::from(&quiz)))
}

/// Server-sent events for newly created quizzes.
pub async fn stream_quizzes(State(state): State<AppState>) -> impl IntoResponse {
    change_stream(state.learning.subscribe_quizzes(), "quiz")
}

/// Submits a user's answers and scores them.
///
/// * Scores against the stored answer key.
/// * For every topic using this quiz as its pre-quiz, updates that topic's gate.
/// * Appends the attempt to the user's history.
///
/// Gate writes are idempotent and run before the insert, so a failed
/// request never leaves a stored attempt behind.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<String>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state
        .learning
        .get_quiz(&quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if quiz.questions.is_empty() {
        return Err(AppError::BadRequest("Quiz has no questions".to_string()));
    }

    let summary = scoring::score(&quiz.questions, &req.answers);

    let mut unlocked_topics = Vec::new();
    for slot in state.learning.topics_for_quiz(&quiz.id).await? {
        if slot.kind != AssessmentKind::Pre {
            continue;
        }
        let unlocked = gate::record_pre_quiz_result(
            state.learning.as_ref(),
            &claims.sub,
            slot.topic,
            &summary,
            state.config.pre_quiz_passing_percentage,
        )
        .await?;
        if unlocked {
            unlocked_topics.push(slot.topic);
        }
    }

    let mut answers = req.answers;
    answers.resize(quiz.questions.len(), None);

    let attempt = QuizAttempt {
        id: Uuid::new_v4().to_string(),
        quiz_id: quiz.id.clone(),
        user_id: claims.sub.clone(),
        answers,
        summary,
        completed_at: Utc::now(),
    };
    state.learning.record_attempt(&attempt).await?;

    tracing::info!(
        "User {} scored {}/{} on quiz {}",
        claims.sub,
        summary.score,
        summary.max_score,
        quiz.id
    );

    Ok((
        StatusCode::CREATED,
        Json(AttemptResponse {
            attempt_id: attempt.id,
            summary,
            unlocked_topics,
        }),
    ))
}

/// Lists the current user's attempts, newest first.
pub async fn list_my_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.learning.list_attempts(&claims.sub).await?))
}
