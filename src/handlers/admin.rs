// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        quiz::{CreateQuizRequest, Quiz},
        topic::{AssessmentKind, AssignTopicQuizzesRequest, Topic, TopicQuiz},
    },
    state::AppState,
    utils::{html::clean_html, jwt::Claims},
};

/// Creates a new quiz.
/// Admin only.
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let questions = payload
        .questions
        .into_iter()
        .enumerate()
        .map(|(idx, q)| {
            q.into_question()
                .map_err(|msg| AppError::BadRequest(format!("Question {}: {}", idx + 1, msg)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let quiz = Quiz {
        id: Uuid::new_v4().to_string(),
        title: clean_html(&payload.title),
        category: clean_html(&payload.category),
        grade_level: payload.grade_level,
        difficulty: payload.difficulty,
        questions,
        created_by: claims.sub,
        created_at: Utc::now(),
    };

    state.learning.create_quiz(&quiz).await?;
    tracing::info!("Quiz {} created by {}", quiz.id, quiz.created_by);

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": quiz.id}))))
}

/// Points a topic's pre and/or post assessment at existing quizzes.
/// Admin only.
pub async fn assign_topic_quizzes(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Json(payload): Json<AssignTopicQuizzesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let topic: Topic = topic.parse()?;

    let slots = [
        (AssessmentKind::Pre, payload.pre_quiz_id),
        (AssessmentKind::Post, payload.post_quiz_id),
    ];

    if slots.iter().all(|(_, id)| id.is_none()) {
        return Err(AppError::BadRequest(
            "Provide pre_quiz_id and/or post_quiz_id".to_string(),
        ));
    }

    // Check every referenced quiz before writing anything.
    for (_, quiz_id) in &slots {
        if let Some(quiz_id) = quiz_id {
            state
                .learning
                .get_quiz(quiz_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))?;
        }
    }

    let mut assigned = Vec::new();
    for (kind, quiz_id) in slots {
        if let Some(quiz_id) = quiz_id {
            let assignment = TopicQuiz {
                topic,
                kind,
                quiz_id,
            };
            state.learning.assign_topic_quiz(&assignment).await?;
            assigned.push(assignment);
        }
    }

    Ok(Json(assigned))
}
