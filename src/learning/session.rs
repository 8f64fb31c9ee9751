// src/learning/session.rs

//! Learning session progression for one (user, topic) pair.

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    learning::gate,
    models::{
        session::{LearningSession, SessionEvent, SessionHistoryEntry},
        topic::{AssessmentKind, Topic},
    },
    store::LearningStore,
};

/// Starts a session at `started`. Fails with `Conflict` if one is still active.
pub async fn create_session(
    store: &dyn LearningStore,
    user_id: &str,
    topic: Topic,
    now: DateTime<Utc>,
) -> Result<LearningSession, AppError> {
    let session = LearningSession::new(user_id, topic, now);
    store.insert_session(&session).await?;
    tracing::info!("User {} started a {} session ({})", user_id, topic, session.id);
    Ok(session)
}

/// The active session, or `None` when the learner has not started one.
pub async fn get_active_session(
    store: &dyn LearningStore,
    user_id: &str,
    topic: Topic,
) -> Result<Option<LearningSession>, AppError> {
    Ok(store.active_session(user_id, topic).await?)
}

/// Moves the active session one step forward.
///
/// * `start_study` requires the topic's lesson to be unlocked.
/// * A quiz event may carry an attempt id; its percentage is recorded on the session.
pub async fn advance(
    store: &dyn LearningStore,
    user_id: &str,
    topic: Topic,
    event: &SessionEvent,
    now: DateTime<Utc>,
) -> Result<LearningSession, AppError> {
    let mut session = store
        .active_session(user_id, topic)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No active {} session", topic)))?;

    let from = session.status;
    session
        .advance(event, now)
        .map_err(|e| AppError::Conflict(e.to_string()))?;

    // Sequence first: an out-of-order start_study is a conflict, not a locked lesson.
    if matches!(event, SessionEvent::StartStudy) && !gate::is_unlocked(store, user_id, topic).await? {
        return Err(AppError::Forbidden(format!(
            "The {} lesson is locked until the pre-quiz is passed",
            topic
        )));
    }

    let linked_percentage = match (event, event.attempt_id()) {
        (SessionEvent::CompletePreQuiz { .. }, Some(attempt_id)) => {
            Some(attempt_percentage(store, user_id, topic, AssessmentKind::Pre, attempt_id).await?)
        }
        (SessionEvent::CompletePostQuiz { .. }, Some(attempt_id)) => {
            Some(attempt_percentage(store, user_id, topic, AssessmentKind::Post, attempt_id).await?)
        }
        _ => None,
    };

    match event {
        SessionEvent::CompletePreQuiz { .. } => session.pre_quiz_percentage = linked_percentage,
        SessionEvent::CompletePostQuiz { .. } => session.post_quiz_percentage = linked_percentage,
        _ => {}
    }

    store.save_transition(&session, from).await?;
    tracing::debug!(
        "Session {} moved from {} to {}",
        session.id,
        from,
        session.status
    );
    Ok(session)
}

/// Abandons the active session (kept in history) and starts a new one.
/// `confirm` must be set because in-progress state is discarded.
pub async fn abandon_and_restart(
    store: &dyn LearningStore,
    user_id: &str,
    topic: Topic,
    confirm: bool,
    now: DateTime<Utc>,
) -> Result<LearningSession, AppError> {
    if !confirm {
        return Err(AppError::BadRequest(
            "Restarting discards the current session; set confirm to true".to_string(),
        ));
    }

    if let Some(mut current) = store.active_session(user_id, topic).await? {
        let from = current.status;
        current
            .abandon(now)
            .map_err(|e| AppError::Conflict(e.to_string()))?;
        store.save_transition(&current, from).await?;
        tracing::info!(
            "User {} abandoned {} session {} at {}",
            user_id,
            topic,
            current.id,
            from
        );
    }

    create_session(store, user_id, topic, now).await
}

/// Finished and abandoned sessions, oldest first, with their score delta.
pub async fn get_history(
    store: &dyn LearningStore,
    user_id: &str,
    topic: Topic,
) -> Result<Vec<SessionHistoryEntry>, AppError> {
    let sessions = store.session_history(user_id, topic).await?;
    Ok(sessions
        .into_iter()
        .map(|session| SessionHistoryEntry {
            improvement: session.improvement(),
            session,
        })
        .collect())
}

async fn attempt_percentage(
    store: &dyn LearningStore,
    user_id: &str,
    topic: Topic,
    kind: AssessmentKind,
    attempt_id: &str,
) -> Result<u8, AppError> {
    let attempt = store
        .get_attempt(attempt_id)
        .await?
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("Attempt {} not found", attempt_id)))?;

    if let Some(assigned) = store.topic_quiz(topic, kind).await? {
        if assigned.quiz_id != attempt.quiz_id {
            return Err(AppError::BadRequest(format!(
                "Attempt {} is not for the {} {}-quiz",
                attempt_id,
                topic,
                kind.as_str()
            )));
        }
    }

    Ok(attempt.summary.percentage)
}
