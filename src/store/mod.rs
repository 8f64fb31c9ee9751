// src/store/mod.rs

//! Persistence gateways.
//!
//! `DocumentStore` holds free-form JSON documents by path (user profiles).
//! `LearningStore` holds quizzes, attempts, learning sessions and
//! pre-assessment flags. Both are implemented in memory and on PostgreSQL.
//! `MediaStore` holds uploaded files.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::{
    attempt::QuizAttempt,
    quiz::Quiz,
    session::{LearningSession, SessionStatus},
    topic::{AssessmentKind, Topic, TopicQuiz},
};

pub mod media;
pub mod memory;
pub mod postgres;

pub use media::{LocalMediaStore, MediaStore};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by a persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached. Retryable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness rule or an optimistic check failed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A session write that does not follow the allowed sequence.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// The caller passed a value the store cannot apply.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Stored data could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => {
                StoreError::Corrupt(err.to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Channel carrying quiz creations.
pub const QUIZZES_CHANNEL: &str = "quizzes";

/// Channel carrying document writes.
pub const DOCUMENTS_CHANNEL: &str = "documents";

/// A change pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub channel: &'static str,
    /// Quiz id or document path.
    pub key: String,
    pub value: serde_json::Value,
}

/// Fan-out of change events to live subscriptions.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // No receivers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self, channel: &'static str, key: Option<String>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            channel,
            key,
        }
    }

    /// Number of subscriptions still open.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Live subscription handle.
///
/// Events stop as soon as the handle is closed or dropped.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    channel: &'static str,
    key: Option<String>,
}

impl Subscription {
    /// Waits for the next matching change. `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Subscription on '{}' lagged, skipped {} events",
                        self.channel,
                        skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn close(self) {
        drop(self);
    }

    fn matches(&self, event: &ChangeEvent) -> bool {
        event.channel == self.channel
            && self.key.as_deref().is_none_or(|key| key == event.key)
    }
}

/// Free-form JSON documents addressed by path.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> StoreResult<Option<serde_json::Value>>;

    /// Replaces the document at `path`.
    async fn set(&self, path: &str, value: serde_json::Value) -> StoreResult<()>;

    /// Shallow-merges the top-level keys of `partial` into the document at `path`.
    /// Creates the document when missing. Returns the merged document.
    async fn update(
        &self,
        path: &str,
        partial: serde_json::Value,
    ) -> StoreResult<serde_json::Value>;

    /// Subscribes to writes of the document at `path`.
    fn subscribe(&self, path: &str) -> Subscription;
}

/// Quizzes, attempts, sessions and pre-assessment flags.
#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn get_quiz(&self, id: &str) -> StoreResult<Option<Quiz>>;

    /// All quizzes, newest first.
    async fn list_quizzes(&self) -> StoreResult<Vec<Quiz>>;

    async fn create_quiz(&self, quiz: &Quiz) -> StoreResult<()>;

    /// Subscribes to quiz creations.
    fn subscribe_quizzes(&self) -> Subscription;

    async fn assign_topic_quiz(&self, assignment: &TopicQuiz) -> StoreResult<()>;

    async fn topic_quiz(&self, topic: Topic, kind: AssessmentKind)
    -> StoreResult<Option<TopicQuiz>>;

    /// Every slot `quiz_id` is assigned to, by topic then pre before post.
    async fn topics_for_quiz(&self, quiz_id: &str) -> StoreResult<Vec<TopicQuiz>>;

    async fn record_attempt(&self, attempt: &QuizAttempt) -> StoreResult<()>;

    async fn get_attempt(&self, id: &str) -> StoreResult<Option<QuizAttempt>>;

    /// Attempts by `user_id`, newest first.
    async fn list_attempts(&self, user_id: &str) -> StoreResult<Vec<QuizAttempt>>;

    /// Stored flags only. Topics never written are absent.
    async fn get_pre_assessment_status(&self, user_id: &str)
    -> StoreResult<BTreeMap<Topic, bool>>;

    /// Sets the flag for `(user_id, topic)` to true. Idempotent.
    async fn mark_pre_assessment_passed(&self, user_id: &str, topic: Topic) -> StoreResult<()>;

    /// Inserts a fresh session. `Conflict` when an active one already exists.
    async fn insert_session(&self, session: &LearningSession) -> StoreResult<()>;

    async fn active_session(
        &self,
        user_id: &str,
        topic: Topic,
    ) -> StoreResult<Option<LearningSession>>;

    /// Persists `session` if the stored status still equals `from` and
    /// `from → session.status` is an allowed edge.
    async fn save_transition(
        &self,
        session: &LearningSession,
        from: SessionStatus,
    ) -> StoreResult<()>;

    /// Completed and abandoned sessions, oldest first.
    async fn session_history(
        &self,
        user_id: &str,
        topic: Topic,
    ) -> StoreResult<Vec<LearningSession>>;

    /// Topics with at least one `post_quiz_completed` session.
    async fn completed_topics(&self, user_id: &str) -> StoreResult<BTreeSet<Topic>>;

    async fn is_certificate_eligible(&self, user_id: &str) -> StoreResult<bool> {
        let completed = self.completed_topics(user_id).await?;
        Ok(Topic::ALL.iter().all(|topic| completed.contains(topic)))
    }
}

/// Shared write-time check used by every `save_transition` implementation.
pub(crate) fn check_transition(from: SessionStatus, to: SessionStatus) -> StoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_filters_by_channel_and_key() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe(DOCUMENTS_CHANNEL, Some("users/u1".to_string()));

        feed.publish(ChangeEvent {
            channel: QUIZZES_CHANNEL,
            key: "q1".to_string(),
            value: serde_json::json!({}),
        });
        feed.publish(ChangeEvent {
            channel: DOCUMENTS_CHANNEL,
            key: "users/u2".to_string(),
            value: serde_json::json!({}),
        });
        feed.publish(ChangeEvent {
            channel: DOCUMENTS_CHANNEL,
            key: "users/u1".to_string(),
            value: serde_json::json!({"name": "Aina"}),
        });

        let event = sub.recv().await.unwrap();
        assert_eq!(event.key, "users/u1");
        assert_eq!(event.value["name"], "Aina");
    }

    #[test]
    fn test_close_releases_subscription() {
        let feed = ChangeFeed::default();
        let first = feed.subscribe(QUIZZES_CHANNEL, None);
        let second = feed.subscribe(QUIZZES_CHANNEL, None);
        assert_eq!(feed.subscriber_count(), 2);

        first.close();
        assert_eq!(feed.subscriber_count(), 1);

        drop(second);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_check_transition() {
        assert!(check_transition(SessionStatus::Started, SessionStatus::PreQuizCompleted).is_ok());
        assert!(matches!(
            check_transition(SessionStatus::Started, SessionStatus::StudyCompleted),
            Err(StoreError::InvalidTransition { .. })
        ));
    }
}
