// src/store/memory.rs

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    models::{
        attempt::QuizAttempt,
        quiz::Quiz,
        session::{LearningSession, SessionStatus},
        topic::{AssessmentKind, Topic, TopicQuiz},
    },
    store::{
        ChangeEvent, ChangeFeed, DOCUMENTS_CHANNEL, DocumentStore, LearningStore, QUIZZES_CHANNEL,
        StoreError, StoreResult, Subscription, check_transition,
    },
};

#[derive(Default)]
struct Inner {
    documents: BTreeMap<String, serde_json::Value>,
    quizzes: HashMap<String, Quiz>,
    topic_quizzes: HashMap<(Topic, AssessmentKind), String>,
    attempts: Vec<QuizAttempt>,
    pre_assessments: HashMap<(String, Topic), bool>,
    sessions: Vec<LearningSession>,
}

/// In-process implementation of both gateways.
///
/// Used when no database is configured and by the test suite.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    feed: ChangeFeed,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> StoreResult<Option<serde_json::Value>> {
        self.ensure_online()?;
        Ok(self.inner.read().await.documents.get(path).cloned())
    }

    async fn set(&self, path: &str, value: serde_json::Value) -> StoreResult<()> {
        self.ensure_online()?;
        self.inner
            .write()
            .await
            .documents
            .insert(path.to_string(), value.clone());

        self.feed.publish(ChangeEvent {
            channel: DOCUMENTS_CHANNEL,
            key: path.to_string(),
            value,
        });
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        partial: serde_json::Value,
    ) -> StoreResult<serde_json::Value> {
        self.ensure_online()?;
        let serde_json::Value::Object(fields) = partial else {
            return Err(StoreError::InvalidInput(
                "partial update must be a JSON object".to_string(),
            ));
        };

        let merged = {
            let mut inner = self.inner.write().await;
            let doc = inner
                .documents
                .entry(path.to_string())
                .or_insert_with(|| serde_json::json!({}));
            if !doc.is_object() {
                *doc = serde_json::json!({});
            }
            if let Some(target) = doc.as_object_mut() {
                target.extend(fields);
            }
            doc.clone()
        };

        self.feed.publish(ChangeEvent {
            channel: DOCUMENTS_CHANNEL,
            key: path.to_string(),
            value: merged.clone(),
        });
        Ok(merged)
    }

    fn subscribe(&self, path: &str) -> Subscription {
        self.feed.subscribe(DOCUMENTS_CHANNEL, Some(path.to_string()))
    }
}

#[async_trait]
impl LearningStore for MemoryStore {
    async fn get_quiz(&self, id: &str) -> StoreResult<Option<Quiz>> {
        self.ensure_online()?;
        Ok(self.inner.read().await.quizzes.get(id).cloned())
    }

    async fn list_quizzes(&self) -> StoreResult<Vec<Quiz>> {
        self.ensure_online()?;
        let mut quizzes: Vec<Quiz> = self.inner.read().await.quizzes.values().cloned().collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(quizzes)
    }

    async fn create_quiz(&self, quiz: &Quiz) -> StoreResult<()> {
        self.ensure_online()?;
        {
            let mut inner = self.inner.write().await;
            if inner.quizzes.contains_key(&quiz.id) {
                return Err(StoreError::Conflict(format!("quiz {} already exists", quiz.id)));
            }
            inner.quizzes.insert(quiz.id.clone(), quiz.clone());
        }

        self.feed.publish(ChangeEvent {
            channel: QUIZZES_CHANNEL,
            key: quiz.id.clone(),
            value: serde_json::to_value(quiz)?,
        });
        Ok(())
    }

    fn subscribe_quizzes(&self) -> Subscription {
        self.feed.subscribe(QUIZZES_CHANNEL, None)
    }

    async fn assign_topic_quiz(&self, assignment: &TopicQuiz) -> StoreResult<()> {
        self.ensure_online()?;
        self.inner
            .write()
            .await
            .topic_quizzes
            .insert((assignment.topic, assignment.kind), assignment.quiz_id.clone());
        Ok(())
    }

    async fn topic_quiz(
        &self,
        topic: Topic,
        kind: AssessmentKind,
    ) -> StoreResult<Option<TopicQuiz>> {
        self.ensure_online()?;
        Ok(self
            .inner
            .read()
            .await
            .topic_quizzes
            .get(&(topic, kind))
            .map(|quiz_id| TopicQuiz {
                topic,
                kind,
                quiz_id: quiz_id.clone(),
            }))
    }

    async fn topics_for_quiz(&self, quiz_id: &str) -> StoreResult<Vec<TopicQuiz>> {
        self.ensure_online()?;
        let inner = self.inner.read().await;
        let mut matches: Vec<TopicQuiz> = inner
            .topic_quizzes
            .iter()
            .filter(|(_, id)| id.as_str() == quiz_id)
            .map(|((topic, kind), id)| TopicQuiz {
                topic: *topic,
                kind: *kind,
                quiz_id: id.clone(),
            })
            .collect();
        matches.sort_by_key(|m| (m.topic, m.kind == AssessmentKind::Post));
        Ok(matches)
    }

    async fn record_attempt(&self, attempt: &QuizAttempt) -> StoreResult<()> {
        self.ensure_online()?;
        self.inner.write().await.attempts.push(attempt.clone());
        Ok(())
    }

    async fn get_attempt(&self, id: &str) -> StoreResult<Option<QuizAttempt>> {
        self.ensure_online()?;
        Ok(self
            .inner
            .read()
            .await
            .attempts
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn list_attempts(&self, user_id: &str) -> StoreResult<Vec<QuizAttempt>> {
        self.ensure_online()?;
        let mut attempts: Vec<QuizAttempt> = self
            .inner
            .read()
            .await
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        attempts.reverse();
        Ok(attempts)
    }

    async fn get_pre_assessment_status(
        &self,
        user_id: &str,
    ) -> StoreResult<BTreeMap<Topic, bool>> {
        self.ensure_online()?;
        Ok(self
            .inner
            .read()
            .await
            .pre_assessments
            .iter()
            .filter(|((uid, _), _)| uid == user_id)
            .map(|((_, topic), passed)| (*topic, *passed))
            .collect())
    }

    async fn mark_pre_assessment_passed(&self, user_id: &str, topic: Topic) -> StoreResult<()> {
        self.ensure_online()?;
        self.inner
            .write()
            .await
            .pre_assessments
            .insert((user_id.to_string(), topic), true);
        Ok(())
    }

    async fn insert_session(&self, session: &LearningSession) -> StoreResult<()> {
        self.ensure_online()?;
        let mut inner = self.inner.write().await;
        let has_active = inner.sessions.iter().any(|s| {
            s.user_id == session.user_id && s.topic == session.topic && s.status.is_active()
        });
        if has_active {
            return Err(StoreError::Conflict(format!(
                "an active {} session already exists",
                session.topic
            )));
        }
        inner.sessions.push(session.clone());
        Ok(())
    }

    async fn active_session(
        &self,
        user_id: &str,
        topic: Topic,
    ) -> StoreResult<Option<LearningSession>> {
        self.ensure_online()?;
        Ok(self
            .inner
            .read()
            .await
            .sessions
            .iter()
            .find(|s| s.user_id == user_id && s.topic == topic && s.status.is_active())
            .cloned())
    }

    async fn save_transition(
        &self,
        session: &LearningSession,
        from: SessionStatus,
    ) -> StoreResult<()> {
        self.ensure_online()?;
        check_transition(from, session.status)?;

        let mut inner = self.inner.write().await;
        let stored = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session.id)
            .ok_or_else(|| StoreError::Conflict(format!("session {} not found", session.id)))?;

        if stored.status != from {
            return Err(StoreError::Conflict(format!(
                "session {} is {} but the write expected {}",
                session.id, stored.status, from
            )));
        }
        *stored = session.clone();
        Ok(())
    }

    async fn session_history(
        &self,
        user_id: &str,
        topic: Topic,
    ) -> StoreResult<Vec<LearningSession>> {
        self.ensure_online()?;
        let mut history: Vec<LearningSession> = self
            .inner
            .read()
            .await
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.topic == topic && !s.status.is_active())
            .cloned()
            .collect();
        history.sort_by_key(|s| s.created_at);
        Ok(history)
    }

    async fn completed_topics(&self, user_id: &str) -> StoreResult<BTreeSet<Topic>> {
        self.ensure_online()?;
        Ok(self
            .inner
            .read()
            .await
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::PostQuizCompleted)
            .map(|s| s.topic)
            .collect())
    }
}
