// src/store/postgres.rs

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    learning::scoring::ScoreSummary,
    models::{
        attempt::QuizAttempt,
        question::Question,
        quiz::Quiz,
        session::{LearningSession, SessionStatus},
        topic::{AssessmentKind, Topic, TopicQuiz},
    },
    store::{
        ChangeEvent, ChangeFeed, DOCUMENTS_CHANNEL, DocumentStore, LearningStore, QUIZZES_CHANNEL,
        StoreError, StoreResult, Subscription, check_transition,
    },
};

/// PostgreSQL implementation of both gateways.
///
/// Subscriptions see writes made through this process only.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    feed: ChangeFeed,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            feed: ChangeFeed::default(),
        }
    }
}

#[derive(FromRow)]
struct QuizRow {
    id: String,
    title: String,
    category: String,
    grade_level: String,
    difficulty: String,
    questions: Json<Vec<Question>>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<QuizRow> for Quiz {
    fn from(row: QuizRow) -> Self {
        Quiz {
            id: row.id,
            title: row.title,
            category: row.category,
            grade_level: row.grade_level,
            difficulty: row.difficulty,
            questions: row.questions.0,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AttemptRow {
    id: String,
    quiz_id: String,
    user_id: String,
    answers: Json<Vec<Option<String>>>,
    correct_count: i64,
    total_questions: i64,
    raw_score: i64,
    score: i64,
    max_score: i64,
    percentage: i16,
    completed_at: DateTime<Utc>,
}

impl TryFrom<AttemptRow> for QuizAttempt {
    type Error = StoreError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(QuizAttempt {
            id: row.id,
            quiz_id: row.quiz_id,
            user_id: row.user_id,
            answers: row.answers.0,
            summary: ScoreSummary {
                correct_count: to_usize(row.correct_count)?,
                total_questions: to_usize(row.total_questions)?,
                raw_score: row.raw_score,
                score: row.score,
                max_score: row.max_score,
                percentage: to_percentage(row.percentage)?,
            },
            completed_at: row.completed_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    topic: String,
    status: String,
    created_at: DateTime<Utc>,
    pre_quiz_completed_at: Option<DateTime<Utc>>,
    studying_at: Option<DateTime<Utc>>,
    study_completed_at: Option<DateTime<Utc>>,
    post_quiz_completed_at: Option<DateTime<Utc>>,
    abandoned_at: Option<DateTime<Utc>>,
    pre_quiz_percentage: Option<i16>,
    post_quiz_percentage: Option<i16>,
}

impl TryFrom<SessionRow> for LearningSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(LearningSession {
            id: row.id,
            user_id: row.user_id,
            topic: parse_topic(&row.topic)?,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            pre_quiz_completed_at: row.pre_quiz_completed_at,
            studying_at: row.studying_at,
            study_completed_at: row.study_completed_at,
            post_quiz_completed_at: row.post_quiz_completed_at,
            abandoned_at: row.abandoned_at,
            pre_quiz_percentage: row.pre_quiz_percentage.map(to_percentage).transpose()?,
            post_quiz_percentage: row.post_quiz_percentage.map(to_percentage).transpose()?,
        })
    }
}

fn parse_topic(raw: &str) -> StoreResult<Topic> {
    raw.parse::<Topic>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse_kind(raw: &str) -> StoreResult<AssessmentKind> {
    raw.parse::<AssessmentKind>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn to_usize(value: i64) -> StoreResult<usize> {
    usize::try_from(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn to_percentage(value: i16) -> StoreResult<u8> {
    u8::try_from(value)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| StoreError::Corrupt(format!("percentage {} out of range", value)))
}

const SESSION_COLUMNS: &str = "id, user_id, topic, status, created_at, pre_quiz_completed_at, \
     studying_at, study_completed_at, post_quiz_completed_at, abandoned_at, \
     pre_quiz_percentage, post_quiz_percentage";

const ATTEMPT_COLUMNS: &str = "id, quiz_id, user_id, answers, correct_count, total_questions, \
     raw_score, score, max_score, percentage, completed_at";

const QUIZ_COLUMNS: &str =
    "id, title, category, grade_level, difficulty, questions, created_by, created_at";

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, path: &str) -> StoreResult<Option<serde_json::Value>> {
        let value = sqlx::query_scalar::<_, Json<serde_json::Value>>(
            "SELECT value FROM documents WHERE path = $1",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.map(|v| v.0))
    }

    async fn set(&self, path: &str, value: serde_json::Value) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (path, value)
            VALUES ($1, $2)
            ON CONFLICT (path) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = NOW()
            "#,
        )
        .bind(path)
        .bind(Json(&value))
        .execute(&self.pool)
        .await?;

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
        if !partial.is_object() {
            return Err(StoreError::InvalidInput(
                "partial update must be a JSON object".to_string(),
            ));
        }

        // jsonb `||` on two objects is a shallow merge.
        let merged = sqlx::query_scalar::<_, Json<serde_json::Value>>(
            r#"
            INSERT INTO documents (path, value)
            VALUES ($1, $2)
            ON CONFLICT (path) DO UPDATE SET
                value = (CASE WHEN jsonb_typeof(documents.value) = 'object'
                              THEN documents.value ELSE '{}'::jsonb END) || EXCLUDED.value,
                updated_at = NOW()
            RETURNING value
            "#,
        )
        .bind(path)
        .bind(Json(&partial))
        .fetch_one(&self.pool)
        .await?
        .0;

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
impl LearningStore for PgStore {
    async fn get_quiz(&self, id: &str) -> StoreResult<Option<Quiz>> {
        let row = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {} FROM quizzes WHERE id = $1",
            QUIZ_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Quiz::from))
    }

    async fn list_quizzes(&self) -> StoreResult<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {} FROM quizzes ORDER BY created_at DESC, id",
            QUIZ_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn create_quiz(&self, quiz: &Quiz) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quizzes (id, title, category, grade_level, difficulty, questions, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&quiz.id)
        .bind(&quiz.title)
        .bind(&quiz.category)
        .bind(&quiz.grade_level)
        .bind(&quiz.difficulty)
        .bind(Json(&quiz.questions))
        .bind(&quiz.created_by)
        .bind(quiz.created_at)
        .execute(&self.pool)
        .await?;

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
        sqlx::query(
            r#"
            INSERT INTO topic_quizzes (topic, kind, quiz_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (topic, kind) DO UPDATE SET quiz_id = EXCLUDED.quiz_id
            "#,
        )
        .bind(assignment.topic.as_str())
        .bind(assignment.kind.as_str())
        .bind(&assignment.quiz_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn topic_quiz(
        &self,
        topic: Topic,
        kind: AssessmentKind,
    ) -> StoreResult<Option<TopicQuiz>> {
        let quiz_id = sqlx::query_scalar::<_, String>(
            "SELECT quiz_id FROM topic_quizzes WHERE topic = $1 AND kind = $2",
        )
        .bind(topic.as_str())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz_id.map(|quiz_id| TopicQuiz {
            topic,
            kind,
            quiz_id,
        }))
    }

    async fn topics_for_quiz(&self, quiz_id: &str) -> StoreResult<Vec<TopicQuiz>> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT topic, kind, quiz_id FROM topic_quizzes WHERE quiz_id = $1",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        let mut slots = rows
            .into_iter()
            .map(|(topic, kind, quiz_id)| {
                Ok(TopicQuiz {
                    topic: parse_topic(&topic)?,
                    kind: parse_kind(&kind)?,
                    quiz_id,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        // Enum order, not text order, so both stores agree.
        slots.sort_by_key(|m| (m.topic, m.kind == AssessmentKind::Post));
        Ok(slots)
    }

    async fn record_attempt(&self, attempt: &QuizAttempt) -> StoreResult<()> {
        let s = &attempt.summary;
        sqlx::query(
            r#"
            INSERT INTO quiz_attempts
                (id, quiz_id, user_id, answers, correct_count, total_questions,
                 raw_score, score, max_score, percentage, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&attempt.id)
        .bind(&attempt.quiz_id)
        .bind(&attempt.user_id)
        .bind(Json(&attempt.answers))
        .bind(s.correct_count as i64)
        .bind(s.total_questions as i64)
        .bind(s.raw_score)
        .bind(s.score)
        .bind(s.max_score)
        .bind(s.percentage as i16)
        .bind(attempt.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_attempt(&self, id: &str) -> StoreResult<Option<QuizAttempt>> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM quiz_attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuizAttempt::try_from).transpose()
    }

    async fn list_attempts(&self, user_id: &str) -> StoreResult<Vec<QuizAttempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM quiz_attempts WHERE user_id = $1 ORDER BY completed_at DESC",
            ATTEMPT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuizAttempt::try_from).collect()
    }

    async fn get_pre_assessment_status(
        &self,
        user_id: &str,
    ) -> StoreResult<BTreeMap<Topic, bool>> {
        let rows = sqlx::query_as::<_, (String, bool)>(
            "SELECT topic, passed FROM pre_assessments WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(topic, passed)| Ok((parse_topic(&topic)?, passed)))
            .collect()
    }

    async fn mark_pre_assessment_passed(&self, user_id: &str, topic: Topic) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pre_assessments (user_id, topic, passed)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (user_id, topic) DO UPDATE SET
                passed = TRUE,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(topic.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_session(&self, session: &LearningSession) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO learning_sessions ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            SESSION_COLUMNS
        ))
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.topic.as_str())
        .bind(session.status.as_str())
        .bind(session.created_at)
        .bind(session.pre_quiz_completed_at)
        .bind(session.studying_at)
        .bind(session.study_completed_at)
        .bind(session.post_quiz_completed_at)
        .bind(session.abandoned_at)
        .bind(session.pre_quiz_percentage.map(i16::from))
        .bind(session.post_quiz_percentage.map(i16::from))
        .execute(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => StoreError::Conflict(format!(
                "an active {} session already exists",
                session.topic
            )),
            other => other,
        })?;
        Ok(())
    }

    async fn active_session(
        &self,
        user_id: &str,
        topic: Topic,
    ) -> StoreResult<Option<LearningSession>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM learning_sessions \
             WHERE user_id = $1 AND topic = $2 \
               AND status NOT IN ('post_quiz_completed', 'abandoned')",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(topic.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(LearningSession::try_from).transpose()
    }

    async fn save_transition(
        &self,
        session: &LearningSession,
        from: SessionStatus,
    ) -> StoreResult<()> {
        check_transition(from, session.status)?;

        let result = sqlx::query(
            r#"
            UPDATE learning_sessions SET
                status = $1,
                pre_quiz_completed_at = $2,
                studying_at = $3,
                study_completed_at = $4,
                post_quiz_completed_at = $5,
                abandoned_at = $6,
                pre_quiz_percentage = $7,
                post_quiz_percentage = $8
            WHERE id = $9 AND status = $10
            "#,
        )
        .bind(session.status.as_str())
        .bind(session.pre_quiz_completed_at)
        .bind(session.studying_at)
        .bind(session.study_completed_at)
        .bind(session.post_quiz_completed_at)
        .bind(session.abandoned_at)
        .bind(session.pre_quiz_percentage.map(i16::from))
        .bind(session.post_quiz_percentage.map(i16::from))
        .bind(&session.id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "session {} is no longer {}",
                session.id, from
            )));
        }
        Ok(())
    }

    async fn session_history(
        &self,
        user_id: &str,
        topic: Topic,
    ) -> StoreResult<Vec<LearningSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM learning_sessions \
             WHERE user_id = $1 AND topic = $2 \
               AND status IN ('post_quiz_completed', 'abandoned') \
             ORDER BY created_at ASC",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(topic.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LearningSession::try_from).collect()
    }

    async fn completed_topics(&self, user_id: &str) -> StoreResult<BTreeSet<Topic>> {
        let topics = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT topic FROM learning_sessions
            WHERE user_id = $1 AND status = 'post_quiz_completed'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        topics.iter().map(|t| parse_topic(t)).collect()
    }

    async fn is_certificate_eligible(&self, user_id: &str) -> StoreResult<bool> {
        let completed = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT topic) FROM learning_sessions
            WHERE user_id = $1 AND status = 'post_quiz_completed'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(completed >= Topic::ALL.len() as i64)
    }
}
