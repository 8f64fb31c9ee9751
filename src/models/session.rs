// src/models/session.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::topic::Topic;

/// Position of a learner within a topic.
///
/// The linear order is `Started → PreQuizCompleted → Studying → StudyCompleted →
/// PostQuizCompleted`. `Abandoned` is a side exit reachable from any active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Started,
    PreQuizCompleted,
    Studying,
    StudyCompleted,
    PostQuizCompleted,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Started => "started",
            SessionStatus::PreQuizCompleted => "pre_quiz_completed",
            SessionStatus::Studying => "studying",
            SessionStatus::StudyCompleted => "study_completed",
            SessionStatus::PostQuizCompleted => "post_quiz_completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            SessionStatus::PostQuizCompleted | SessionStatus::Abandoned
        )
    }

    /// The next state in the linear sequence, if any.
    pub fn successor(&self) -> Option<SessionStatus> {
        match self {
            SessionStatus::Started => Some(SessionStatus::PreQuizCompleted),
            SessionStatus::PreQuizCompleted => Some(SessionStatus::Studying),
            SessionStatus::Studying => Some(SessionStatus::StudyCompleted),
            SessionStatus::StudyCompleted => Some(SessionStatus::PostQuizCompleted),
            SessionStatus::PostQuizCompleted | SessionStatus::Abandoned => None,
        }
    }

    /// Every edge a store may accept: one linear step, or abandoning an active session.
    pub fn can_transition_to(&self, to: SessionStatus) -> bool {
        if to == SessionStatus::Abandoned {
            return self.is_active();
        }
        self.successor() == Some(to)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(SessionStatus::Started),
            "pre_quiz_completed" => Ok(SessionStatus::PreQuizCompleted),
            "studying" => Ok(SessionStatus::Studying),
            "study_completed" => Ok(SessionStatus::StudyCompleted),
            "post_quiz_completed" => Ok(SessionStatus::PostQuizCompleted),
            "abandoned" => Ok(SessionStatus::Abandoned),
            other => Err(format!("unknown session status '{}'", other)),
        }
    }
}

/// A request to move a session one step forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    CompletePreQuiz {
        #[serde(default)]
        attempt_id: Option<String>,
    },
    StartStudy,
    CompleteStudy,
    CompletePostQuiz {
        #[serde(default)]
        attempt_id: Option<String>,
    },
}

impl SessionEvent {
    /// The status this event leads to.
    pub fn target(&self) -> SessionStatus {
        match self {
            SessionEvent::CompletePreQuiz { .. } => SessionStatus::PreQuizCompleted,
            SessionEvent::StartStudy => SessionStatus::Studying,
            SessionEvent::CompleteStudy => SessionStatus::StudyCompleted,
            SessionEvent::CompletePostQuiz { .. } => SessionStatus::PostQuizCompleted,
        }
    }

    pub fn attempt_id(&self) -> Option<&str> {
        match self {
            SessionEvent::CompletePreQuiz { attempt_id }
            | SessionEvent::CompletePostQuiz { attempt_id } => attempt_id.as_deref(),
            _ => None,
        }
    }
}

/// Returned when a requested transition is not the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move session from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// Per-user, per-topic progress record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningSession {
    pub id: String,
    pub user_id: String,
    pub topic: Topic,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub pre_quiz_completed_at: Option<DateTime<Utc>>,
    pub studying_at: Option<DateTime<Utc>>,
    pub study_completed_at: Option<DateTime<Utc>>,
    pub post_quiz_completed_at: Option<DateTime<Utc>>,
    pub abandoned_at: Option<DateTime<Utc>>,
    /// Percentage of the pre-quiz attempt linked to this session.
    pub pre_quiz_percentage: Option<u8>,
    /// Percentage of the post-quiz attempt linked to this session.
    pub post_quiz_percentage: Option<u8>,
}

impl LearningSession {
    pub fn new(user_id: &str, topic: Topic, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            topic,
            status: SessionStatus::Started,
            created_at: now,
            pre_quiz_completed_at: None,
            studying_at: None,
            study_completed_at: None,
            post_quiz_completed_at: None,
            abandoned_at: None,
            pre_quiz_percentage: None,
            post_quiz_percentage: None,
        }
    }

    /// Applies `event`, stamping the transition time.
    pub fn advance(
        &mut self,
        event: &SessionEvent,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        let to = event.target();
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }

        match to {
            SessionStatus::PreQuizCompleted => self.pre_quiz_completed_at = Some(now),
            SessionStatus::Studying => self.studying_at = Some(now),
            SessionStatus::StudyCompleted => self.study_completed_at = Some(now),
            SessionStatus::PostQuizCompleted => self.post_quiz_completed_at = Some(now),
            SessionStatus::Started | SessionStatus::Abandoned => {}
        }
        self.status = to;
        Ok(())
    }

    /// Side exit out of the linear sequence.
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
        if !self.status.is_active() {
            return Err(InvalidTransition {
                from: self.status,
                to: SessionStatus::Abandoned,
            });
        }
        self.status = SessionStatus::Abandoned;
        self.abandoned_at = Some(now);
        Ok(())
    }

    /// Post-quiz percentage minus pre-quiz percentage, when both are known.
    pub fn improvement(&self) -> Option<i16> {
        match (self.pre_quiz_percentage, self.post_quiz_percentage) {
            (Some(pre), Some(post)) => Some(post as i16 - pre as i16),
            _ => None,
        }
    }
}

/// History entry with the derived score delta.
#[derive(Debug, Serialize)]
pub struct SessionHistoryEntry {
    #[serde(flatten)]
    pub session: LearningSession,
    pub improvement: Option<i16>,
}

/// DTO for abandon-and-restart. The client must confirm discarding progress.
#[derive(Debug, Default, Deserialize)]
pub struct RestartSessionRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk() -> [SessionEvent; 4] {
        [
            SessionEvent::CompletePreQuiz { attempt_id: None },
            SessionEvent::StartStudy,
            SessionEvent::CompleteStudy,
            SessionEvent::CompletePostQuiz { attempt_id: None },
        ]
    }

    #[test]
    fn test_linear_walk_visits_states_in_order() {
        let now = Utc::now();
        let mut session = LearningSession::new("u1", Topic::Tiger, now);
        let mut seen = vec![session.status];

        for event in walk() {
            session.advance(&event, now).unwrap();
            seen.push(session.status);
        }

        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(session.status, SessionStatus::PostQuizCompleted);
        assert!(session.pre_quiz_completed_at.is_some());
        assert!(session.studying_at.is_some());
        assert!(session.study_completed_at.is_some());
        assert!(session.post_quiz_completed_at.is_some());
        assert!(!session.status.is_active());
    }

    #[test]
    fn test_skipping_a_step_is_rejected() {
        let now = Utc::now();
        let mut session = LearningSession::new("u1", Topic::Tapir, now);

        let err = session.advance(&SessionEvent::StartStudy, now).unwrap_err();
        assert_eq!(err.from, SessionStatus::Started);
        assert_eq!(err.to, SessionStatus::Studying);
        assert_eq!(session.status, SessionStatus::Started);
        assert!(session.studying_at.is_none());
    }

    #[test]
    fn test_repeating_a_step_is_rejected() {
        let now = Utc::now();
        let mut session = LearningSession::new("u1", Topic::Turtle, now);
        let event = SessionEvent::CompletePreQuiz { attempt_id: None };

        session.advance(&event, now).unwrap();
        assert!(session.advance(&event, now).is_err());
    }

    #[test]
    fn test_terminal_sessions_cannot_be_abandoned() {
        let now = Utc::now();
        let mut session = LearningSession::new("u1", Topic::Tiger, now);
        for event in walk() {
            session.advance(&event, now).unwrap();
        }
        assert!(session.abandon(now).is_err());

        let mut active = LearningSession::new("u1", Topic::Tiger, now);
        active.abandon(now).unwrap();
        assert_eq!(active.status, SessionStatus::Abandoned);
        assert!(active.abandon(now).is_err());
    }

    #[test]
    fn test_transition_table() {
        use SessionStatus::*;
        assert!(Started.can_transition_to(PreQuizCompleted));
        assert!(StudyCompleted.can_transition_to(PostQuizCompleted));
        assert!(Studying.can_transition_to(Abandoned));
        assert!(!Started.can_transition_to(PostQuizCompleted));
        assert!(!PreQuizCompleted.can_transition_to(Started));
        assert!(!PostQuizCompleted.can_transition_to(Abandoned));
        assert!(!Abandoned.can_transition_to(Started));
    }

    #[test]
    fn test_event_wire_format() {
        let event: SessionEvent =
            serde_json::from_str(r#"{"event":"complete_pre_quiz","attempt_id":"a1"}"#).unwrap();
        assert_eq!(event.attempt_id(), Some("a1"));

        let event: SessionEvent = serde_json::from_str(r#"{"event":"start_study"}"#).unwrap();
        assert_eq!(event, SessionEvent::StartStudy);
    }

    #[test]
    fn test_improvement_needs_both_scores() {
        let mut session = LearningSession::new("u1", Topic::Tiger, Utc::now());
        session.pre_quiz_percentage = Some(40);
        assert_eq!(session.improvement(), None);
        session.post_quiz_percentage = Some(90);
        assert_eq!(session.improvement(), Some(50));
    }
}
