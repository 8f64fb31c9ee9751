// src/learning/certificate.rs

use serde::Serialize;

use crate::{
    models::topic::Topic,
    store::{LearningStore, StoreResult},
};

/// Completion summary behind the certificate screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateStatus {
    pub eligible: bool,
    pub completed_topics: Vec<Topic>,
    pub missing_topics: Vec<Topic>,
}

pub async fn certificate_status(
    store: &dyn LearningStore,
    user_id: &str,
) -> StoreResult<CertificateStatus> {
    let completed = store.completed_topics(user_id).await?;
    let eligible = store.is_certificate_eligible(user_id).await?;

    let (completed_topics, missing_topics): (Vec<Topic>, Vec<Topic>) = Topic::ALL
        .into_iter()
        .partition(|topic| completed.contains(topic));

    Ok(CertificateStatus {
        eligible,
        completed_topics,
        missing_topics,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        models::session::{LearningSession, SessionEvent, SessionStatus},
        store::MemoryStore,
    };

    async fn complete(store: &MemoryStore, user_id: &str, topic: Topic) {
        let now = Utc::now();
        let mut session = LearningSession::new(user_id, topic, now);
        store.insert_session(&session).await.unwrap();
        for event in [
            SessionEvent::CompletePreQuiz { attempt_id: None },
            SessionEvent::StartStudy,
            SessionEvent::CompleteStudy,
            SessionEvent::CompletePostQuiz { attempt_id: None },
        ] {
            let from = session.status;
            session.advance(&event, now).unwrap();
            store.save_transition(&session, from).await.unwrap();
        }
        assert_eq!(session.status, SessionStatus::PostQuizCompleted);
    }

    #[tokio::test]
    async fn test_eligible_after_every_topic() {
        let store = MemoryStore::new();

        complete(&store, "u1", Topic::Tiger).await;
        complete(&store, "u1", Topic::Tapir).await;

        let status = certificate_status(&store, "u1").await.unwrap();
        assert!(!status.eligible);
        assert_eq!(status.completed_topics, vec![Topic::Tiger, Topic::Tapir]);
        assert_eq!(status.missing_topics, vec![Topic::Turtle]);

        complete(&store, "u1", Topic::Turtle).await;
        let status = certificate_status(&store, "u1").await.unwrap();
        assert!(status.eligible);
        assert!(status.missing_topics.is_empty());

        // Other users are unaffected.
        assert!(!certificate_status(&store, "u2").await.unwrap().eligible);
    }

    #[tokio::test]
    async fn test_abandoned_sessions_do_not_count() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut session = LearningSession::new("u1", Topic::Tiger, now);
        store.insert_session(&session).await.unwrap();
        let from = session.status;
        session.abandon(now).unwrap();
        store.save_transition(&session, from).await.unwrap();

        let status = certificate_status(&store, "u1").await.unwrap();
        assert!(status.completed_topics.is_empty());
    }
}
