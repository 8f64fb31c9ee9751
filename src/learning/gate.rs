// src/learning/gate.rs

//! Pre-assessment gate: may a learner open a topic's lesson?

use std::collections::BTreeMap;

use crate::{
    learning::scoring::ScoreSummary,
    models::topic::Topic,
    store::{LearningStore, StoreResult},
};

/// Reads the stored flag. Store failures propagate; they never read as locked.
pub async fn is_unlocked(
    store: &dyn LearningStore,
    user_id: &str,
    topic: Topic,
) -> StoreResult<bool> {
    let status = store.get_pre_assessment_status(user_id).await?;
    Ok(status.get(&topic).copied().unwrap_or(false))
}

/// Flag per topic, with every topic present.
pub async fn pre_assessment_status(
    store: &dyn LearningStore,
    user_id: &str,
) -> StoreResult<BTreeMap<Topic, bool>> {
    let stored = store.get_pre_assessment_status(user_id).await?;
    Ok(Topic::ALL
        .iter()
        .map(|topic| (*topic, stored.get(topic).copied().unwrap_or(false)))
        .collect())
}

/// Unlocks `topic` when the pre-quiz result reaches `passing_percentage`.
///
/// Returns whether the topic is unlocked afterwards. A failing result never
/// locks a topic that is already unlocked.
pub async fn record_pre_quiz_result(
    store: &dyn LearningStore,
    user_id: &str,
    topic: Topic,
    summary: &ScoreSummary,
    passing_percentage: u8,
) -> StoreResult<bool> {
    if summary.percentage >= passing_percentage {
        store.mark_pre_assessment_passed(user_id, topic).await?;
        tracing::info!(
            "User {} unlocked {} with {}%",
            user_id,
            topic,
            summary.percentage
        );
        return Ok(true);
    }
    is_unlocked(store, user_id, topic).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};

    fn summary(percentage: u8) -> ScoreSummary {
        ScoreSummary {
            correct_count: 0,
            total_questions: 1,
            raw_score: percentage as i64,
            score: percentage as i64,
            max_score: 100,
            percentage,
        }
    }

    #[tokio::test]
    async fn test_locked_until_passing_result() {
        let store = MemoryStore::new();

        assert!(!is_unlocked(&store, "u1", Topic::Tiger).await.unwrap());

        let unlocked = record_pre_quiz_result(&store, "u1", Topic::Tiger, &summary(40), 60)
            .await
            .unwrap();
        assert!(!unlocked);
        assert!(!is_unlocked(&store, "u1", Topic::Tiger).await.unwrap());

        let unlocked = record_pre_quiz_result(&store, "u1", Topic::Tiger, &summary(60), 60)
            .await
            .unwrap();
        assert!(unlocked);
        assert!(is_unlocked(&store, "u1", Topic::Tiger).await.unwrap());
        assert!(!is_unlocked(&store, "u1", Topic::Tapir).await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_retake_keeps_topic_unlocked() {
        let store = MemoryStore::new();
        record_pre_quiz_result(&store, "u1", Topic::Turtle, &summary(100), 50)
            .await
            .unwrap();

        let unlocked = record_pre_quiz_result(&store, "u1", Topic::Turtle, &summary(0), 50)
            .await
            .unwrap();
        assert!(unlocked);
    }

    #[tokio::test]
    async fn test_status_lists_every_topic() {
        let store = MemoryStore::new();
        store
            .mark_pre_assessment_passed("u1", Topic::Tapir)
            .await
            .unwrap();

        let status = pre_assessment_status(&store, "u1").await.unwrap();
        assert_eq!(status.len(), 3);
        assert_eq!(status[&Topic::Tapir], true);
        assert_eq!(status[&Topic::Tiger], false);
    }

    #[tokio::test]
    async fn test_backend_failure_is_not_locked() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let result = is_unlocked(&store, "u1", Topic::Tiger).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
