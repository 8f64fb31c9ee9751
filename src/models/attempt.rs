// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{learning::scoring::ScoreSummary, models::topic::Topic};

/// One completed quiz attempt. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    /// Selected option per question index; `None` when left unanswered.
    pub answers: Vec<Option<String>>,
    #[serde(flatten)]
    pub summary: ScoreSummary,
    pub completed_at: DateTime<Utc>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    /// User's answers, in question order.
    /// Missing or null entries are treated as unanswered.
    pub answers: Vec<Option<String>>,
}

/// Response returned after an attempt has been scored and stored.
#[derive(Debug, Serialize)]
pub struct AttemptResponse {
    pub attempt_id: String,
    #[serde(flatten)]
    pub summary: ScoreSummary,
    /// Topics whose pre-quiz this was and whose lesson is now unlocked.
    pub unlocked_topics: Vec<Topic>,
}
