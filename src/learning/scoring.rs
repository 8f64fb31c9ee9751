// src/learning/scoring.rs

use serde::{Deserialize, Serialize};

use crate::models::question::Question;

/// Outcome of scoring one set of answers against a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub correct_count: usize,
    pub total_questions: usize,
    /// Points minus penalties, before clamping. May be negative.
    pub raw_score: i64,
    /// `raw_score` clamped to `[0, max_score]`.
    pub score: i64,
    pub max_score: i64,
    /// `round(score / max_score * 100)`, or 0 for a quiz worth nothing.
    pub percentage: u8,
}

/// Scores `answers` against `questions`, pairing them by index.
///
/// Missing or `None` answers are unanswered and never count as correct.
/// A wrong or unanswered question deducts its penalty, if any.
pub fn score(questions: &[Question], answers: &[Option<String>]) -> ScoreSummary {
    let mut raw_score: i64 = 0;
    let mut correct_count = 0;

    for (idx, question) in questions.iter().enumerate() {
        let selected = answers.get(idx).and_then(|a| a.as_deref());

        if selected == Some(question.correct_answer.as_str()) {
            raw_score += question.points as i64;
            correct_count += 1;
        } else if question.penalty > 0 {
            raw_score -= question.penalty as i64;
        }
    }

    let max_score: i64 = questions.iter().map(|q| q.points as i64).sum();
    let score = raw_score.clamp(0, max_score);

    ScoreSummary {
        correct_count,
        total_questions: questions.len(),
        raw_score,
        score,
        max_score,
        percentage: percentage(score, max_score),
    }
}

fn percentage(score: i64, max_score: i64) -> u8 {
    if max_score <= 0 {
        return 0;
    }
    let pct = (score as f64 / max_score as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
