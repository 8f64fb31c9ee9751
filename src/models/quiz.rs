// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{CreateQuestionRequest, PublicQuestion, Question};

/// A quiz with its ordered questions. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub category: String,
    pub grade_level: String,
    /// Difficulty label, e.g. 'easy', 'medium', 'hard'.
    pub difficulty: String,
    pub questions: Vec<Question>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn max_score(&self) -> i64 {
        self.questions.iter().map(|q| q.points as i64).sum()
    }
}

/// DTO for sending a quiz to learners (answer keys removed).
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: String,
    pub title: String,
    pub category: String,
    pub grade_level: String,
    pub difficulty: String,
    pub questions: Vec<PublicQuestion>,
    pub max_score: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            category: quiz.category.clone(),
            grade_level: quiz.grade_level.clone(),
            difficulty: quiz.difficulty.clone(),
            questions: quiz.questions.iter().map(PublicQuestion::from).collect(),
            max_score: quiz.max_score(),
            created_at: quiz.created_at,
        }
    }
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(min = 1, max = 50))]
    pub grade_level: String,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,
    #[validate(length(min = 1, max = 100), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

fn validate_difficulty(difficulty: &str) -> Result<(), validator::ValidationError> {
    match difficulty {
        "easy" | "medium" | "hard" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_difficulty")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question_count: usize) -> CreateQuizRequest {
        let questions = (0..question_count)
            .map(|i| CreateQuestionRequest {
                text: format!("Question {}", i + 1),
                options: vec!["Yes".to_string(), "No".to_string()],
                correct_answer: "Yes".to_string(),
                image_url: None,
                points: None,
                penalty: None,
            })
            .collect();

        CreateQuizRequest {
            title: "Tapir Basics".to_string(),
            category: "mammals".to_string(),
            grade_level: "primary-4".to_string(),
            difficulty: "easy".to_string(),
            questions,
        }
    }

    #[test]
    fn test_question_count_is_bounded() {
        assert!(request(1).validate().is_ok());
        assert!(request(0).validate().is_err());
        assert!(request(101).validate().is_err());
    }

    #[test]
    fn test_nested_question_errors_surface() {
        let mut req = request(2);
        req.questions[1].options = vec!["Only".to_string()];
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_unknown_difficulty_rejected() {
        let mut req = request(1);
        req.difficulty = "extreme".to_string();
        assert!(req.validate().is_err());
    }
}
