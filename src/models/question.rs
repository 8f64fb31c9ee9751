// src/models/question.rs

use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::{config::DEFAULT_QUESTION_POINTS, utils::html::clean_html};

/// A single multiple-choice question, stored inline in its quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// The text content of the question.
    pub text: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    pub options: Vec<String>,

    /// The correct option. Always one of `options`.
    pub correct_answer: String,

    pub image_url: Option<String>,

    /// Points awarded for a correct answer.
    #[serde(default = "default_points")]
    pub points: u32,

    /// Points deducted for a wrong or missing answer.
    #[serde(default)]
    pub penalty: u32,
}

fn default_points() -> u32 {
    DEFAULT_QUESTION_POINTS
}

/// DTO for sending question to client (excludes the correct answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub image_url: Option<String>,
    pub points: u32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            text: q.text.clone(),
            options: q.options.clone(),
            image_url: q.image_url.clone(),
            points: q.points,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(custom(function = validate_image_url))]
    pub image_url: Option<String>,
    #[validate(range(max = 1000))]
    pub points: Option<u32>,
    #[validate(range(max = 1000))]
    pub penalty: Option<u32>,
}

impl CreateQuestionRequest {
    /// Builds the stored question, sanitizing free text.
    /// Fails when the correct answer is not one of the options.
    pub fn into_question(self) -> Result<Question, String> {
        let options: Vec<String> = self.options.iter().map(|o| clean_html(o)).collect();
        let correct_answer = clean_html(&self.correct_answer);

        if !options.contains(&correct_answer) {
            return Err(format!(
                "Correct answer '{}' is not one of the options",
                correct_answer
            ));
        }

        Ok(Question {
            text: clean_html(&self.text),
            options,
            correct_answer,
            image_url: self.image_url,
            points: self.points.unwrap_or(DEFAULT_QUESTION_POINTS),
            penalty: self.penalty.unwrap_or(0),
        })
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("options_need_at_least_two"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("option_length_invalid"));
        }
    }
    Ok(())
}

fn validate_image_url(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_image_url"));
    }
    Ok(())
}
