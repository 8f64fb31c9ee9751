// src/models/topic.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A biodiversity subject around which a lesson and its quizzes are organized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Tiger,
    Tapir,
    Turtle,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Tiger, Topic::Tapir, Topic::Turtle];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Tiger => "tiger",
            Topic::Tapir => "tapir",
            Topic::Turtle => "turtle",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tiger" => Ok(Topic::Tiger),
            "tapir" => Ok(Topic::Tapir),
            "turtle" => Ok(Topic::Turtle),
            other => Err(AppError::BadRequest(format!("Unknown topic '{}'", other))),
        }
    }
}

/// Whether a quiz is taken before or after the lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentKind {
    Pre,
    Post,
}

impl AssessmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentKind::Pre => "pre",
            AssessmentKind::Post => "post",
        }
    }
}

impl FromStr for AssessmentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre" => Ok(AssessmentKind::Pre),
            "post" => Ok(AssessmentKind::Post),
            other => Err(AppError::BadRequest(format!(
                "Unknown assessment kind '{}'",
                other
            ))),
        }
    }
}

/// Row of the topic → quiz lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicQuiz {
    pub topic: Topic,
    pub kind: AssessmentKind,
    pub quiz_id: String,
}

/// DTO for assigning the pre and post quizzes of a topic. Absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct AssignTopicQuizzesRequest {
    pub pre_quiz_id: Option<String>,
    pub post_quiz_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_round_trips_through_str() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
        assert!("elephant".parse::<Topic>().is_err());
    }
}
