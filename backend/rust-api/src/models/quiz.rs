use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::Record;

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_option: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Quiz {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
    /// Logical module id or store id of the owning module.
    #[validate(length(min = 1, message = "Module id is required"))]
    pub module_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[validate(range(min = 0.0, max = 100.0, message = "Passing score must be between 0 and 100"))]
    pub passing_score: f64,
    #[validate(range(min = 1, message = "Attempt limit must be at least 1"))]
    pub attempt_limit: i64,
    #[validate(
        length(min = 1, message = "At least one question is required"),
        custom(function = "validate_questions")
    )]
    pub questions: Vec<Question>,
}

fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    for q in questions {
        if q.question_id.trim().is_empty() || q.question_text.trim().is_empty() {
            return Err(ValidationError::new("question")
                .with_message("Every question needs an id and text".into()));
        }
        if q.options.len() != OPTIONS_PER_QUESTION {
            return Err(ValidationError::new("options").with_message(
                format!("Question {} must have exactly 4 options", q.question_id).into(),
            ));
        }
        if !q.options.contains(&q.correct_option) {
            return Err(ValidationError::new("correct_option").with_message(
                format!(
                    "Correct option of question {} must be one of its options",
                    q.question_id
                )
                .into(),
            ));
        }
    }
    Ok(())
}

/// Question as shown before an attempt: no answer, no explanation.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub question_id: String,
    pub question_text: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicQuiz {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
    pub module_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub passing_score: f64,
    pub attempt_limit: i64,
    pub questions: Vec<PublicQuestion>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Record<Quiz>> for PublicQuiz {
    fn from(record: Record<Quiz>) -> Self {
        let quiz = record.data;
        Self {
            id: record.id,
            quiz_id: quiz.quiz_id,
            module_id: quiz.module_id,
            title: quiz.title,
            passing_score: quiz.passing_score,
            attempt_limit: quiz.attempt_limit,
            questions: quiz
                .questions
                .into_iter()
                .map(|q| PublicQuestion {
                    question_id: q.question_id,
                    question_text: q.question_text,
                    options: q.options,
                })
                .collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub selected_option: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// Defaults to the authenticated caller.
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmitQuizResponse {
    /// Percentage, rounded to two decimals.
    pub score: f64,
    pub passed: bool,
    pub points_earned: i64,
}
