use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use super::user::QuizAttemptRecord;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Infographic,
    Quiz,
    Text,
    Interactive,
}

/// Unit of educational content, optionally followed by a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Module {
    /// Logical identifier referenced by quizzes (e.g. `module_001`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub content_type: ContentType,
    #[validate(length(min = 1, message = "Content URL is required"))]
    pub content_url: String,
    /// Minutes.
    #[validate(range(min = 1, message = "Estimated time must be at least 1"))]
    pub estimated_time: i64,
    #[validate(range(min = 1, message = "Required level must be at least 1"))]
    pub level_required: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModuleListQuery {
    /// Only modules unlocked at this level.
    pub level: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ModuleProgress {
    pub completed_modules: BTreeSet<String>,
    pub quiz_scores: Vec<QuizAttemptRecord>,
}
