use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivityType {
    #[serde(rename = "Module Viewed")]
    ModuleViewed,
    #[serde(rename = "Quiz Attempted")]
    QuizAttempted,
    #[serde(rename = "Badge Earned")]
    BadgeEarned,
    #[serde(rename = "Quests Completed")]
    QuestsCompleted,
}

/// Activity journal entry, stored in `user_progress`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProgressLog {
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
    pub activity_type: ActivityType,
    #[validate(length(min = 1, message = "Related id is required"))]
    pub related_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
