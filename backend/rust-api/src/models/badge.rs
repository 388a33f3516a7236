use serde::{Deserialize, Serialize};
use validator::Validate;

/// Achievement marker. `unlock_criteria` is display text only; unlocking
/// is decided by the badge rules in the quiz engine.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Badge {
    #[validate(length(min = 1, message = "Badge id is required"))]
    pub badge_id: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "Icon URL is required"))]
    pub icon_url: String,
    #[validate(length(min = 1, message = "Unlock criteria is required"))]
    pub unlock_criteria: String,
}
