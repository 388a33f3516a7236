use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use super::empty_as_none;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QuestType {
    Daily,
    Weekly,
    Special,
}

/// Lifecycle state, set by administrators. Wire names keep their
/// historical casing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QuestStatus {
    #[serde(rename = "Active")]
    Active,
    #[serde(rename = "upcoming")]
    Upcoming,
    #[serde(rename = "expired")]
    Expired,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Active => "Active",
            QuestStatus::Upcoming => "upcoming",
            QuestStatus::Expired => "expired",
        }
    }
}

impl FromStr for QuestStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "active" => Ok(QuestStatus::Active),
            "upcoming" => Ok(QuestStatus::Upcoming),
            "expired" => Ok(QuestStatus::Expired),
            _ => Err(format!("Invalid quest status: {}", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Quest {
    #[validate(length(min = 1, message = "Quest id is required"))]
    pub quest_id: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(rename = "type")]
    pub quest_type: QuestType,
    #[validate(range(min = 0, message = "Reward points cannot be negative"))]
    pub reward_points: i64,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub badge_reward: Option<String>,
    pub status: QuestStatus,
}

#[derive(Debug, Deserialize)]
pub struct QuestListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuestStatusRequest {
    pub status: QuestStatus,
}
