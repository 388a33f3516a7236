use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use super::Record;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SportCategory {
    Athletics,
    Swimming,
    Cricket,
    Basketball,
    Football,
    Tennis,
    Boxing,
    Wrestling,
    Gymnastics,
    Volleyball,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgeGroup {
    #[serde(rename = "Under-16")]
    Under16,
    #[serde(rename = "Under-18")]
    Under18,
    Adult,
}

/// Access level carried by a user's token. Sign-up always yields a student;
/// admins are provisioned directly in the store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// One graded quiz attempt. A user's history holds at most one passed
/// entry per quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizAttemptRecord {
    pub quiz_id: String,
    pub score: f64,
    pub passed: bool,
    pub timestamp: String,
}

/// User record stored in the "users" collection, keyed by identity subject.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct User {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub points: i64,
    #[serde(default = "first_level")]
    pub level: i64,
    #[serde(default)]
    pub rank: i64,
    pub sport: SportCategory,
    pub age_group: AgeGroup,
    #[serde(default)]
    pub completed_modules: BTreeSet<String>,
    #[serde(default)]
    pub quiz_scores: Vec<QuizAttemptRecord>,
    #[serde(default)]
    pub badges: BTreeSet<String>,
    #[serde(default)]
    pub role: Role,
}

fn first_level() -> i64 {
    1
}

pub fn level_for_points(points: i64) -> i64 {
    points.max(0) / 100 + 1
}

impl User {
    pub fn has_passed(&self, quiz_id: &str) -> bool {
        self.quiz_scores
            .iter()
            .any(|attempt| attempt.passed && attempt.quiz_id == quiz_id)
    }

    pub fn failed_attempts(&self, quiz_id: &str) -> usize {
        self.quiz_scores
            .iter()
            .filter(|attempt| !attempt.passed && attempt.quiz_id == quiz_id)
            .count()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Identity subject; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: String,
    pub age_group: AgeGroup,
    pub sport: SportCategory,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub age_group: Option<AgeGroup>,
    pub sport: Option<SportCategory>,
}

#[derive(Debug, Deserialize)]
pub struct UserFilterQuery {
    pub sport: Option<String>,
    pub age_group: Option<String>,
}

/// User returned to clients (no credential hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub points: i64,
    pub level: i64,
    pub rank: i64,
    pub sport: SportCategory,
    pub age_group: AgeGroup,
    pub completed_modules: BTreeSet<String>,
    pub quiz_scores: Vec<QuizAttemptRecord>,
    pub badges: BTreeSet<String>,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Record<User>> for UserProfile {
    fn from(record: Record<User>) -> Self {
        let user = record.data;
        Self {
            id: record.id,
            name: user.name,
            email: user.email,
            points: user.points,
            level: user.level,
            rank: user.rank,
            sport: user.sport,
            age_group: user.age_group,
            completed_modules: user.completed_modules,
            quiz_scores: user.quiz_scores,
            badges: user.badges,
            role: user.role,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProgress {
    pub points: i64,
    pub level: i64,
    pub rank: i64,
    pub completed_modules: BTreeSet<String>,
    pub quiz_scores: Vec<QuizAttemptRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub points: i64,
    pub level: i64,
    pub rank: i64,
    pub sport: SportCategory,
    pub age_group: AgeGroup,
}

impl From<Record<User>> for LeaderboardEntry {
    fn from(record: Record<User>) -> Self {
        Self {
            id: record.id,
            name: record.data.name,
            points: record.data.points,
            level: record.data.level,
            rank: record.data.rank,
            sport: record.data.sport,
            age_group: record.data.age_group,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub count: usize,
    pub users: Vec<UserProfile>,
}
