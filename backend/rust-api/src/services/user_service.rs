use bcrypt::{hash, verify};
use mongodb::bson::{to_bson, Bson, Document};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    user::{
        CreateUserRequest, LeaderboardEntry, LoginRequest, QuizAttemptRecord, Role,
        UpdateProfileRequest, User, UserFilterQuery, UserProfile, UserProgress,
    },
    Record,
};
use crate::repository::Repository;
use crate::store::{DocumentStore, Query, SortDirection, StoreError, ID_FIELD};

pub const LEADERBOARD_SIZE: i64 = 10;

pub struct UserService {
    users: Repository<User>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, bcrypt_cost: u32) -> Self {
        Self {
            users: Repository::new(store),
            bcrypt_cost,
        }
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        hash(password, self.bcrypt_cost)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    pub async fn create_user(&self, req: CreateUserRequest) -> AppResult<UserProfile> {
        req.validate()?;

        if self.users.find_one_by("email", &req.email).await?.is_some() {
            tracing::warn!("Rejected sign-up for existing email {}", req.email);
            return Err(AppError::Validation("User already exists".to_string()));
        }

        let id = match req.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                if self.users.find_by_id(&id).await?.is_some() {
                    return Err(AppError::Validation("User already exists".to_string()));
                }
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        let user = User {
            name: req.name,
            email: req.email,
            password_hash: self.hash_password(&req.password)?,
            points: 0,
            level: 1,
            rank: 0,
            sport: req.sport,
            age_group: req.age_group,
            completed_modules: BTreeSet::new(),
            quiz_scores: Vec::new(),
            badges: BTreeSet::new(),
            role: Role::Student,
        };

        let record = self.users.create_with_id(&id, user).await?;
        tracing::info!("User created: {}", record.id);
        Ok(record.into())
    }

    /// Checks an email/password pair. Unknown emails and wrong passwords
    /// are indistinguishable to the caller.
    pub async fn login(&self, req: LoginRequest) -> AppResult<UserProfile> {
        req.validate()?;
        let invalid = || AppError::Validation("Invalid credentials".to_string());

        let Some(record) = self.users.find_one_by("email", &req.email).await? else {
            tracing::warn!("Login attempt for unknown email");
            return Err(invalid());
        };

        let matches = verify(&req.password, &record.data.password_hash).unwrap_or(false);
        if !matches {
            tracing::warn!("Login failed for user {}", record.id);
            return Err(invalid());
        }

        tracing::info!("User logged in: {}", record.id);
        Ok(record.into())
    }

    async fn user(&self, id: &str) -> AppResult<Record<User>> {
        self.users.get(id).await
    }

    pub async fn get_profile(&self, id: &str) -> AppResult<UserProfile> {
        Ok(self.user(id).await?.into())
    }

    pub async fn update_profile(
        &self,
        id: &str,
        req: UpdateProfileRequest,
    ) -> AppResult<UserProfile> {
        req.validate()?;

        let mut fields = Document::new();
        if let Some(name) = req.name {
            fields.insert("name", name);
        }
        if let Some(age_group) = req.age_group {
            fields.insert("age_group", to_field(&age_group)?);
        }
        if let Some(sport) = req.sport {
            fields.insert("sport", to_field(&sport)?);
        }

        let record = self.users.patch(id, fields).await?;
        tracing::info!("Profile updated: {}", id);
        Ok(record.into())
    }

    pub async fn progress(&self, id: &str) -> AppResult<UserProgress> {
        let user = self.user(id).await?.data;
        Ok(UserProgress {
            points: user.points,
            level: user.level,
            rank: user.rank,
            completed_modules: user.completed_modules,
            quiz_scores: user.quiz_scores,
        })
    }

    pub async fn badges(&self, id: &str) -> AppResult<BTreeSet<String>> {
        Ok(self.user(id).await?.data.badges)
    }

    pub async fn quiz_scores(&self, id: &str) -> AppResult<Vec<QuizAttemptRecord>> {
        Ok(self.user(id).await?.data.quiz_scores)
    }

    pub async fn list(&self, filter: &UserFilterQuery) -> AppResult<Vec<UserProfile>> {
        let users = self.users.find_where(filtered(filter)).await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Top users by points; ties go to the lower id.
    pub async fn leaderboard(&self, filter: &UserFilterQuery) -> AppResult<Vec<LeaderboardEntry>> {
        let query = filtered(filter)
            .order_by("points", SortDirection::Descending)
            .order_by(ID_FIELD, SortDirection::Ascending)
            .limit(LEADERBOARD_SIZE);

        let users = self.users.find_where(query).await?;
        Ok(users.into_iter().map(LeaderboardEntry::from).collect())
    }
}

fn filtered(filter: &UserFilterQuery) -> Query {
    let mut query = Query::new();
    if let Some(sport) = filter.sport.as_deref().filter(|s| !s.is_empty()) {
        query = query.eq("sport", sport);
    }
    if let Some(age_group) = filter.age_group.as_deref().filter(|s| !s.is_empty()) {
        query = query.eq("age_group", age_group);
    }
    query
}

fn to_field<T: serde::Serialize>(value: &T) -> AppResult<Bson> {
    to_bson(value).map_err(|e| StoreError::Serialization(e.to_string()).into())
}
