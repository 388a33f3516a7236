//! Typed CRUD over the document store, one collection per entity.

use mongodb::bson::Document;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    badge::Badge, module::Module, now_timestamp, progress_log::ProgressLog, quest::Quest,
    quiz::Quiz, user::User, Record, Stamped,
};
use crate::store::{decode, encode, DocumentStore, Query, SortDirection, TxAction, TxOutcome};

pub trait Entity: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Used in not-found messages.
    const NAME: &'static str;

    /// Ordering applied to listings that do not ask for one.
    fn default_order() -> Vec<(&'static str, SortDirection)> {
        Vec::new()
    }

    /// Field rules plus any cross-field checks.
    fn check(&self) -> AppResult<()> {
        self.validate().map_err(AppError::from)
    }
}

impl Entity for Badge {
    const COLLECTION: &'static str = "badges";
    const NAME: &'static str = "Badge";
}

impl Entity for Module {
    const COLLECTION: &'static str = "modules";
    const NAME: &'static str = "Module";

    fn default_order() -> Vec<(&'static str, SortDirection)> {
        vec![("level_required", SortDirection::Ascending)]
    }
}

impl Entity for Quest {
    const COLLECTION: &'static str = "quests";
    const NAME: &'static str = "Quest";
}

impl Entity for Quiz {
    const COLLECTION: &'static str = "quizzes";
    const NAME: &'static str = "Quiz";
}

impl Entity for ProgressLog {
    const COLLECTION: &'static str = "user_progress";
    const NAME: &'static str = "Log";

    fn default_order() -> Vec<(&'static str, SortDirection)> {
        vec![("created_at", SortDirection::Descending)]
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
    const NAME: &'static str = "User";
}

pub struct Repository<E> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Validates and stores a new record under a generated id.
    pub async fn create(&self, data: E) -> AppResult<Record<E>> {
        data.check()?;
        let stamped = Stamped::new(data);
        let id = self.store.insert(E::COLLECTION, encode(&stamped)?).await?;
        tracing::info!("Created {} {}", E::NAME, id);
        Ok(Record::new(id, stamped))
    }

    /// Validates and stores a new record under a caller-chosen id.
    pub async fn create_with_id(&self, id: &str, data: E) -> AppResult<Record<E>> {
        data.check()?;
        let stamped = Stamped::new(data);
        self.store.put(E::COLLECTION, id, encode(&stamped)?).await?;
        tracing::info!("Created {} {}", E::NAME, id);
        Ok(Record::new(id, stamped))
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<Record<E>>> {
        match self.store.get(E::COLLECTION, id).await? {
            Some(doc) => Ok(Some(Record::new(id, decode::<Stamped<E>>(doc)?))),
            None => Ok(None),
        }
    }

    /// Like [`find_by_id`](Self::find_by_id) but absence is an error.
    pub async fn get(&self, id: &str) -> AppResult<Record<E>> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(E::NAME))
    }

    pub async fn find_all(&self) -> AppResult<Vec<Record<E>>> {
        self.find_where(Query::new()).await
    }

    pub async fn find_where(&self, mut query: Query) -> AppResult<Vec<Record<E>>> {
        if query.order_by.is_empty() {
            for (field, direction) in E::default_order() {
                query = query.order_by(field, direction);
            }
        }

        self.store
            .query(E::COLLECTION, &query)
            .await?
            .into_iter()
            .map(|(id, doc)| Ok(Record::new(id, decode::<Stamped<E>>(doc)?)))
            .collect()
    }

    /// First record whose `field` equals `value`.
    pub async fn find_one_by(&self, field: &str, value: &str) -> AppResult<Option<Record<E>>> {
        let mut found = self
            .find_where(Query::new().eq(field, value).limit(1))
            .await?;
        Ok(found.pop())
    }

    /// Replaces the entity fields of an existing record, keeping its
    /// creation time.
    pub async fn update(&self, id: &str, data: E) -> AppResult<Record<E>> {
        data.check()?;
        let fields = encode(&data)?;
        let now = now_timestamp();

        let outcome = self
            .store
            .transact(E::COLLECTION, id, &|before: &Document| {
                let mut after = fields.clone();
                let created_at = before.get_str("created_at").unwrap_or(now.as_str());
                after.insert("created_at", created_at.to_string());
                after.insert("updated_at", now.clone());
                Ok(TxAction::Write(after))
            })
            .await?;

        match outcome {
            TxOutcome::Committed { after, .. } => {
                tracing::info!("Updated {} {}", E::NAME, id);
                Ok(Record::new(id, decode::<Stamped<E>>(after)?))
            }
            TxOutcome::Missing | TxOutcome::Unchanged => Err(AppError::not_found(E::NAME)),
        }
    }

    /// Sets individual fields of an existing record and bumps `updated_at`.
    pub async fn patch(&self, id: &str, mut fields: Document) -> AppResult<Record<E>> {
        fields.insert("updated_at", now_timestamp());
        if !self.store.merge(E::COLLECTION, id, fields).await? {
            return Err(AppError::not_found(E::NAME));
        }
        self.get(id).await
    }

    /// Removing an absent record succeeds.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.store.delete(E::COLLECTION, id).await?;
        tracing::info!("Deleted {} {}", E::NAME, id);
        Ok(())
    }
}
