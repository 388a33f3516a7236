//! Collection-oriented document store.
//!
//! Services never talk to a database driver directly; they receive an
//! `Arc<dyn DocumentStore>` so the same code runs against MongoDB in
//! production and against [`MemoryStore`] in tests.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use serde::{de::DeserializeOwned, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

pub mod memory;
pub mod metered;
pub mod mongo;

pub use memory::MemoryStore;
pub use metered::MeteredStore;
pub use mongo::MongoStore;

/// Pseudo-field addressing the record identifier in filters and orderings.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("document encoding failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Conflicts are the only failures the store itself re-drives.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lte,
    Gte,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Bson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Equality/range filters combined with AND, an ordering and an optional limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Vec<(String, SortDirection)>,
    pub limit: Option<i64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: &str, value: impl Into<Bson>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn lte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.filter(field, FilterOp::Lte, value)
    }

    pub fn gte(self, field: &str, value: impl Into<Bson>) -> Self {
        self.filter(field, FilterOp::Gte, value)
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by.push((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Bson>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }
}

/// What a transaction body decided after looking at the current record.
#[derive(Debug, Clone)]
pub enum TxAction {
    Write(Document),
    Skip,
}

#[derive(Debug, Clone)]
pub enum TxOutcome {
    /// The record did not exist; the body was never invoked.
    Missing,
    /// The body chose not to write.
    Unchanged,
    Committed { before: Document, after: Document },
}

/// Transaction body. Stores may invoke it more than once when a conflict
/// forces a re-read, so it must not have side effects.
pub type Mutation<'a> = dyn Fn(&Document) -> Result<TxAction, StoreError> + Send + Sync + 'a;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Stores a new record under a server-generated identifier.
    async fn insert(&self, collection: &str, doc: Document) -> Result<String, StoreError>;

    /// Creates or replaces the record stored under `id`.
    async fn put(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError>;

    /// Overwrites the listed fields of an existing record. Returns `false`
    /// when there was no record to update.
    async fn merge(&self, collection: &str, id: &str, fields: Document)
        -> Result<bool, StoreError>;

    /// Removing an absent record is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(String, Document)>, StoreError>;

    /// Serialisable read-modify-write of a single record.
    async fn transact(
        &self,
        collection: &str,
        id: &str,
        mutation: &Mutation<'_>,
    ) -> Result<TxOutcome, StoreError>;
}

pub fn encode<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    mongodb::bson::to_document(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    mongodb::bson::from_document(doc).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Orders scalar BSON values; numbers compare across integer/double widths.
pub(crate) fn compare_bson(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}
