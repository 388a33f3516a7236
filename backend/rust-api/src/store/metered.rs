use async_trait::async_trait;
use mongodb::bson::Document;
use std::sync::Arc;

use super::{DocumentStore, Mutation, Query, StoreError, TxOutcome};
use crate::metrics::track_store_operation;

/// Wraps any store so every call is counted and timed per collection.
pub struct MeteredStore {
    inner: Arc<dyn DocumentStore>,
}

impl MeteredStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DocumentStore for MeteredStore {
    async fn ping(&self) -> Result<(), StoreError> {
        track_store_operation("ping", "-", self.inner.ping()).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        track_store_operation("get", collection, self.inner.get(collection, id)).await
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        track_store_operation("insert", collection, self.inner.insert(collection, doc)).await
    }

    async fn put(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        track_store_operation("put", collection, self.inner.put(collection, id, doc)).await
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<bool, StoreError> {
        track_store_operation("merge", collection, self.inner.merge(collection, id, fields)).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        track_store_operation("delete", collection, self.inner.delete(collection, id)).await
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        track_store_operation("query", collection, self.inner.query(collection, query)).await
    }

    async fn transact(
        &self,
        collection: &str,
        id: &str,
        mutation: &Mutation<'_>,
    ) -> Result<TxOutcome, StoreError> {
        track_store_operation(
            "transact",
            collection,
            self.inner.transact(collection, id, mutation),
        )
        .await
    }
}
