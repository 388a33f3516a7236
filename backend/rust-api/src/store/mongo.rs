use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{
    Error as MongoError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT,
};
use mongodb::options::ReplaceOptions;
use mongodb::{Client, ClientSession, Collection, Database};
use uuid::Uuid;

use super::{
    DocumentStore, FilterOp, Mutation, Query, SortDirection, StoreError, TxAction, TxOutcome,
    ID_FIELD,
};
use crate::utils::retry::{retry_when, RetryConfig};

const COMMIT_ATTEMPTS: usize = 3;

impl From<MongoError> for StoreError {
    fn from(err: MongoError) -> Self {
        if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
            StoreError::Conflict(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

/// MongoDB-backed store. Records use string `_id`s so identity-provider
/// subjects can be used verbatim as user ids.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, database: &str) -> Self {
        let db = client.database(database);
        Self { client, db }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    async fn run_transaction(
        &self,
        collection: &str,
        id: &str,
        mutation: &Mutation<'_>,
    ) -> Result<TxOutcome, StoreError> {
        let coll = self.collection(collection);
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        let current = coll
            .find_one(doc! { ID_FIELD: id })
            .session(&mut session)
            .await?;

        let Some(mut before) = current else {
            session.abort_transaction().await?;
            return Ok(TxOutcome::Missing);
        };
        before.remove(ID_FIELD);

        let after = match mutation(&before) {
            Ok(TxAction::Write(after)) => after,
            Ok(TxAction::Skip) => {
                session.abort_transaction().await?;
                return Ok(TxOutcome::Unchanged);
            }
            Err(e) => {
                session.abort_transaction().await?;
                return Err(e);
            }
        };

        let mut replacement = after.clone();
        replacement.insert(ID_FIELD, id);
        coll.replace_one(doc! { ID_FIELD: id }, replacement)
            .session(&mut session)
            .await?;

        commit_with_retry(&mut session).await?;

        Ok(TxOutcome::Committed { before, after })
    }
}

async fn commit_with_retry(session: &mut ClientSession) -> Result<(), StoreError> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Ok(()) => return Ok(()),
            Err(e)
                if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                    && attempt < COMMIT_ATTEMPTS =>
            {
                tracing::warn!("Commit result unknown, retrying commit (attempt {})", attempt);
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn filter_document(query: &Query) -> Document {
    let mut filter = Document::new();
    for clause in &query.filters {
        let operator = match clause.op {
            FilterOp::Eq => {
                filter.insert(clause.field.clone(), clause.value.clone());
                continue;
            }
            FilterOp::Lte => "$lte",
            FilterOp::Gte => "$gte",
        };
        match filter.get_mut(&clause.field) {
            Some(Bson::Document(range)) => {
                range.insert(operator, clause.value.clone());
            }
            _ => {
                filter.insert(clause.field.clone(), doc! { operator: clause.value.clone() });
            }
        }
    }
    filter
}

fn sort_document(query: &Query) -> Document {
    let mut sort = Document::new();
    for (field, direction) in &query.order_by {
        let value = match direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        };
        sort.insert(field.clone(), value);
    }
    sort
}

fn split_id(mut doc: Document) -> Option<(String, Document)> {
    let id = match doc.remove(ID_FIELD)? {
        Bson::String(id) => id,
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    };
    Some((id, doc))
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let found = self.collection(collection).find_one(doc! { ID_FIELD: id }).await?;
        Ok(found.and_then(split_id).map(|(_, doc)| doc))
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        doc.insert(ID_FIELD, id.clone());
        self.collection(collection).insert_one(doc).await?;
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, mut doc: Document) -> Result<(), StoreError> {
        doc.insert(ID_FIELD, id);
        self.collection(collection)
            .replace_one(doc! { ID_FIELD: id }, doc)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await?;
        Ok(())
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<bool, StoreError> {
        let result = self
            .collection(collection)
            .update_one(doc! { ID_FIELD: id }, doc! { "$set": fields })
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.collection(collection)
            .delete_one(doc! { ID_FIELD: id })
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let coll = self.collection(collection);
        let mut find = coll
            .find(filter_document(query))
            .sort(sort_document(query));
        if let Some(limit) = query.limit {
            find = find.limit(limit);
        }

        let docs: Vec<Document> = find.await?.try_collect().await?;
        Ok(docs.into_iter().filter_map(split_id).collect())
    }

    async fn transact(
        &self,
        collection: &str,
        id: &str,
        mutation: &Mutation<'_>,
    ) -> Result<TxOutcome, StoreError> {
        retry_when(
            RetryConfig::default(),
            |e: &StoreError| e.is_transient(),
            || async move { self.run_transaction(collection, id, mutation).await },
        )
        .await
    }
}
