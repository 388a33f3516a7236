use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    compare_bson, DocumentStore, Filter, FilterOp, Mutation, Query, SortDirection, StoreError,
    TxAction, TxOutcome, ID_FIELD,
};

type Collection = BTreeMap<String, Document>;

/// In-process store. A single lock guards every collection, which makes each
/// transaction trivially serialisable.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

fn field_value(id: &str, doc: &Document, field: &str) -> Option<Bson> {
    if field == ID_FIELD {
        return Some(Bson::String(id.to_string()));
    }
    doc.get(field).cloned()
}

fn satisfies(id: &str, doc: &Document, filter: &Filter) -> bool {
    let Some(value) = field_value(id, doc, &filter.field) else {
        return false;
    };
    match (filter.op, compare_bson(&value, &filter.value)) {
        (FilterOp::Eq, Some(ordering)) => ordering == Ordering::Equal,
        (FilterOp::Eq, None) => value == filter.value,
        (FilterOp::Lte, Some(ordering)) => ordering != Ordering::Greater,
        (FilterOp::Gte, Some(ordering)) => ordering != Ordering::Less,
        _ => false,
    }
}

fn compare_records(
    order_by: &[(String, SortDirection)],
    (a_id, a): &(String, Document),
    (b_id, b): &(String, Document),
) -> Ordering {
    for (field, direction) in order_by {
        let ordering = match (field_value(a_id, a, field), field_value(b_id, b, field)) {
            (Some(x), Some(y)) => compare_bson(&x, &y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        let ordering = match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_available()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        self.check_available()?;
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc);
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        let Some(existing) = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(id))
        else {
            return Ok(false);
        };
        for (key, value) in fields {
            existing.insert(key, value);
        }
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        if let Some(records) = collections.get_mut(collection) {
            records.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        self.check_available()?;
        let collections = self.collections.read().await;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<(String, Document)> = records
            .iter()
            .filter(|(id, doc)| query.filters.iter().all(|f| satisfies(id, doc, f)))
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect();

        // Stable sort: equal keys keep ascending id order.
        found.sort_by(|a, b| compare_records(&query.order_by, a, b));

        if let Some(limit) = query.limit {
            found.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(found)
    }

    async fn transact(
        &self,
        collection: &str,
        id: &str,
        mutation: &Mutation<'_>,
    ) -> Result<TxOutcome, StoreError> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        let Some(current) = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(id))
        else {
            return Ok(TxOutcome::Missing);
        };

        match mutation(current)? {
            TxAction::Skip => Ok(TxOutcome::Unchanged),
            TxAction::Write(after) => {
                let before = std::mem::replace(current, after.clone());
                Ok(TxOutcome::Committed { before, after })
            }
        }
    }
}
