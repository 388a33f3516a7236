use mongodb::bson::doc;
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{
    module::Module,
    quest::{Quest, QuestStatus},
    Record,
};
use crate::repository::Repository;
use crate::store::{DocumentStore, Query};

/// Read side of the reference data plus the quest lifecycle.
pub struct CatalogService {
    quests: Repository<Quest>,
    modules: Repository<Module>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            quests: Repository::new(store.clone()),
            modules: Repository::new(store),
        }
    }

    pub async fn list_quests(&self, status: Option<QuestStatus>) -> AppResult<Vec<Record<Quest>>> {
        let query = match status {
            Some(status) => Query::new().eq("status", status.as_str()),
            None => Query::new(),
        };
        self.quests.find_where(query).await
    }

    /// Administrative transition; any state may move to any other.
    pub async fn set_quest_status(&self, id: &str, status: QuestStatus) -> AppResult<Record<Quest>> {
        let quest = self
            .quests
            .patch(id, doc! { "status": status.as_str() })
            .await?;
        tracing::info!("Quest {} is now {}", id, status.as_str());
        Ok(quest)
    }

    /// Modules ordered by required level, optionally only those unlocked at
    /// `level`.
    pub async fn list_modules(&self, level: Option<i64>) -> AppResult<Vec<Record<Module>>> {
        let query = match level {
            Some(level) => Query::new().lte("level_required", level),
            None => Query::new(),
        };
        self.modules.find_where(query).await
    }
}
