use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::NotificationResult;
use crate::models::{NewNotificationRecord, NotificationRecord};

/// Repository trait for notification records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert and return the record with its assigned id
    async fn create(&self, record: NewNotificationRecord) -> NotificationResult<NotificationRecord>;

    /// All records ordered by id
    async fn list(&self) -> NotificationResult<Vec<NotificationRecord>>;

    async fn get_by_id(&self, id: i64) -> NotificationResult<Option<NotificationRecord>>;

    /// Returns `false` when nothing was deleted
    async fn delete(&self, id: i64) -> NotificationResult<bool>;
}

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    records: BTreeMap<i64, NotificationRecord>,
}

/// In-memory implementation of NotificationRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, record: NewNotificationRecord) -> NotificationResult<NotificationRecord> {
        let mut store = self.store.write().await;
        store.next_id += 1;
        let record = record.into_record(store.next_id);
        store.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list(&self) -> NotificationResult<Vec<NotificationRecord>> {
        let store = self.store.read().await;
        Ok(store.records.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i64) -> NotificationResult<Option<NotificationRecord>> {
        let store = self.store.read().await;
        Ok(store.records.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> NotificationResult<bool> {
        let mut store = self.store.write().await;
        Ok(store.records.remove(&id).is_some())
    }
}
