//! In-process implementation of the archive repository.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::entities::{ArchiveRecord, Collection, UpsertOutcome};
use crate::domain::repositories::ArchiveRepository;
use crate::error::AppError;

#[derive(Default)]
struct CollectionStore {
    next_id: u64,
    records: BTreeMap<u64, ArchiveRecord>,
    by_key: HashMap<String, u64>,
}

/// Archive storage held in memory.
///
/// Used when the service runs without the SQL data layer and in tests.
/// Contents are lost on restart.
#[derive(Default)]
pub struct MemoryArchiveRepository {
    collections: RwLock<HashMap<Collection, CollectionStore>>,
}

impl MemoryArchiveRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArchiveRepository for MemoryArchiveRepository {
    async fn upsert(
        &self,
        collection: Collection,
        items: Vec<Value>,
    ) -> Result<UpsertOutcome, AppError> {
        let mut collections = self.collections.write().await;
        let store = collections.entry(collection).or_default();
        let now = Utc::now();
        let mut outcome = UpsertOutcome::default();

        for data in items {
            let key = ArchiveRecord::natural_key(&data);

            if let Some(existing) = key.as_ref().and_then(|k| store.by_key.get(k).copied())
                && let Some(record) = store.records.get_mut(&existing)
            {
                record.data = data;
                record.updated_at = now;
                outcome.updated += 1;
                continue;
            }

            store.next_id += 1;
            let id = store.next_id;
            if let Some(key) = key {
                store.by_key.insert(key, id);
            }
            store.records.insert(
                id,
                ArchiveRecord {
                    id,
                    collection,
                    data,
                    created_at: now,
                    updated_at: now,
                },
            );
            outcome.inserted += 1;
        }

        debug!(
            collection = %collection,
            inserted = outcome.inserted,
            updated = outcome.updated,
            "Archive upsert"
        );

        Ok(outcome)
    }

    async fn list(
        &self,
        collection: Collection,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ArchiveRecord>, usize), AppError> {
        let collections = self.collections.read().await;
        let Some(store) = collections.get(&collection) else {
            return Ok((Vec::new(), 0));
        };

        let items = store
            .records
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((items, store.records.len()))
    }

    async fn delete(&self, collection: Collection, id: u64) -> Result<bool, AppError> {
        let mut collections = self.collections.write().await;
        let Some(store) = collections.get_mut(&collection) else {
            return Ok(false);
        };

        match store.records.remove(&id) {
            Some(record) => {
                if let Some(key) = ArchiveRecord::natural_key(&record.data) {
                    store.by_key.remove(&key);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_inserts_then_updates_by_url() {
        let repo = MemoryArchiveRepository::new();

        let first = repo
            .upsert(
                Collection::News,
                vec![
                    json!({"url": "https://example.com/news/1", "title": "Budget hearing"}),
                    json!({"url": "https://example.com/news/2", "title": "Council vote"}),
                ],
            )
            .await
            .unwrap();
        assert_eq!(first, UpsertOutcome { inserted: 2, updated: 0 });

        let second = repo
            .upsert(
                Collection::News,
                vec![json!({"url": "https://example.com/news/1", "title": "Budget hearing (updated)"})],
            )
            .await
            .unwrap();
        assert_eq!(second, UpsertOutcome { inserted: 0, updated: 1 });

        let (items, total) = repo.list(Collection::News, 10, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items[0].data["title"], "Budget hearing (updated)");
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let repo = MemoryArchiveRepository::new();
        repo.upsert(Collection::Minutes, vec![json!({"id": 1})])
            .await
            .unwrap();

        let (items, total) = repo.list(Collection::Segments, 10, 0).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let repo = MemoryArchiveRepository::new();
        let items = (0..5).map(|i| json!({"id": i})).collect();
        repo.upsert(Collection::Segments, items).await.unwrap();

        let (page, total) = repo.list(Collection::Segments, 2, 3).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].data["id"], 3);
    }

    #[tokio::test]
    async fn test_delete_frees_natural_key() {
        let repo = MemoryArchiveRepository::new();
        repo.upsert(Collection::News, vec![json!({"url": "u1"})])
            .await
            .unwrap();

        assert!(repo.delete(Collection::News, 1).await.unwrap());
        assert!(!repo.delete(Collection::News, 1).await.unwrap());

        let outcome = repo
            .upsert(Collection::News, vec![json!({"url": "u1"})])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 1);
    }
}
