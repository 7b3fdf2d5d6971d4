//! Session records indexed in memory and written through to a JSON document.
//!
//! The document is a map of record id to record. Every mutation rewrites the
//! whole file through a temporary sibling and a rename, so a crash leaves either
//! the old or the new document on disk.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::{SessionQuery, SessionRecord, SessionStore, StoreError};

#[derive(Debug)]
pub struct JsonSessionStore {
    path: Option<PathBuf>,
    records: RwLock<BTreeMap<String, SessionRecord>>,
}

impl JsonSessionStore {
    /// Store without a backing file.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Store backed by `path`; call [`SessionStore::load_all`] to read it.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            records: RwLock::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, records: &BTreeMap<String, SessionRecord>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let document = serde_json::to_vec(records)?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, document).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("persisted {} session records", records.len());
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn load_all(&self) -> Result<usize, StoreError> {
        let Some(path) = &self.path else {
            return Ok(self.records.read().await.len());
        };
        let loaded: BTreeMap<String, SessionRecord> = match tokio::fs::read(path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        let count = loaded.len();
        *self.records.write().await = loaded;
        Ok(count)
    }

    async fn search(&self, query: &SessionQuery) -> Result<Vec<SessionRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records
            .values()
            .any(|existing| existing.session_id == record.session_id && existing.id != record.id)
        {
            return Err(StoreError::Conflict);
        }
        let previous = records.insert(record.id.clone(), record.clone());
        if let Err(err) = self.persist(&records).await {
            match previous {
                Some(previous) => records.insert(record.id.clone(), previous),
                None => records.remove(&record.id),
            };
            return Err(err);
        }
        Ok(())
    }

    async fn remove(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let Some(removed) = records.remove(&record.id) else {
            return Err(StoreError::NotFound);
        };
        if let Err(err) = self.persist(&records).await {
            records.insert(removed.id.clone(), removed);
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(session_id: &str, user_id: &str) -> SessionRecord {
        SessionRecord::new(session_id.to_string(), user_id.to_string(), 1_700_000_000)
    }

    #[tokio::test]
    async fn save_search_remove_in_memory() {
        let store = JsonSessionStore::in_memory();
        let first = record("s-1", "u-1");
        store.save(&first).await.unwrap();
        store.save(&record("s-2", "u-1")).await.unwrap();

        let found = store
            .search(&SessionQuery::by_session_id("s-1"))
            .await
            .unwrap();
        assert_eq!(found, vec![first.clone()]);

        store.remove(&first).await.unwrap();
        assert!(store
            .search(&SessionQuery::by_session_id("s-1"))
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            store.remove(&first).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn session_ids_are_unique() {
        let store = JsonSessionStore::in_memory();
        store.save(&record("s-1", "u-1")).await.unwrap();
        assert!(matches!(
            store.save(&record("s-1", "u-2")).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn records_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let store = JsonSessionStore::open(&path);
        assert_eq!(store.load_all().await.unwrap(), 0);
        let saved = record("s-1", "u-1");
        store.save(&saved).await.unwrap();
        store.save(&record("s-2", "u-2")).await.unwrap();

        let reopened = JsonSessionStore::open(&path);
        assert_eq!(reopened.load_all().await.unwrap(), 2);
        let found = reopened
            .search(&SessionQuery::by_session_id("s-1"))
            .await
            .unwrap();
        assert_eq!(found, vec![saved]);
    }

    #[tokio::test]
    async fn corrupt_document_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = JsonSessionStore::open(&path);
        assert!(matches!(store.load_all().await, Err(StoreError::Json(_))));
    }
}
