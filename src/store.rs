use async_trait::async_trait;
use tracing::warn;

use crate::config::{Backend, Config};
use crate::db::PgLogStore;
use crate::models::{EntryId, FollowupEntry, StoredEntry};
use crate::sheet::SheetLogStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("sheet error: {0}")]
    Sheet(#[from] csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sheet worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("row positions changed after the last delete; reload before deleting again")]
    StalePositions,
}

/// The three operations the dashboard needs from a tabular backend.
///
/// No uniqueness is enforced: repeated (date, group, member) entries accumulate.
/// `append` is not idempotent and must not be retried automatically.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Prepare the backend (schema or header row). Safe to run repeatedly.
    async fn init(&self) -> Result<(), StoreError>;

    /// All rows in backend order. An empty backend yields an empty vector.
    async fn load_all(&self) -> Result<Vec<StoredEntry>, StoreError>;

    async fn append(&self, entry: &FollowupEntry) -> Result<EntryId, StoreError>;

    /// Remove one row. Returns `Ok(false)` when no row has this identifier.
    async fn delete(&self, id: EntryId) -> Result<bool, StoreError>;
}

pub fn open(config: &Config) -> anyhow::Result<Box<dyn LogStore>> {
    let store: Box<dyn LogStore> = match &config.backend {
        Backend::Postgres { database_url } => Box::new(PgLogStore::connect_lazy(database_url)?),
        Backend::Sheet { path } => Box::new(SheetLogStore::new(path.clone())),
    };
    Ok(store)
}

/// Read failures degrade to an empty log with a visible warning.
pub async fn load_or_empty(store: &dyn LogStore) -> Vec<StoredEntry> {
    match store.load_all().await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, "failed to read follow-up log, continuing with no data");
            Vec::new()
        }
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use super::*;

    /// Surrogate-key store kept in memory for tests.
    #[derive(Default)]
    pub struct MemoryLogStore {
        state: Mutex<State>,
    }

    #[derive(Default)]
    struct State {
        next_id: i64,
        rows: Vec<StoredEntry>,
        fail_reads: bool,
    }

    impl MemoryLogStore {
        pub fn failing_reads() -> Self {
            let store = Self::default();
            store.state.lock().unwrap().fail_reads = true;
            store
        }

        pub fn insert_raw(&self, entry: StoredEntry) {
            let mut state = self.state.lock().unwrap();
            state.next_id = state.next_id.max(entry.id.0 + 1);
            state.rows.push(entry);
        }
    }

    #[async_trait]
    impl LogStore for MemoryLogStore {
        async fn init(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn load_all(&self) -> Result<Vec<StoredEntry>, StoreError> {
            let state = self.state.lock().unwrap();
            if state.fail_reads {
                return Err(StoreError::Io(std::io::Error::other("backend unavailable")));
            }
            Ok(state.rows.clone())
        }

        async fn append(&self, entry: &FollowupEntry) -> Result<EntryId, StoreError> {
            let mut state = self.state.lock().unwrap();
            let id = EntryId(state.next_id);
            state.next_id += 1;
            state.rows.push(StoredEntry::from_entry(id, entry));
            Ok(id)
        }

        async fn delete(&self, id: EntryId) -> Result<bool, StoreError> {
            let mut state = self.state.lock().unwrap();
            let before = state.rows.len();
            state.rows.retain(|row| row.id != id);
            Ok(state.rows.len() != before)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::memory::MemoryLogStore;
    use super::*;
    use crate::status::FollowupStatus;

    fn entry(member: &str, tech: FollowupStatus) -> FollowupEntry {
        FollowupEntry::new(
            NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            "The First Group",
            member,
            "W102025-00123",
            tech,
            FollowupStatus::Normal,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn empty_backend_loads_nothing() {
        let store = MemoryLogStore::default();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_failure_degrades_to_empty() {
        let store = MemoryLogStore::failing_reads();
        assert!(load_or_empty(&store).await.is_empty());
    }

    #[tokio::test]
    async fn surrogate_keys_survive_other_deletes() {
        let store = MemoryLogStore::default();
        let first = store.append(&entry("Desiree", FollowupStatus::Blank)).await.unwrap();
        let second = store
            .append(&entry("Jessica Dollins", FollowupStatus::Normal))
            .await
            .unwrap();

        assert!(store.delete(first).await.unwrap());
        assert!(!store.delete(first).await.unwrap());

        let rows = store.load_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, second);
        assert_eq!(rows[0].member, "Jessica Dollins");
    }

    #[tokio::test]
    async fn duplicates_accumulate() {
        let store = MemoryLogStore::default();
        store.append(&entry("Desiree", FollowupStatus::Blank)).await.unwrap();
        store.append(&entry("Desiree", FollowupStatus::Normal)).await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 2);
    }
}
