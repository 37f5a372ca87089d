//! redb-backed persistence for the offline queue
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `queued_ops` | enqueue sequence | `QueuedOperation` | FIFO replay queue |
//! | `op_history` | history sequence | `HistoryEntry` | Recent outcomes (ring of 200) |
//! | `counters` | name | `u64` | Monotonic sequences |
//!
//! redb commits are durable as soon as `commit()` returns, which is what a
//! till terminal needs against power loss mid-shift.

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::types::{HistoryEntry, OperationStatus, QueuedOperation};

const QUEUE_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("queued_ops");
const HISTORY_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("op_history");
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const QUEUE_SEQ_KEY: &str = "queue_seq";
const HISTORY_SEQ_KEY: &str = "history_seq";

/// Outcome history rows kept before the oldest are dropped.
const HISTORY_CAP: usize = 200;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Offline queue storage backed by redb
#[derive(Clone)]
pub struct OfflineStore {
    db: Arc<Database>,
}

impl OfflineStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(QUEUE_TABLE)?;
            let _ = write_txn.open_table(HISTORY_TABLE)?;
            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(QUEUE_SEQ_KEY)?.is_none() {
                counters.insert(QUEUE_SEQ_KEY, 0u64)?;
            }
            if counters.get(HISTORY_SEQ_KEY)?.is_none() {
                counters.insert(HISTORY_SEQ_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Append an operation at the tail of the queue.
    pub fn enqueue(&self, op: &QueuedOperation) -> StorageResult<u64> {
        let bytes = serde_json::to_vec(op)?;
        let write_txn = self.db.begin_write()?;
        let seq;
        {
            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            let current = counters
                .get(QUEUE_SEQ_KEY)?
                .map(|g| g.value())
                .unwrap_or(0);
            seq = current + 1;
            counters.insert(QUEUE_SEQ_KEY, seq)?;

            let mut queue = write_txn.open_table(QUEUE_TABLE)?;
            queue.insert(seq, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(seq)
    }

    /// All operations in enqueue (FIFO) order with their sequence keys.
    pub fn list(&self) -> StorageResult<Vec<(u64, QueuedOperation)>> {
        let read_txn = self.db.begin_read()?;
        let queue = read_txn.open_table(QUEUE_TABLE)?;
        let mut out = Vec::new();
        for entry in queue.iter()? {
            let (key, value) = entry?;
            let op: QueuedOperation = serde_json::from_slice(value.value())?;
            out.push((key.value(), op));
        }
        Ok(out)
    }

    /// Look up an operation by its client uuid.
    pub fn find_by_id(&self, id: Uuid) -> StorageResult<Option<(u64, QueuedOperation)>> {
        Ok(self.list()?.into_iter().find(|(_, op)| op.id == id))
    }

    /// Overwrite one operation in place.
    pub fn update(&self, seq: u64, op: &QueuedOperation) -> StorageResult<()> {
        let bytes = serde_json::to_vec(op)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut queue = write_txn.open_table(QUEUE_TABLE)?;
            queue.insert(seq, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove one operation from the queue.
    pub fn remove(&self, seq: u64) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut queue = write_txn.open_table(QUEUE_TABLE)?;
            queue.remove(seq)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Counts of (replayable, failed) operations, for interval selection.
    pub fn replay_counts(&self) -> StorageResult<(usize, usize)> {
        let ops = self.list()?;
        let pending = ops.iter().filter(|(_, op)| op.status.is_replayable()).count();
        let failed = ops
            .iter()
            .filter(|(_, op)| op.status == OperationStatus::Failed)
            .count();
        Ok((pending, failed))
    }

    /// Append an outcome row, trimming the ring to its cap.
    pub fn push_history(&self, entry: &HistoryEntry) -> StorageResult<()> {
        let bytes = serde_json::to_vec(entry)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            let seq = counters
                .get(HISTORY_SEQ_KEY)?
                .map(|g| g.value())
                .unwrap_or(0)
                + 1;
            counters.insert(HISTORY_SEQ_KEY, seq)?;

            let mut history = write_txn.open_table(HISTORY_TABLE)?;
            history.insert(seq, bytes.as_slice())?;

            // Trim the oldest rows past the cap
            let mut stale = Vec::new();
            let len = history.len()? as usize;
            if len > HISTORY_CAP {
                for entry in history.iter()?.take(len - HISTORY_CAP) {
                    let (key, _) = entry?;
                    stale.push(key.value());
                }
            }
            for key in stale {
                history.remove(key)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Outcome history, oldest first.
    pub fn history(&self) -> StorageResult<Vec<HistoryEntry>> {
        let read_txn = self.db.begin_read()?;
        let history = read_txn.open_table(HISTORY_TABLE)?;
        let mut out = Vec::new();
        for entry in history.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::util::now_millis;

    fn op(url: &str) -> QueuedOperation {
        QueuedOperation {
            id: Uuid::new_v4(),
            url: url.into(),
            method: "POST".into(),
            data: serde_json::json!({}),
            headers: vec![],
            idempotency_key: Uuid::new_v4().to_string(),
            created_at: now_millis(),
            retries: 0,
            last_attempt_at: None,
            status: OperationStatus::Pending,
            last_error: None,
            admin_note: None,
        }
    }

    #[test]
    fn test_fifo_order() {
        let store = OfflineStore::open_in_memory().unwrap();
        store.enqueue(&op("/first")).unwrap();
        store.enqueue(&op("/second")).unwrap();
        store.enqueue(&op("/third")).unwrap();

        let urls: Vec<String> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|(_, op)| op.url)
            .collect();
        assert_eq!(urls, vec!["/first", "/second", "/third"]);
    }

    #[test]
    fn test_update_and_remove() {
        let store = OfflineStore::open_in_memory().unwrap();
        let seq = store.enqueue(&op("/sales")).unwrap();

        let (_, mut stored) = store.list().unwrap().pop().unwrap();
        stored.retries = 3;
        stored.status = OperationStatus::Retrying;
        store.update(seq, &stored).unwrap();

        let (_, after) = store.list().unwrap().pop().unwrap();
        assert_eq!(after.retries, 3);
        assert_eq!(after.status, OperationStatus::Retrying);

        store.remove(seq).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_history_ring_caps_at_200() {
        let store = OfflineStore::open_in_memory().unwrap();
        for i in 0..230 {
            store
                .push_history(&HistoryEntry {
                    op_id: Uuid::new_v4(),
                    url: format!("/op/{i}"),
                    method: "POST".into(),
                    status: OperationStatus::Synced,
                    error: None,
                    note: None,
                    at: now_millis(),
                })
                .unwrap();
        }
        let history = store.history().unwrap();
        assert_eq!(history.len(), 200);
        // Oldest rows were trimmed
        assert_eq!(history[0].url, "/op/30");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.redb");

        {
            let store = OfflineStore::open(&path).unwrap();
            store.enqueue(&op("/sales")).unwrap();
        }
        let store = OfflineStore::open(&path).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
