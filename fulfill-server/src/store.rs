//! redb-based storage for assignment records and debit idempotency markers
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `assignments` | `(order_id, item_index)` | `AssignmentRecord` | Live assignment decisions |
//! | `debit_markers` | `(date, pack, sku, unit_index)` | `()` | Daily debit idempotency |
//!
//! Values are JSON-serialized. The debit marker is written inside the debit
//! critical section: a unit confirmed (or assumed) debited earlier the same
//! day is never debited again, even after a session restart.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition,
};
use shared::models::AssignmentRecord;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Assignment records: key = (order_id, item_index), value = JSON
const ASSIGNMENTS_TABLE: TableDefinition<(&str, u32), &[u8]> = TableDefinition::new("assignments");

/// Debit idempotency markers: key = (date, pack, sku, unit_index), value = empty
const DEBIT_MARKERS_TABLE: TableDefinition<(&str, &str, &str, u32), ()> =
    TableDefinition::new("debit_markers");

#[derive(Debug, Error)]
pub enum StoreError {
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

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent store for the fulfillment engine
#[derive(Clone)]
pub struct FulfillStore {
    db: Arc<Database>,
}

impl FulfillStore {
    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    /// In-memory store for tests
    pub fn in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            txn.open_table(ASSIGNMENTS_TABLE)?;
            txn.open_table(DEBIT_MARKERS_TABLE)?;
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Assignment records ==========

    /// Insert or replace the assignment record for an order item
    pub fn put_assignment(&self, record: &AssignmentRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(record)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ASSIGNMENTS_TABLE)?;
            table.insert((record.order_id.as_str(), record.item_index), json.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Fetch the assignment record for an order item
    pub fn get_assignment(
        &self,
        order_id: &str,
        item_index: u32,
    ) -> StoreResult<Option<AssignmentRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ASSIGNMENTS_TABLE)?;
        let Some(guard) = table.get((order_id, item_index))? else {
            return Ok(None);
        };
        let record: AssignmentRecord = serde_json::from_slice(guard.value())?;
        Ok(Some(record))
    }

    /// All live (not fulfilled / not superseded) assignment records
    pub fn live_assignments(&self) -> StoreResult<Vec<AssignmentRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ASSIGNMENTS_TABLE)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, guard) = entry?;
            let record: AssignmentRecord = serde_json::from_slice(guard.value())?;
            if record.live {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Mark an assignment as no longer live (fulfilled or superseded).
    ///
    /// Missing records are ignored: supersede is idempotent.
    pub fn retire_assignment(&self, order_id: &str, item_index: u32) -> StoreResult<()> {
        let Some(mut record) = self.get_assignment(order_id, item_index)? else {
            return Ok(());
        };
        record.live = false;
        self.put_assignment(&record)
    }

    // ========== Debit idempotency markers ==========

    /// Whether this unit was already debited today
    pub fn has_debit_marker(
        &self,
        date: &str,
        pack: &str,
        sku: &str,
        unit_index: u32,
    ) -> StoreResult<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DEBIT_MARKERS_TABLE)?;
        Ok(table.get((date, pack, sku, unit_index))?.is_some())
    }

    /// Record that this unit was debited today
    pub fn record_debit_marker(
        &self,
        date: &str,
        pack: &str,
        sku: &str,
        unit_index: u32,
    ) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DEBIT_MARKERS_TABLE)?;
            table.insert((date, pack, sku, unit_index), ())?;
        }
        txn.commit()?;
        Ok(())
    }
}
