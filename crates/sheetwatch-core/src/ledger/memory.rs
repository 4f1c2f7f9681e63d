//! In-memory ledger

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::AlertRecord;

use super::NotificationLedger;

/// Ledger kept in process memory.
///
/// Used for dry runs (seeded from the real history) and tests. Reads and
/// writes can be switched to fail to exercise the fail-open paths.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<AlertRecord>>,
    fail_loads: Mutex<bool>,
    fail_appends: Mutex<bool>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger holding `records`
    pub fn with_records(records: Vec<AlertRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    /// Make `load_all` fail
    pub fn set_fail_loads(&self, fail: bool) {
        *self.fail_loads.lock() = fail;
    }

    /// Make `append` fail
    pub fn set_fail_appends(&self, fail: bool) {
        *self.fail_appends.lock() = fail;
    }

    /// Snapshot of the stored records
    pub fn records(&self) -> Vec<AlertRecord> {
        self.records.lock().clone()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records are stored
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl NotificationLedger for MemoryLedger {
    async fn load_all(&self) -> Result<Vec<AlertRecord>> {
        if *self.fail_loads.lock() {
            return Err(Error::store("memory ledger configured to fail loads"));
        }
        Ok(self.records())
    }

    async fn append(&self, record: &AlertRecord) -> Result<()> {
        if *self.fail_appends.lock() {
            return Err(Error::store("memory ledger configured to fail appends"));
        }

        debug!(key = %record.key(), "Recorded notification in memory");
        self.records.lock().push(record.clone());
        Ok(())
    }
}
