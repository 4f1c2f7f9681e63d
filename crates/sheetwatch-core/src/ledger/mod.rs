//! Notification ledger
//!
//! The ledger is an append-only history of dispatched alerts. It is read in
//! full at the start of every check cycle and grows by one record per
//! successful dispatch. Nothing in Sheetwatch rewrites or deletes records.

mod file;
mod memory;
mod sheet;

pub use file::FileLedger;
pub use memory::MemoryLedger;
pub use sheet::SheetLedger;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, LedgerBackend};
use crate::error::Result;
use crate::models::AlertRecord;
use crate::provider::TabularProvider;

/// Durable history of dispatched alerts
#[async_trait]
pub trait NotificationLedger: Send + Sync {
    /// Read every record, failing with `StoreUnavailable`
    async fn load_all(&self) -> Result<Vec<AlertRecord>>;

    /// Append one record, failing with `StoreUnavailable`
    async fn append(&self, record: &AlertRecord) -> Result<()>;
}

/// Build the ledger selected by configuration
pub fn from_config(
    config: &Config,
    provider: Arc<dyn TabularProvider>,
) -> Arc<dyn NotificationLedger> {
    match config.ledger.backend {
        LedgerBackend::Sheet => Arc::new(SheetLedger::new(provider, &config.ledger)),
        LedgerBackend::File => Arc::new(FileLedger::new(&config.ledger.path)),
    }
}
