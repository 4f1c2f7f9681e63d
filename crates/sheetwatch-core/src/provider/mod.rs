//! Tabular data providers
//!
//! A provider exposes the worksheets of one spreadsheet. Sources are opened
//! by title and read by A1 range; the notification ledger may also append
//! rows through the same provider.

mod memory;
mod sheets;

pub use memory::MemoryProvider;
pub use sheets::GoogleSheetsClient;

use async_trait::async_trait;

use crate::error::Result;

/// Raw cell grid as returned by a range fetch
pub type CellGrid = Vec<Vec<String>>;

/// An opened worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHandle {
    /// Worksheet title
    pub title: String,
    /// Provider-specific worksheet id, when the provider has one
    pub sheet_id: Option<i64>,
}

impl SourceHandle {
    /// Create a handle for a worksheet title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sheet_id: None,
        }
    }
}

/// Access to the worksheets of a spreadsheet
#[async_trait]
pub trait TabularProvider: Send + Sync {
    /// Open a worksheet by title, failing with `SourceNotFound`
    async fn open_source(&self, name: &str) -> Result<SourceHandle>;

    /// Fetch a range of cells, failing with `RangeFetch`
    async fn fetch_range(&self, handle: &SourceHandle, range: &str) -> Result<CellGrid>;

    /// Fetch every used cell of a worksheet, starting at A1
    async fn fetch_all(&self, handle: &SourceHandle) -> Result<CellGrid>;

    /// Append one row after the last non-empty row of a worksheet
    async fn append_row(&self, handle: &SourceHandle, row: Vec<String>) -> Result<()>;

    /// Titles of all worksheets, in spreadsheet order
    async fn list_source_names(&self) -> Result<Vec<String>>;
}

/// Quote a worksheet title for use in A1 notation
pub(crate) fn a1_notation(title: &str, range: Option<&str>) -> String {
    let quoted = format!("'{}'", title.replace('\'', "''"));
    match range {
        Some(range) => format!("{quoted}!{range}"),
        None => quoted,
    }
}
