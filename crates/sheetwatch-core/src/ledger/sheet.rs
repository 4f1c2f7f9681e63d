//! Ledger stored in a worksheet of the monitored spreadsheet

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::models::{format_timestamp, parse_timestamp, AlertRecord};
use crate::provider::{CellGrid, SourceHandle, TabularProvider};

use super::NotificationLedger;

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    id: usize,
    source: usize,
    timestamp: usize,
}

impl Columns {
    fn width(&self) -> usize {
        self.id.max(self.source).max(self.timestamp) + 1
    }
}

/// History worksheet with a header row naming the id, source and timestamp
/// columns. Records are read by header name and appended in header order.
pub struct SheetLedger {
    provider: Arc<dyn TabularProvider>,
    worksheet: String,
    id_column: String,
    source_column: String,
    timestamp_column: String,
    columns: Mutex<Option<Columns>>,
}

impl SheetLedger {
    /// Create a ledger over the worksheet named in `config`
    pub fn new(provider: Arc<dyn TabularProvider>, config: &LedgerConfig) -> Self {
        Self {
            provider,
            worksheet: config.worksheet.clone(),
            id_column: config.id_column.clone(),
            source_column: config.source_column.clone(),
            timestamp_column: config.timestamp_column.clone(),
            columns: Mutex::new(None),
        }
    }

    async fn open(&self) -> Result<SourceHandle> {
        self.provider
            .open_source(&self.worksheet)
            .await
            .map_err(|e| Error::store(format!("cannot open '{}': {e}", self.worksheet)))
    }

    /// Whole worksheet, unbounded so a narrow sheet is never out of range
    async fn fetch(&self, handle: &SourceHandle) -> Result<CellGrid> {
        self.provider
            .fetch_all(handle)
            .await
            .map_err(|e| Error::store(format!("cannot read '{}': {e}", self.worksheet)))
    }

    fn resolve_columns(&self, header: &[String]) -> Result<Columns> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| {
                    Error::store(format!(
                        "worksheet '{}' has no '{name}' header column",
                        self.worksheet
                    ))
                })
        };

        Ok(Columns {
            id: find(&self.id_column)?,
            source: find(&self.source_column)?,
            timestamp: find(&self.timestamp_column)?,
        })
    }

    fn default_header(&self) -> Vec<String> {
        vec![
            self.id_column.clone(),
            self.source_column.clone(),
            self.timestamp_column.clone(),
        ]
    }

    /// Column layout for appends, writing a header into an empty worksheet
    async fn columns_for_append(&self, handle: &SourceHandle) -> Result<Columns> {
        let cached = *self.columns.lock();
        if let Some(columns) = cached {
            return Ok(columns);
        }

        let header = self.fetch(handle).await?;
        let columns = match header.first() {
            Some(header) if header.iter().any(|h| !h.trim().is_empty()) => {
                self.resolve_columns(header)?
            }
            _ => {
                info!(worksheet = %self.worksheet, "Writing ledger header row");
                self.provider
                    .append_row(handle, self.default_header())
                    .await
                    .map_err(|e| Error::store(format!("cannot write header: {e}")))?;
                Columns {
                    id: 0,
                    source: 1,
                    timestamp: 2,
                }
            }
        };

        *self.columns.lock() = Some(columns);
        Ok(columns)
    }
}

#[async_trait]
impl NotificationLedger for SheetLedger {
    async fn load_all(&self) -> Result<Vec<AlertRecord>> {
        let handle = self.open().await?;
        let grid = self.fetch(&handle).await?;

        let Some((header, rows)) = grid.split_first() else {
            debug!(worksheet = %self.worksheet, "Ledger worksheet is empty");
            return Ok(Vec::new());
        };

        let columns = self.resolve_columns(header)?;
        *self.columns.lock() = Some(columns);

        let mut records = Vec::with_capacity(rows.len());
        for (offset, row) in rows.iter().enumerate() {
            let entity_id = cell(row, columns.id);
            let source = cell(row, columns.source);
            let raw_ts = cell(row, columns.timestamp);

            if entity_id.is_empty() && source.is_empty() && raw_ts.is_empty() {
                continue;
            }

            let Some(notified_at) = parse_timestamp(raw_ts) else {
                warn!(
                    worksheet = %self.worksheet,
                    row = offset + 2,
                    value = raw_ts,
                    "Skipping ledger row with unparseable timestamp"
                );
                continue;
            };

            if entity_id.is_empty() || source.is_empty() {
                warn!(
                    worksheet = %self.worksheet,
                    row = offset + 2,
                    "Skipping ledger row without id or source"
                );
                continue;
            }

            records.push(AlertRecord::new(source, entity_id, notified_at));
        }

        debug!(worksheet = %self.worksheet, count = records.len(), "Loaded ledger worksheet");
        Ok(records)
    }

    async fn append(&self, record: &AlertRecord) -> Result<()> {
        let handle = self.open().await?;
        let columns = self.columns_for_append(&handle).await?;

        let mut row = vec![String::new(); columns.width()];
        row[columns.id] = record.entity_id.clone();
        row[columns.source] = record.source.clone();
        row[columns.timestamp] = format_timestamp(&record.notified_at);

        self.provider
            .append_row(&handle, row)
            .await
            .map_err(|e| Error::store(format!("cannot append to '{}': {e}", self.worksheet)))?;

        info!(
            source = %record.source,
            entity_id = %record.entity_id,
            notified_at = %record.notified_at,
            "Recorded notification"
        );
        Ok(())
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map_or("", |c| c.trim())
}
