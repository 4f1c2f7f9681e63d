//! Row evaluation for fetched cell ranges

use tracing::debug;

use crate::models::Row;
use crate::provider::CellGrid;

/// Why a fetched row was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rejection {
    MissingId,
    MissingValue,
    MissingLabel,
    NotNumeric(String),
}

/// Turns raw value/label cells and the parallel id cells into rows.
///
/// Only the first `max_rows` positions are considered. Malformed rows are
/// skipped and logged; they never fail the batch.
#[derive(Debug, Clone, Copy)]
pub struct RowEvaluator {
    max_rows: usize,
}

impl RowEvaluator {
    /// Create an evaluator bounded to `max_rows` rows
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    /// Build rows from `values` (`[value, label]` per row) and `ids`
    /// (`[id]` per row), preserving row order
    pub fn evaluate(&self, source: &str, values: &CellGrid, ids: &CellGrid) -> Vec<Row> {
        let mut rows = Vec::with_capacity(values.len().min(self.max_rows));

        for (index, cells) in values.iter().take(self.max_rows).enumerate() {
            match build_row(cells, ids.get(index)) {
                Ok(row) => rows.push(row),
                Err(reason) => {
                    debug!(source = %source, position = index, reason = ?reason, "Skipping row");
                }
            }
        }

        debug!(source = %source, fetched = values.len(), valid = rows.len(), "Evaluated rows");
        rows
    }
}

impl Default for RowEvaluator {
    fn default() -> Self {
        Self::new(9)
    }
}

fn build_row(cells: &[String], id_cells: Option<&Vec<String>>) -> Result<Row, Rejection> {
    let entity_id = id_cells
        .and_then(|c| c.first())
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .ok_or(Rejection::MissingId)?;

    let raw_value = cells.first().ok_or(Rejection::MissingValue)?;
    let value = parse_value(raw_value).ok_or_else(|| Rejection::NotNumeric(raw_value.clone()))?;

    let label = cells.get(1).ok_or(Rejection::MissingLabel)?;

    Ok(Row::new(entity_id, value, label.as_str()))
}

/// Parse a cell as a finite number, accepting `,` thousands separators
pub fn parse_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
