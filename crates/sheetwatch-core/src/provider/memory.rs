//! In-memory worksheet grid

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::{a1_notation, CellGrid, SourceHandle, TabularProvider};

/// A spreadsheet held in memory.
///
/// Ranges are resolved against each worksheet's grid the way the Sheets API
/// does it: trailing empty cells and rows are omitted from results.
#[derive(Default)]
pub struct MemoryProvider {
    sheets: Mutex<Vec<(String, CellGrid)>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryProvider {
    /// Create an empty spreadsheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a worksheet; `rows` starts at cell A1
    pub fn insert_sheet<R, C>(&self, title: &str, rows: R)
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let grid: CellGrid = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();

        let mut sheets = self.sheets.lock();
        match sheets.iter_mut().find(|(t, _)| t == title) {
            Some((_, existing)) => *existing = grid,
            None => sheets.push((title.to_string(), grid)),
        }
    }

    /// Make every range fetch against `title` fail
    pub fn fail_fetches(&self, title: &str) {
        self.failing.lock().insert(title.to_string());
    }

    /// Current contents of a worksheet
    pub fn sheet(&self, title: &str) -> Option<CellGrid> {
        self.sheets
            .lock()
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, grid)| grid.clone())
    }
}

#[async_trait]
impl TabularProvider for MemoryProvider {
    async fn open_source(&self, name: &str) -> Result<SourceHandle> {
        if self.sheets.lock().iter().any(|(t, _)| t == name) {
            Ok(SourceHandle::new(name))
        } else {
            Err(Error::SourceNotFound(name.to_string()))
        }
    }

    async fn fetch_range(&self, handle: &SourceHandle, range: &str) -> Result<CellGrid> {
        if self.failing.lock().contains(&handle.title) {
            return Err(Error::range_fetch(&handle.title, range, "simulated failure"));
        }

        let bounds = A1Range::parse(range)
            .ok_or_else(|| Error::range_fetch(&handle.title, range, "invalid A1 range"))?;

        let grid = self
            .sheet(&handle.title)
            .ok_or_else(|| Error::SourceNotFound(handle.title.clone()))?;

        Ok(bounds.slice(&grid))
    }

    async fn fetch_all(&self, handle: &SourceHandle) -> Result<CellGrid> {
        if self.failing.lock().contains(&handle.title) {
            let a1 = a1_notation(&handle.title, None);
            return Err(Error::range_fetch(&handle.title, a1, "simulated failure"));
        }

        let grid = self
            .sheet(&handle.title)
            .ok_or_else(|| Error::SourceNotFound(handle.title.clone()))?;

        Ok(trim_grid(grid))
    }

    async fn append_row(&self, handle: &SourceHandle, row: Vec<String>) -> Result<()> {
        let mut sheets = self.sheets.lock();
        let (_, grid) = sheets
            .iter_mut()
            .find(|(t, _)| *t == handle.title)
            .ok_or_else(|| Error::SourceNotFound(handle.title.clone()))?;

        while grid.last().is_some_and(|r| r.iter().all(String::is_empty)) {
            grid.pop();
        }
        grid.push(row);
        Ok(())
    }

    async fn list_source_names(&self) -> Result<Vec<String>> {
        Ok(self.sheets.lock().iter().map(|(t, _)| t.clone()).collect())
    }
}

/// Zero-based, inclusive cell bounds parsed from A1 notation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct A1Range {
    start_col: usize,
    start_row: usize,
    end_col: usize,
    end_row: Option<usize>,
}

impl A1Range {
    fn parse(range: &str) -> Option<Self> {
        let (start, end) = range.split_once(':').unwrap_or((range, range));
        let (start_col, start_row) = parse_cell(start)?;
        let (end_col, end_row) = parse_cell(end)?;

        let start_row = start_row.unwrap_or(0);
        if end_col < start_col || end_row.is_some_and(|r| r < start_row) {
            return None;
        }

        Some(Self {
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    fn slice(&self, grid: &CellGrid) -> CellGrid {
        let last_row = match self.end_row {
            Some(r) => r.min(grid.len().saturating_sub(1)),
            None => grid.len().saturating_sub(1),
        };

        let out: CellGrid = grid
            .iter()
            .enumerate()
            .filter(|(i, _)| *i >= self.start_row && *i <= last_row)
            .map(|(_, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(j, _)| *j >= self.start_col && *j <= self.end_col)
                    .map(|(_, c)| c.clone())
                    .collect()
            })
            .collect();

        trim_grid(out)
    }
}

/// Drop trailing empty cells and rows, as the Sheets API omits them
fn trim_grid(mut grid: CellGrid) -> CellGrid {
    for row in &mut grid {
        while row.last().is_some_and(String::is_empty) {
            row.pop();
        }
    }
    while grid.last().is_some_and(Vec::is_empty) {
        grid.pop();
    }
    grid
}

/// Parse `B2` or `B` into a zero-based column and optional row
fn parse_cell(cell: &str) -> Option<(usize, Option<usize>)> {
    let cell = cell.trim();
    let split = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);

    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters
        .chars()
        .try_fold(0usize, |acc, c| {
            let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })?
        - 1;

    let row = if digits.is_empty() {
        None
    } else {
        let n: usize = digits.parse().ok()?;
        Some(n.checked_sub(1)?)
    };

    Some((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryProvider {
        let provider = MemoryProvider::new();
        provider.insert_sheet(
            "LINE",
            vec![
                vec!["id", "pv", "title"],
                vec!["r1", "450", "Story X"],
                vec!["r2", "120", "Story Y"],
            ],
        );
        provider
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("A1"), Some((0, Some(0))));
        assert_eq!(parse_cell("D10"), Some((3, Some(9))));
        assert_eq!(parse_cell("AA"), Some((26, None)));
        assert_eq!(parse_cell("A0"), None);
        assert_eq!(parse_cell("12"), None);
        assert_eq!(parse_cell(&"Z".repeat(40)), None);
    }

    #[tokio::test]
    async fn test_fetch_range_slices_grid() {
        let provider = sample();
        let handle = provider.open_source("LINE").await.unwrap();

        let values = provider.fetch_range(&handle, "B2:D10").await.unwrap();
        assert_eq!(
            values,
            vec![vec!["450".to_string(), "Story X".to_string()], vec!["120".to_string(), "Story Y".to_string()]]
        );

        let ids = provider.fetch_range(&handle, "A2:A10").await.unwrap();
        assert_eq!(ids, vec![vec!["r1".to_string()], vec!["r2".to_string()]]);
    }

    #[tokio::test]
    async fn test_fetch_all_returns_used_cells() {
        let provider = MemoryProvider::new();
        provider.insert_sheet(
            "通知履歴",
            vec![
                vec!["ID", "シート名", "通知日時", ""],
                vec!["r1", "LINE", "2024-03-01T12:00:00Z", ""],
                vec!["", "", "", ""],
            ],
        );
        let handle = provider.open_source("通知履歴").await.unwrap();

        let grid = provider.fetch_all(&handle).await.unwrap();

        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0], vec!["ID", "シート名", "通知日時"]);
    }

    #[tokio::test]
    async fn test_unknown_sheet() {
        let provider = sample();
        assert!(matches!(
            provider.open_source("Missing").await,
            Err(Error::SourceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_append_row_after_last_row() {
        let provider = sample();
        let handle = provider.open_source("LINE").await.unwrap();

        provider
            .append_row(&handle, vec!["r3".to_string(), "1".to_string()])
            .await
            .unwrap();

        let grid = provider.sheet("LINE").unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[3][0], "r3");
    }

    #[tokio::test]
    async fn test_simulated_failure() {
        let provider = sample();
        provider.fail_fetches("LINE");
        let handle = provider.open_source("LINE").await.unwrap();

        assert!(matches!(
            provider.fetch_range(&handle, "A1:A2").await,
            Err(Error::RangeFetch { .. })
        ));
    }
}
