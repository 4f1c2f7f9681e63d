//! JSON Lines file ledger

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::AlertRecord;

use super::NotificationLedger;

/// Ledger stored as one JSON object per line in a local file
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    /// Create a ledger backed by `path`; the file is created on first append
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

}

#[async_trait]
impl NotificationLedger for FileLedger {
    async fn load_all(&self) -> Result<Vec<AlertRecord>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::store(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let mut records = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AlertRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed ledger line"
                ),
            }
        }

        debug!(path = %self.path.display(), count = records.len(), "Loaded ledger file");
        Ok(records)
    }

    async fn append(&self, record: &AlertRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let write = async {
            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(&self.path)
                .await?;

            // Terminate a line left unfinished by an interrupted write
            if file.metadata().await?.len() > 0 {
                file.seek(SeekFrom::End(-1)).await?;
                if file.read_u8().await? != b'\n' {
                    line.insert(0, '\n');
                }
            }

            file.write_all(line.as_bytes()).await?;
            file.sync_data().await?;
            Ok::<_, std::io::Error>(())
        };

        write.await.map_err(|e| {
            Error::store(format!("failed to append to {}: {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("none.jsonl"));

        assert!(ledger.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let first = FileLedger::new(&path);
        first.append(&AlertRecord::new("LINE", "r1", ts)).await.unwrap();
        first.append(&AlertRecord::new("LINE", "r1", ts)).await.unwrap();

        let reopened = FileLedger::new(&path);
        let records = reopened.load_all().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], AlertRecord::new("LINE", "r1", ts));
    }

    #[tokio::test]
    async fn test_append_after_truncated_line_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(&path, "{\"source\":\"LINE\",\"entity_id\":\"r0\"").unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let ledger = FileLedger::new(&path);
        ledger.append(&AlertRecord::new("LINE", "r1", ts)).await.unwrap();

        assert_eq!(
            ledger.load_all().await.unwrap(),
            vec![AlertRecord::new("LINE", "r1", ts)]
        );
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(
            &path,
            "{\"source\":\"LINE\",\"entity_id\":\"r1\",\"notified_at\":\"2024-03-01T12:00:00Z\"}\nnot json\n\n",
        )
        .unwrap();

        let records = FileLedger::new(&path).load_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity_id, "r1");
    }

    #[tokio::test]
    async fn test_unreadable_path_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path());

        assert!(matches!(
            ledger.load_all().await,
            Err(Error::StoreUnavailable(_))
        ));
    }
}
