//! Evaluated spreadsheet rows

use serde::{Deserialize, Serialize};

/// A well-formed row of a monitored source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row-level identifier
    pub entity_id: String,
    /// Monitored value
    pub value: f64,
    /// Human-readable label used in alert messages
    pub label: String,
}

impl Row {
    /// Create a new row
    pub fn new(entity_id: impl Into<String>, value: f64, label: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            value,
            label: label.into(),
        }
    }

    /// Whether this row's value is strictly above `threshold`
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.value > threshold
    }
}
