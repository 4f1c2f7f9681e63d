//! Cool-down based alert suppression

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::AlertRecord;

/// Outcome of a suppression check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No recent alert for this entity
    Allow,
    /// An alert was sent within the cool-down window
    Suppress {
        /// Latest notification for the entity
        last_notified: DateTime<Utc>,
        /// Time left until the entity may alert again
        remaining: Duration,
    },
}

impl Decision {
    /// Whether an alert may be sent
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Latest notification time per `(source, entity_id)`, derived from a ledger
/// snapshot. Duplicate keys keep the maximum timestamp regardless of the
/// order records were read in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionState {
    latest: HashMap<(String, String), DateTime<Utc>>,
}

impl SuppressionState {
    /// Build the state from a ledger snapshot
    pub fn from_records(records: &[AlertRecord]) -> Self {
        let mut state = Self::default();
        for record in records {
            state.record(&record.source, &record.entity_id, record.notified_at);
        }
        state
    }

    /// Note a notification, keeping the later of the old and new timestamps
    pub fn record(&mut self, source: &str, entity_id: &str, at: DateTime<Utc>) {
        self.latest
            .entry((source.to_string(), entity_id.to_string()))
            .and_modify(|ts| *ts = (*ts).max(at))
            .or_insert(at);
    }

    /// Latest notification for an entity
    pub fn latest(&self, source: &str, entity_id: &str) -> Option<DateTime<Utc>> {
        self.latest
            .get(&(source.to_string(), entity_id.to_string()))
            .copied()
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    /// Whether no keys are tracked
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Iterate over `(source, entity_id, latest timestamp)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, DateTime<Utc>)> {
        self.latest
            .iter()
            .map(|((source, id), ts)| (source.as_str(), id.as_str(), *ts))
    }
}

/// Decides whether an entity may alert again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionPolicy {
    cool_down: Duration,
}

impl SuppressionPolicy {
    /// Create a policy with a fixed cool-down
    pub fn new(cool_down: Duration) -> Self {
        Self { cool_down }
    }

    /// The configured cool-down
    pub fn cool_down(&self) -> Duration {
        self.cool_down
    }

    /// Decide for one entity at `now`.
    ///
    /// Exactly `cool_down` elapsed is allowed. A last notification in the
    /// future counts as not yet elapsed.
    pub fn decide(
        &self,
        state: &SuppressionState,
        source: &str,
        entity_id: &str,
        now: DateTime<Utc>,
    ) -> Decision {
        let Some(last_notified) = state.latest(source, entity_id) else {
            return Decision::Allow;
        };

        match (now - last_notified).to_std() {
            Ok(elapsed) if elapsed >= self.cool_down => Decision::Allow,
            Ok(elapsed) => Decision::Suppress {
                last_notified,
                remaining: self.cool_down - elapsed,
            },
            Err(_) => Decision::Suppress {
                last_notified,
                remaining: self.cool_down + (last_notified - now).to_std().unwrap_or_default(),
            },
        }
    }
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(6 * 3600))
    }
}
