//! Check cycle for a single source

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::ledger::NotificationLedger;
use crate::models::{AlertRecord, SourceConfig};
use crate::provider::{CellGrid, TabularProvider};

use super::evaluator::RowEvaluator;
use super::notifier::AlertChannel;
use super::suppression::{Decision, SuppressionPolicy, SuppressionState};

/// States of one check cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// Opening the source and reading its ranges
    Fetching,
    /// Turning cells into rows
    Evaluating,
    /// Consulting the suppression policy and threshold for a row
    Deciding,
    /// Sending an alert
    Dispatching,
    /// Appending the alert to the ledger
    Recording,
    /// All rows handled
    Done,
    /// The source could not be read
    Failed,
}

impl CycleState {
    /// Whether the cycle may move from `self` to `next`
    pub fn can_transition_to(self, next: CycleState) -> bool {
        use CycleState::*;

        matches!(
            (self, next),
            (Fetching, Evaluating)
                | (Fetching, Failed)
                | (Evaluating, Deciding)
                | (Evaluating, Done)
                | (Deciding, Deciding)
                | (Deciding, Dispatching)
                | (Deciding, Done)
                | (Dispatching, Recording)
                | (Dispatching, Deciding)
                | (Dispatching, Done)
                | (Recording, Deciding)
                | (Recording, Done)
        )
    }
}

/// Tracks the state of a running cycle
#[derive(Debug)]
struct Cycle<'a> {
    source: &'a str,
    state: CycleState,
}

impl<'a> Cycle<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            state: CycleState::Fetching,
        }
    }

    fn advance(&mut self, next: CycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid cycle transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(source = %self.source, from = ?self.state, to = ?next, "Cycle transition");
        self.state = next;
    }
}

/// Summary of a completed cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Source name
    pub source: String,
    /// Whether the ledger snapshot could be loaded
    pub history_available: bool,
    /// Well-formed rows
    pub rows_evaluated: usize,
    /// Alerts delivered
    pub alerts_sent: usize,
    /// Rows inside their cool-down window
    pub suppressed: usize,
    /// Rows at or below the threshold
    pub below_threshold: usize,
    /// Alerts the channel failed to deliver
    pub dispatch_failures: usize,
    /// Delivered alerts the ledger failed to record
    pub record_failures: usize,
    /// State the cycle ended in
    pub final_state: CycleState,
}

impl CycleReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            history_available: false,
            rows_evaluated: 0,
            alerts_sent: 0,
            suppressed: 0,
            below_threshold: 0,
            dispatch_failures: 0,
            record_failures: 0,
            final_state: CycleState::Fetching,
        }
    }
}

/// Runs check cycles against the shared provider, ledger and channel
pub struct SourceMonitor {
    provider: Arc<dyn TabularProvider>,
    ledger: Arc<dyn NotificationLedger>,
    channel: Arc<dyn AlertChannel>,
    clock: Arc<dyn Clock>,
    policy: SuppressionPolicy,
    evaluator: RowEvaluator,
}

impl SourceMonitor {
    /// Create a monitor
    pub fn new(
        provider: Arc<dyn TabularProvider>,
        ledger: Arc<dyn NotificationLedger>,
        channel: Arc<dyn AlertChannel>,
        clock: Arc<dyn Clock>,
        policy: SuppressionPolicy,
        evaluator: RowEvaluator,
    ) -> Self {
        Self {
            provider,
            ledger,
            channel,
            clock,
            policy,
            evaluator,
        }
    }

    /// The provider sources are read from
    pub fn provider(&self) -> &Arc<dyn TabularProvider> {
        &self.provider
    }

    /// Run one check cycle.
    ///
    /// Only a failure to read the source is returned as an error. Ledger and
    /// dispatch failures are logged and counted in the report.
    pub async fn check(&self, source: &SourceConfig) -> Result<CycleReport> {
        let mut cycle = Cycle::new(&source.name);
        let mut report = CycleReport::new(&source.name);

        let mut state = self.load_history(source, &mut report).await;

        let (values, ids) = match self.fetch(source).await {
            Ok(cells) => cells,
            Err(e) => {
                cycle.advance(CycleState::Failed);
                return Err(e);
            }
        };

        cycle.advance(CycleState::Evaluating);
        let rows = self.evaluator.evaluate(&source.name, &values, &ids);
        report.rows_evaluated = rows.len();

        for row in &rows {
            cycle.advance(CycleState::Deciding);

            debug!(
                source = %source.name,
                entity_id = %row.entity_id,
                value = row.value,
                label = %row.label,
                "Checking row"
            );

            let now = self.clock.now();
            if let Decision::Suppress {
                last_notified,
                remaining,
            } = self.policy.decide(&state, &source.name, &row.entity_id, now)
            {
                debug!(
                    source = %source.name,
                    entity_id = %row.entity_id,
                    last_notified = %last_notified,
                    remaining = %humantime::format_duration(remaining),
                    "Notified recently, skipping"
                );
                report.suppressed += 1;
                continue;
            }

            if !row.exceeds(source.threshold) {
                report.below_threshold += 1;
                continue;
            }

            cycle.advance(CycleState::Dispatching);
            let message = source.render_message(&row.label);

            if let Err(e) = self.channel.dispatch(&message).await {
                warn!(
                    source = %source.name,
                    entity_id = %row.entity_id,
                    error = %e,
                    "Failed to send alert, will retry next cycle"
                );
                report.dispatch_failures += 1;
                continue;
            }

            let notified_at = self.clock.now();
            report.alerts_sent += 1;
            info!(
                source = %source.name,
                entity_id = %row.entity_id,
                label = %row.label,
                value = row.value,
                threshold = source.threshold,
                "Alert sent"
            );

            cycle.advance(CycleState::Recording);
            state.record(&source.name, &row.entity_id, notified_at);

            let record = AlertRecord::new(&source.name, &row.entity_id, notified_at);
            if let Err(e) = self.ledger.append(&record).await {
                warn!(
                    source = %source.name,
                    entity_id = %row.entity_id,
                    error = %e,
                    "Failed to record notification; entity may alert again next run"
                );
                report.record_failures += 1;
            }
        }

        cycle.advance(CycleState::Done);
        report.final_state = cycle.state;

        info!(
            source = %source.name,
            rows = report.rows_evaluated,
            sent = report.alerts_sent,
            suppressed = report.suppressed,
            "Source checked"
        );

        Ok(report)
    }

    /// Load the ledger snapshot for this cycle, falling back to no history
    async fn load_history(&self, source: &SourceConfig, report: &mut CycleReport) -> SuppressionState {
        match self.ledger.load_all().await {
            Ok(records) => {
                report.history_available = true;
                let state = SuppressionState::from_records(&records);
                debug!(
                    source = %source.name,
                    records = records.len(),
                    keys = state.len(),
                    "Loaded notification history"
                );
                state
            }
            Err(e) => {
                warn!(
                    source = %source.name,
                    error = %e,
                    "Failed to load notification history, continuing without suppression"
                );
                SuppressionState::default()
            }
        }
    }

    async fn fetch(&self, source: &SourceConfig) -> Result<(CellGrid, CellGrid)> {
        let handle = self.provider.open_source(&source.name).await?;
        info!(source = %source.name, sheet_id = ?handle.sheet_id, "Opened source");

        let values = self.provider.fetch_range(&handle, &source.value_range).await?;
        let ids = self.provider.fetch_range(&handle, &source.id_range).await?;

        Ok((values, ids))
    }
}
