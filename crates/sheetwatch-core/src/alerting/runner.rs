//! One monitoring run across all configured sources

use serde::Serialize;
use tracing::{error, info, warn};

use crate::models::SourceConfig;

use super::monitor::{CycleReport, SourceMonitor};

/// Result of checking one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// The cycle completed
    Checked(CycleReport),
    /// The source could not be read this run
    Failed {
        /// Source name
        source: String,
        /// Error description
        error: String,
    },
}

impl SourceOutcome {
    /// Name of the source this outcome belongs to
    pub fn source(&self) -> &str {
        match self {
            SourceOutcome::Checked(report) => &report.source,
            SourceOutcome::Failed { source, .. } => source,
        }
    }
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Per-source outcomes in check order
    pub outcomes: Vec<SourceOutcome>,
}

impl RunReport {
    /// Sources that could not be checked
    pub fn failed_sources(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SourceOutcome::Failed { .. }))
            .map(SourceOutcome::source)
            .collect()
    }

    /// Total alerts delivered in this run
    pub fn alerts_sent(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                SourceOutcome::Checked(report) => report.alerts_sent,
                SourceOutcome::Failed { .. } => 0,
            })
            .sum()
    }
}

/// Checks every configured source once, in declaration order.
///
/// A source that fails is logged and skipped; it never stops the remaining
/// sources from being checked.
pub struct MonitorRunner {
    monitor: SourceMonitor,
    sources: Vec<SourceConfig>,
    list_sources: bool,
}

impl MonitorRunner {
    /// Create a runner over `sources`
    pub fn new(monitor: SourceMonitor, sources: Vec<SourceConfig>) -> Self {
        Self {
            monitor,
            sources,
            list_sources: false,
        }
    }

    /// Log the provider's worksheet titles after each run
    pub fn with_source_listing(mut self, enabled: bool) -> Self {
        self.list_sources = enabled;
        self
    }

    /// Run one pass over all sources
    pub async fn run(&self) -> RunReport {
        info!(sources = self.sources.len(), "Starting monitoring run");

        let mut report = RunReport::default();

        for source in &self.sources {
            let outcome = match self.monitor.check(source).await {
                Ok(cycle) => SourceOutcome::Checked(cycle),
                Err(e) => {
                    error!(source = %source.name, error = %e, "Source check failed");
                    SourceOutcome::Failed {
                        source: source.name.clone(),
                        error: e.to_string(),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        if self.list_sources {
            self.log_source_names().await;
        }

        info!(
            alerts = report.alerts_sent(),
            failed = report.failed_sources().len(),
            "Monitoring run finished"
        );

        report
    }

    async fn log_source_names(&self) {
        match self.monitor.provider().list_source_names().await {
            Ok(names) => info!(sheets = ?names, "Available worksheets"),
            Err(e) => warn!(error = %e, "Failed to list worksheets"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::evaluator::RowEvaluator;
    use crate::alerting::notifier::LogChannel;
    use crate::alerting::suppression::SuppressionPolicy;
    use crate::clock::SystemClock;
    use crate::ledger::MemoryLedger;
    use crate::provider::MemoryProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failed_source_does_not_stop_run() {
        let provider = Arc::new(MemoryProvider::new());
        provider.insert_sheet(
            "Smartnews",
            vec![vec!["ID", "PV", "Title"], vec!["s1", "350", "Hot"]],
        );
        provider.insert_sheet("LINE", vec![vec!["ID", "PV", "Title"]]);
        provider.fail_fetches("LINE");

        let channel = Arc::new(LogChannel::new());
        let monitor = SourceMonitor::new(
            provider,
            Arc::new(MemoryLedger::new()),
            channel.clone(),
            Arc::new(SystemClock),
            SuppressionPolicy::default(),
            RowEvaluator::default(),
        );

        let runner = MonitorRunner::new(
            monitor,
            vec![
                SourceConfig::new("LINE", 400.0, "{label}"),
                SourceConfig::new("Smartnews", 300.0, "{label}"),
            ],
        )
        .with_source_listing(true);

        let report = runner.run().await;

        assert_eq!(report.failed_sources(), vec!["LINE"]);
        assert_eq!(report.alerts_sent(), 1);
        assert_eq!(report.outcomes[1].source(), "Smartnews");
        assert_eq!(channel.messages(), vec!["Hot"]);
    }
}
