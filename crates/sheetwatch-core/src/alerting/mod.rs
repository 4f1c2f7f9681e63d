//! Threshold monitoring and alert suppression
//!
//! A run walks the configured sources in order. Each source's cycle loads
//! the notification history, reads the source's rows, and sends an alert
//! for every row above threshold whose entity is outside its cool-down.

mod evaluator;
mod monitor;
mod notifier;
mod runner;
mod suppression;

pub use evaluator::{parse_value, RowEvaluator};
pub use monitor::{CycleReport, CycleState, SourceMonitor};
pub use notifier::{AlertChannel, LogChannel, SlackChannel};
pub use runner::{MonitorRunner, RunReport, SourceOutcome};
pub use suppression::{Decision, SuppressionPolicy, SuppressionState};
