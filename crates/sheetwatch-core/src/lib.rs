//! # Sheetwatch
//!
//! Threshold monitor for spreadsheet rows.
//!
//! Sheetwatch reads a bounded range of rows from each configured worksheet,
//! compares every row's value with the worksheet's threshold, and posts an
//! alert to a chat webhook when the value is exceeded. Alerts for the same
//! row are suppressed for a cool-down window using a durable, append-only
//! notification history.
//!
//! ## Architecture
//!
//! - **Provider**: worksheet access (Google Sheets REST, or in memory)
//! - **Ledger**: append-only notification history (worksheet, JSON Lines file, or in memory)
//! - **Alerting**: row evaluation, suppression, per-source cycles and the run loop
//!
//! ## Quick Start
//!
//! ```bash
//! # One pass over all configured sources
//! SPREADSHEET_KEY=... GOOGLE_ACCESS_TOKEN=... SLACK_WEBHOOK_URL=... sheetwatch run
//!
//! # Evaluate without posting or recording anything
//! sheetwatch run --dry-run
//! ```
//!
//! Sheetwatch performs one pass per invocation; schedule it externally for
//! continuous monitoring, and never let two invocations overlap.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod provider;

pub use config::Config;
pub use error::{Error, Result};
