//! Sheetwatch CLI
//!
//! Runs one monitoring pass per invocation, plus a couple of diagnostic
//! commands.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use sheetwatch::alerting::{
    AlertChannel, LogChannel, MonitorRunner, RowEvaluator, SlackChannel, SourceMonitor,
    SuppressionPolicy, SuppressionState,
};
use sheetwatch::clock::SystemClock;
use sheetwatch::config::{Config, LoggingConfig};
use sheetwatch::ledger::{self, MemoryLedger, NotificationLedger};
use sheetwatch::models::{format_timestamp, suppression_key};
use sheetwatch::provider::{GoogleSheetsClient, TabularProvider};

/// Sheetwatch - threshold alerts for spreadsheet rows
#[derive(Parser)]
#[command(name = "sheetwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SHEETWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that print results)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Spreadsheet identifier
    #[arg(long, global = true, env = "SPREADSHEET_KEY", hide_env_values = true)]
    spreadsheet_key: Option<String>,

    /// OAuth bearer token for the Sheets API
    #[arg(long, global = true, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Slack incoming webhook URL
    #[arg(long, global = true, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    webhook_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every configured source once (the default)
    Run {
        /// Evaluate and log alerts without sending or recording them
        #[arg(long)]
        dry_run: bool,

        /// Override the cool-down window (e.g. "6h", "90m")
        #[arg(long, value_parser = humantime::parse_duration)]
        cool_down: Option<Duration>,
    },

    /// List the spreadsheet's worksheets
    Sources,

    /// Show the latest notification per entity
    History {
        /// Only show entries for this source
        #[arg(long)]
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging, cli.verbose);

    let command = cli.command.unwrap_or(Commands::Run {
        dry_run: false,
        cool_down: None,
    });

    let result = match command {
        Commands::Run { dry_run, cool_down } => {
            run_monitor(config, dry_run, cool_down, cli.format).await
        }
        Commands::Sources => run_sources(config, cli.format).await,
        Commands::History { source } => run_history(config, source, cli.format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> sheetwatch::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(key) = &cli.spreadsheet_key {
        config.provider.spreadsheet_id = Some(key.clone());
    }
    if let Some(token) = &cli.access_token {
        config.provider.access_token = Some(token.clone());
    }
    if let Some(url) = &cli.webhook_url {
        config.channel.webhook_url = Some(url.clone());
    }

    Ok(config)
}

fn init_logging(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn TabularProvider>> {
    config.spreadsheet_id()?;
    config.access_token()?;
    Ok(Arc::new(GoogleSheetsClient::new(&config.provider)?))
}

async fn run_monitor(
    config: Config,
    dry_run: bool,
    cool_down: Option<Duration>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let provider = build_provider(&config)?;
    let history = ledger::from_config(&config, provider.clone());

    let (history, channel): (Arc<dyn NotificationLedger>, Arc<dyn AlertChannel>) = if dry_run {
        info!("Dry run: alerts are logged, history is not written");
        let records = history.load_all().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load notification history");
            Vec::new()
        });
        (
            Arc::new(MemoryLedger::with_records(records)),
            Arc::new(LogChannel::new()),
        )
    } else {
        config.webhook_url()?;
        (history, Arc::new(SlackChannel::new(&config.channel)?))
    };

    let policy = SuppressionPolicy::new(cool_down.unwrap_or(config.monitor.cool_down));
    info!(
        cool_down = %humantime::format_duration(policy.cool_down()),
        "Suppression window"
    );

    let monitor = SourceMonitor::new(
        provider,
        history,
        channel,
        Arc::new(SystemClock),
        policy,
        RowEvaluator::new(config.monitor.max_rows),
    );

    let runner = MonitorRunner::new(monitor, config.sources.clone())
        .with_source_listing(config.monitor.list_sources);

    let report = runner.run().await;

    let failed = report.failed_sources();
    if !failed.is_empty() {
        warn!(sources = ?failed, "Some sources could not be checked");
    }

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

async fn run_sources(config: Config, format: OutputFormat) -> anyhow::Result<()> {
    let provider = build_provider(&config)?;
    let names = provider.list_source_names().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
        OutputFormat::Text => {
            for name in names {
                let marker = if config.sources.iter().any(|s| s.name == name) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {name}");
            }
        }
    }

    Ok(())
}

async fn run_history(
    config: Config,
    source: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let history: Arc<dyn NotificationLedger> = match config.ledger.backend {
        sheetwatch::config::LedgerBackend::File => {
            Arc::new(ledger::FileLedger::new(&config.ledger.path))
        }
        sheetwatch::config::LedgerBackend::Sheet => {
            ledger::from_config(&config, build_provider(&config)?)
        }
    };

    let records: Vec<_> = history
        .load_all()
        .await?
        .into_iter()
        .filter(|r| source.as_deref().map_or(true, |s| r.source == s))
        .collect();

    let state = SuppressionState::from_records(&records);
    let cool_down = chrono::Duration::from_std(config.monitor.cool_down)?;

    let mut entries: Vec<_> = state.iter().collect();
    entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    match format {
        OutputFormat::Json => {
            let json: Vec<_> = entries
                .iter()
                .map(|&(source, entity_id, last)| {
                    serde_json::json!({
                        "key": suppression_key(source, entity_id),
                        "source": source,
                        "entity_id": entity_id,
                        "last_notified": format_timestamp(&last),
                        "eligible_at": format_timestamp(&(last + cool_down)),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{} records, {} entities", records.len(), entries.len());
            for (source, entity_id, last) in entries {
                println!(
                    "{}\t{}\teligible at {}",
                    suppression_key(source, entity_id),
                    format_timestamp(&last),
                    format_timestamp(&(last + cool_down))
                );
            }
        }
    }

    Ok(())
}
