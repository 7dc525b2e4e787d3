//! Skyglow - nighttime-light monitoring loop
//!
//! CLI entry point: triggers cycles, inspects loop state, dispatches
//! notifications, estimates mitigations, and seeds demo data.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use skyglow::cli::{Cli, Command, OutputFormat};
use skyglow::config::Config;
use skyglow::estimator::{self, MitigationRequest};
use skyglow::notify::{Notifier, channel_from_config};
use skyglow::r#loop::CycleDriver;
use skyglow::seed;
use skyglow::source::StoreMetricSource;
use skyglow::state::{LoopTracker, StateManager};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref())
        .context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Cycle {
            period,
            shielding_pct,
            retrofit_pct,
            format,
        } => cmd_cycle(&config, period, shielding_pct.zip(retrofit_pct), format).await,
        Command::Status { format } => cmd_status(&config, format).await,
        Command::Alerts { unsent, format } => cmd_alerts(&config, unsent, format).await,
        Command::Events { limit, format } => cmd_events(&config, limit, format).await,
        Command::Notify { format } => cmd_notify(&config, format).await,
        Command::Estimate {
            shielding_pct,
            retrofit_pct,
            format,
        } => cmd_estimate(shielding_pct, retrofit_pct, format),
        Command::Seed { seed } => cmd_seed(&config, seed).await,
    }
}

fn open_state(config: &Config) -> Result<StateManager> {
    let store_dir = PathBuf::from(&config.storage.store_dir);
    StateManager::spawn(&store_dir).context("Failed to spawn StateManager")
}

fn build_notifier(config: &Config, state: StateManager) -> Notifier {
    let channel = channel_from_config(&config.notify);
    Notifier::new(state, channel, &config.notify.to)
}

/// Trigger one monitoring cycle
async fn cmd_cycle(
    config: &Config,
    period: Option<String>,
    mitigation_pcts: Option<(f64, f64)>,
    format: OutputFormat,
) -> Result<()> {
    debug!(?period, ?mitigation_pcts, "cmd_cycle: called");

    let mitigation = match mitigation_pcts {
        Some((shielding_pct, retrofit_pct)) => {
            let request = MitigationRequest {
                shielding_pct,
                retrofit_pct,
            };
            // A rejected request never touches loop state
            request.validate()?;
            Some(request)
        }
        None => None,
    };

    let state = open_state(config)?;
    let tracker = LoopTracker::new();
    let source = Arc::new(StoreMetricSource::new(state.clone()));
    let notifier = build_notifier(config, state.clone());
    let driver = CycleDriver::new(state.clone(), tracker.clone(), source, notifier);

    let period = period.unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());
    let report = driver.run_cycle_with(&period, mitigation).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Cycle {} complete", report.period);
            println!("  Readings:       {}", report.readings);
            println!("  Alerts created: {}", report.alerts_created);
            println!("  Alerts sent:    {}", report.alerts_sent);
            println!("  Send failures:  {}", report.send_failures);
            if let Some(estimate) = &report.mitigation {
                println!(
                    "  Mitigation:     {:.2} nW/cm²/sr predicted drop",
                    estimate.predicted_drop
                );
            }
            if !report.errors.is_empty() {
                println!("  Errors:");
                for error in &report.errors {
                    println!("    - {}", error);
                }
            }
        }
    }

    Ok(())
}

/// Show the loop state snapshot and alert counts
async fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    debug!("cmd_status: called");
    let state = open_state(config)?;
    let tracker = LoopTracker::new();
    let snapshot = tracker.snapshot();
    let counts = state.alert_counts().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "loop": snapshot,
                "alerts": counts,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Skyglow Status");
            println!("--------------");
            println!("Last sense:  {}", fmt_ts(snapshot.last_sense));
            println!("Last reason: {}", fmt_ts(snapshot.last_reason));
            println!("Last act:    {}", fmt_ts(snapshot.last_act));
            println!("Last learn:  {}", fmt_ts(snapshot.last_learn));
            println!("Queue depth: {}", snapshot.queue_depth);
            println!();
            println!("Alerts: {} total, {} unsent", counts.total, counts.unsent);
        }
    }

    Ok(())
}

/// List alerts
async fn cmd_alerts(config: &Config, unsent: bool, format: OutputFormat) -> Result<()> {
    debug!(unsent, "cmd_alerts: called");
    let state = open_state(config)?;
    let alerts = if unsent {
        state.list_unsent().await?
    } else {
        state.list_alerts().await?
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&alerts)?);
        }
        OutputFormat::Text => {
            if alerts.is_empty() {
                println!("No alerts{}", if unsent { " awaiting dispatch" } else { "" });
                return Ok(());
            }
            println!("{:<40} {:<20} {:<8} {:<6}", "ID", "CODE", "SEVERITY", "SENT");
            println!("{}", "-".repeat(78));
            for alert in alerts {
                println!(
                    "{:<40} {:<20} {:<8} {:<6}",
                    alert.id,
                    alert.code,
                    alert.severity.to_string(),
                    if alert.is_sent() { "yes" } else { "no" }
                );
            }
        }
    }

    Ok(())
}

/// Show recent cycle events
async fn cmd_events(config: &Config, limit: usize, format: OutputFormat) -> Result<()> {
    debug!(limit, "cmd_events: called");
    let state = open_state(config)?;
    let events = state.recent_events(limit).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        OutputFormat::Text => {
            if events.is_empty() {
                println!("No cycle events recorded yet");
                return Ok(());
            }
            for event in events {
                println!(
                    "{}  {:<6} {:<7} {}",
                    fmt_ts(Some(event.at)),
                    event.phase.to_string(),
                    event.status.to_string(),
                    event.message
                );
            }
        }
    }

    Ok(())
}

/// Dispatch notifications for unsent alerts
async fn cmd_notify(config: &Config, format: OutputFormat) -> Result<()> {
    debug!("cmd_notify: called");
    let state = open_state(config)?;
    let notifier = build_notifier(config, state.clone());

    let report = notifier.run().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "Notified {} alerts ({} sent, {} failed, {} already sent)",
                report.processed, report.sent, report.failed, report.conflicts
            );
        }
    }

    Ok(())
}

/// Estimate the radiance drop for proposed mitigations
fn cmd_estimate(shielding_pct: f64, retrofit_pct: f64, format: OutputFormat) -> Result<()> {
    debug!(shielding_pct, retrofit_pct, "cmd_estimate: called");

    let request = MitigationRequest {
        shielding_pct,
        retrofit_pct,
    };
    // A rejected request never touches loop state
    request.validate()?;

    let estimate = estimator::estimate(request.shielding_pct, request.retrofit_pct);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
        OutputFormat::Text => {
            println!(
                "Predicted drop: {:.2} nW/cm²/sr ({:.0}% of baseline)",
                estimate.predicted_drop,
                estimate.drop_fraction * 100.0
            );
        }
    }

    Ok(())
}

/// Populate the store with a deterministic synthetic dataset
async fn cmd_seed(config: &Config, seed_value: u64) -> Result<()> {
    debug!(seed_value, "cmd_seed: called");
    let state = open_state(config)?;

    let dataset = seed::build_seed_data(seed_value);
    let (metrics, alerts, events) = seed::apply(&dataset, &state).await?;

    println!("Seeded store with seed {}", seed_value);
    println!("  Sources:  {} (catalog only)", dataset.sources.len());
    println!("  Entities: {} (catalog only)", dataset.entities.len());
    println!("  Metrics:  {}", metrics);
    println!("  Alerts:   {}", alerts);
    println!("  Events:   {}", events);

    Ok(())
}

fn fmt_ts(ts_ms: Option<i64>) -> String {
    match ts_ms.and_then(chrono::DateTime::from_timestamp_millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "-".to_string(),
    }
}
