//! trainstat CLI — report the status of an interrupted training run.
//!
//! Run it from the directory the training loop writes into. It always exits 0:
//! anything it cannot read is reported inline as a warning.

use clap::Parser;
use std::fmt::Display;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use trainstat_core::{ConfigOverrides, InspectorConfig, StatusInspector};

/// Check checkpoints, saved models, and the dataset of a training run
#[derive(Parser, Debug)]
#[command(name = "trainstat", version, about, long_about = None)]
struct Cli {
    /// Workspace directory containing checkpoints/ and saved_models/
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Total number of epochs the run is configured for
    #[arg(long)]
    total_epochs: Option<u64>,

    /// Estimated hours per epoch
    #[arg(long)]
    hours_per_epoch: Option<f64>,

    /// Dataset directory to check for
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// List every checkpoint, not only the latest
    #[arg(long)]
    all: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            total_epochs: self.total_epochs,
            hours_per_epoch: self.hours_per_epoch,
            // Relative to the shell, not the inspected workspace.
            dataset_path: self
                .dataset
                .as_ref()
                .map(|p| std::path::absolute(p).unwrap_or_else(|_| p.clone())),
        }
    }
}

/// Human-readable stderr logging, plus JSON file logging when `TRAINSTAT_LOG_DIR` is set.
fn init_tracing(verbose: u8, quiet: bool) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let mut guard = None;
    let json_layer = std::env::var_os("TRAINSTAT_LOG_DIR").and_then(|dir| {
        let log_dir = PathBuf::from(dir);
        std::fs::create_dir_all(&log_dir).ok()?;
        let file_appender = tracing_appender::rolling::daily(&log_dir, "trainstat.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("debug")),
        )
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

/// Load layered configuration, falling back to defaults so the report still runs.
fn resolve_config(workspace: &Path, cli: &Cli) -> InspectorConfig {
    let overrides = cli.overrides();
    let loaded = trainstat_core::load_config(Some(workspace), cli.config.as_deref(), Some(&overrides))
        .map_err(|e| trainstat_core::StatusError::config(e.to_string()))
        .and_then(|config| config.validate().map(|()| config));

    match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Falling back to default configuration");
            eprintln!("Warning: {e}. Using defaults.");
            let mut config = InspectorConfig::default();
            overrides.apply_to(&mut config);
            if config.validate().is_err() {
                config = InspectorConfig::default();
            }
            config
        }
    }
}

/// Write `text` to `out`. A reader that went away (`trainstat | head`) ends output quietly.
fn emit(out: &mut impl Write, text: impl Display) -> io::Result<()> {
    match write!(out, "{text}").and_then(|()| out.flush()) {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            tracing::debug!("stdout closed early");
            Ok(())
        }
        other => other,
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.quiet);

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| cli.workspace.clone());

    let config = resolve_config(&workspace, &cli);

    if cli.print_config {
        match toml::to_string_pretty(&config) {
            Ok(toml_str) => emit(&mut io::stdout().lock(), format_args!("{toml_str}\n"))?,
            Err(e) => eprintln!("Warning: could not render configuration: {e}"),
        }
        return Ok(());
    }

    let report = StatusInspector::new(workspace, config)
        .with_listing(cli.all)
        .inspect();
    emit(&mut io::stdout().lock(), &report)?;

    tracing::debug!(warnings = report.warning_count(), "Status check finished");
    Ok(())
}
