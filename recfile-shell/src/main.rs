//! recfile - interactive shell over a fixed-record file
//!
//! Reads single-letter commands from stdin and prints results to stdout.
//! Logs go to stderr.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use recfile_engine::operations::Dispatcher;
use recfile_engine::{CompactionPolicy, Store};

mod config;
mod render;
mod shell;

use config::ShellConfig;

/// recfile - fixed-record binary file store shell
#[derive(Parser, Debug)]
#[command(name = "recfile")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Record file to open or create
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delete strategy for new files (shift, tombstone)
    #[arg(short, long)]
    policy: Option<CompactionPolicy>,

    /// Slot count of a new tombstone-policy file
    #[arg(long)]
    capacity: Option<u32>,

    /// Word printed after each record's attribute
    #[arg(long)]
    unit: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, config: &mut ShellConfig) {
        if let Some(file) = self.file {
            config.file = file;
        }
        if let Some(policy) = self.policy {
            config.store.policy = policy;
        }
        if let Some(capacity) = self.capacity {
            config.store.capacity = capacity;
        }
        if let Some(unit) = self.unit {
            config.unit = unit;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
    }
}

fn main() -> Result<()> {
    let mut args = Args::parse();

    let mut config = match args.config.take() {
        Some(path) => ShellConfig::load(&path)?,
        None => ShellConfig::default(),
    };
    args.apply(&mut config);

    // Set up logging
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let store = Store::open_or_create(&config.file, config.store)
        .with_context(|| format!("cannot open record file {}", config.file.display()))?;

    info!("Starting recfile v{}", env!("CARGO_PKG_VERSION"));
    info!("Record file: {}", config.file.display());
    info!("Policy: {}, {} slots", store.policy(), store.slot_count());

    let mut dispatcher = Dispatcher::new(store);
    let stdin = io::stdin();
    let stdout = io::stdout();
    shell::run(&mut dispatcher, stdin.lock(), stdout.lock(), &config.unit)?;

    info!("Shutdown complete");
    Ok(())
}
