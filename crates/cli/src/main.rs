//! dirflow - run file system rules from a configuration file
//!
//! This binary provides the command-line interface for the dirflow engine.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dirflow_core::config::Config;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dirflow")]
#[command(about = "Run rules against file system changes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch every configured directory until Ctrl-C
    Watch,
    /// Validate the configuration and print the configured rules
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    match cli.command {
        Some(Commands::Watch) => watch(cli.config.as_deref()).await,
        Some(Commands::Check) => check(cli.config.as_deref()),
        None => {
            println!("Run 'dirflow watch' to start watching, or --help for more options");
            Ok(())
        }
    }
}

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dirflow={level},dirflow_core={level},dirflow_watcher={level}"
        ))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn check(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    println!("Configuration is valid");
    for line in dirflow::describe(&config) {
        println!("{line}");
    }
    Ok(())
}

async fn watch(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let mut watchers = dirflow::start_watchers(&config)
        .await
        .context("Failed to start watchers")?;
    info!("Watching {} directories, press Ctrl-C to stop", watchers.len());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    for watcher in &mut watchers {
        if let Err(e) = watcher.stop() {
            warn!("Failed to stop watcher for {}: {e}", watcher.root().display());
        }
    }

    Ok(())
}
