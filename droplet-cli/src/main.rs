use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod config;

use cli::{Args, Mode};
use config::Config;

/// Initialize tracing with dual output:
/// 1. Console output (stderr) - progress while a call blocks
/// 2. File output (~/.droplet-provider/provider.log) - persistent history
fn initialize_tracing() -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,droplet_lifecycle=debug".into());

    // Set up file logging to ~/.droplet-provider/provider.log
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let log_dir = PathBuf::from(home).join(".droplet-provider");
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::never(&log_dir, "provider.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard stops file logging; it must live for the whole run
    std::mem::forget(guard);

    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    initialize_tracing()?;

    // Loads .env as well
    let config = Config::load()?;

    match args.mode {
        Mode::Create { target } => commands::target::run_create(&config, &target).await,
        Mode::Start { target } => commands::target::run_start(&config, &target).await,
        Mode::Stop { target } => commands::target::run_stop(&config, &target).await,
        Mode::Destroy { target } => commands::target::run_destroy(&config, &target).await,
        Mode::Info { target, output } => {
            commands::target::run_info(&config, &target, &output).await
        }
    }
}
