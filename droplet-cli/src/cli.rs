use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Droplet Provider - workspace targets on DigitalOcean droplets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Create the volume and droplet and wait for the agent
    Create {
        /// Target description (JSON file)
        target: PathBuf,
    },

    /// Power on the droplet, creating it if needed
    Start {
        /// Target description (JSON file)
        target: PathBuf,
    },

    /// Power off the droplet
    Stop {
        /// Target description (JSON file)
        target: PathBuf,
    },

    /// Delete the droplet and its volume
    Destroy {
        /// Target description (JSON file)
        target: PathBuf,
    },

    /// Show what the provider currently reports for the target
    Info {
        /// Target description (JSON file)
        target: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "table")]
        output: String,
    },
}
