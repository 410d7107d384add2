//! Droplet Lifecycle - DigitalOcean droplet + volume lifecycle for workspace targets
//!
//! This crate takes a target from "absent" to "running and reachable" and back:
//! a block-storage volume, a droplet booted with a rendered user-data script
//! that mounts the volume and installs the workspace agent, and the polling
//! loops that make each step safe to retry.
//!
//! # Usage
//!
//! ```rust,no_run
//! use droplet_lifecycle::{DropletProvider, ProviderSettings, DEFAULT_API_BASE_URL};
//! use droplet_models::Target;
//!
//! # async fn example(target: Target) -> anyhow::Result<()> {
//! let settings = ProviderSettings::with_agent_download_url("https://download.example.com/agent.sh");
//! let provider = DropletProvider::digitalocean(settings, DEFAULT_API_BASE_URL)?;
//!
//! provider.create(&target).await?;
//! println!("{}", provider.info_json(&target).await?);
//! provider.destroy(&target).await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod client;
pub mod error;
pub mod instance;
pub mod names;
pub mod poller;
pub mod progress;
pub mod provider;
pub mod reachability;
pub mod settings;
pub mod volume;

mod orchestrations;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use client::{CloudClient, CloudConnector, DigitalOceanConnector, DEFAULT_API_BASE_URL};
pub use error::{LifecycleError, ProviderError};
pub use provider::{resolve_token, DropletProvider};
pub use reachability::{Dialer, TcpDialer};
pub use settings::{PollSettings, ProviderSettings};
