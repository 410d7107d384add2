//! Process-wide provider settings
//!
//! Built once by the host and shared by every lifecycle call. Nothing in here
//! is target specific; per-target values come from the options blob.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::bootstrap::{AgentService, DataDirMigration};
use crate::error::{ProviderError, Result};
use crate::poller::PollPolicy;

/// Port the workspace agent listens on inside the droplet
pub const DEFAULT_MANAGEMENT_PORT: u16 = 2222;

/// Environment variable consulted when the options carry no token
pub const DEFAULT_TOKEN_ENV_VAR: &str = "DIGITALOCEAN_ACCESS_TOKEN";

/// Interval and bound for every convergence wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub active: PollPolicy,
    pub power: PollPolicy,
    pub deletion: PollPolicy,
    pub detach: PollPolicy,
    pub reachability: PollPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            active: PollPolicy::new(Duration::from_secs(2), Duration::from_secs(10 * 60)),
            power: PollPolicy::new(Duration::from_secs(5), Duration::from_secs(5 * 60)),
            deletion: PollPolicy::new(Duration::from_secs(1), Duration::from_secs(5 * 60)),
            detach: PollPolicy::new(Duration::from_secs(2), Duration::from_secs(2 * 60)),
            reachability: PollPolicy::new(Duration::from_secs(1), Duration::from_secs(10 * 60)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Where the bootstrap script fetches the agent installer from
    pub agent_download_url: String,
    pub management_port: u16,
    pub agent_user: String,
    /// Mount point of the volume, also the agent user's home
    pub home_dir: String,
    pub data_dir: Option<DataDirMigration>,
    pub service: AgentService,
    /// Injected into every target, overriding same-named target variables
    pub extra_env: BTreeMap<String, String>,
    pub token_env_var: String,
    pub poll: PollSettings,
    pub progress_frame_interval: Duration,
    /// Spinner frames between two progress log lines
    pub progress_log_every: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        let home_dir = "/home/daytona".to_string();

        let mut extra_env = BTreeMap::new();
        extra_env.insert(
            "DAYTONA_AGENT_LOG_FILE_PATH".to_string(),
            format!("{}/.daytona-agent.log", home_dir),
        );

        Self {
            agent_download_url: String::new(),
            management_port: DEFAULT_MANAGEMENT_PORT,
            agent_user: "daytona".to_string(),
            data_dir: Some(DataDirMigration {
                source: "/var/lib/docker/".to_string(),
                target: format!("{}/.docker-daemon", home_dir),
            }),
            home_dir,
            service: AgentService::default(),
            extra_env,
            token_env_var: DEFAULT_TOKEN_ENV_VAR.to_string(),
            poll: PollSettings::default(),
            progress_frame_interval: Duration::from_millis(200),
            progress_log_every: 25,
        }
    }
}

impl ProviderSettings {
    pub fn with_agent_download_url(url: impl Into<String>) -> Self {
        Self {
            agent_download_url: url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent_download_url.trim().is_empty() {
            return Err(ProviderError::Config("agent download URL is not set".to_string()));
        }
        if self.management_port == 0 {
            return Err(ProviderError::Config("management port must be non-zero".to_string()));
        }
        if self.agent_user.is_empty() || self.home_dir.is_empty() {
            return Err(ProviderError::Config(
                "agent user and home directory must be set".to_string(),
            ));
        }
        Ok(())
    }
}
