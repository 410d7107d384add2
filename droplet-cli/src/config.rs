use anyhow::{Context, Result};
use droplet_lifecycle::settings::DEFAULT_MANAGEMENT_PORT;
use droplet_lifecycle::{ProviderSettings, DEFAULT_API_BASE_URL};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub agent_download_url: String,
    pub management_port: u16,
    pub api_base_url: String,
    pub reachability_timeout: Option<Duration>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            agent_download_url: lookup("DROPLET_AGENT_DOWNLOAD_URL")
                .context("DROPLET_AGENT_DOWNLOAD_URL must be set")?,
            management_port: lookup("DROPLET_MANAGEMENT_PORT")
                .unwrap_or_else(|| DEFAULT_MANAGEMENT_PORT.to_string())
                .parse()
                .context("DROPLET_MANAGEMENT_PORT must be a valid port number")?,
            api_base_url: lookup("DROPLET_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            reachability_timeout: lookup("DROPLET_REACHABILITY_TIMEOUT_SECS")
                .map(|v| v.parse().map(Duration::from_secs))
                .transpose()
                .context("DROPLET_REACHABILITY_TIMEOUT_SECS must be a number of seconds")?,
        })
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        let mut settings = ProviderSettings::with_agent_download_url(&self.agent_download_url);
        settings.management_port = self.management_port;
        if let Some(timeout) = self.reachability_timeout {
            settings.poll.reachability.timeout = timeout;
        }
        settings
    }
}
