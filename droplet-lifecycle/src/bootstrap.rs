//! First-boot provisioning script (user-data) rendering
//!
//! The script is modeled as a [`BootstrapConfig`] and rendered through one
//! function so the output can be asserted on without running a shell. Nothing
//! here executes anything.

use std::collections::BTreeMap;

use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::error::{ProviderError, Result};

/// Provider limit on the user-data field
pub const MAX_USER_DATA_BYTES: usize = 64 * 1024;

/// Stable device path of a DigitalOcean volume inside its droplet
pub fn volume_device_path(volume_name: &str) -> String {
    format!("/dev/disk/by-id/scsi-0DO_Volume_{}", volume_name)
}

/// Relocation of the container runtime's data root onto the volume
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DataDirMigration {
    /// Default data directory shipped with the base image
    pub source: String,
    /// Data directory on the mounted volume
    pub target: String,
}

/// Background service that launches the management agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentService {
    pub name: String,
    pub description: String,
    pub exec_start: String,
}

impl Default for AgentService {
    fn default() -> Self {
        Self {
            name: "daytona-agent".to_string(),
            description: "Daytona Agent Service".to_string(),
            exec_start: "/usr/local/bin/daytona agent --host".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    /// Derived droplet/volume name
    pub resource_name: String,
    /// OS user that owns the home directory and runs the agent
    pub user: String,
    /// Mount point of the volume
    pub home_dir: String,
    /// `None` skips the data-root relocation entirely
    pub data_dir: Option<DataDirMigration>,
    pub env_vars: BTreeMap<String, String>,
    pub api_key: String,
    pub agent_download_url: String,
    pub service: AgentService,
}

#[derive(Serialize)]
struct RenderedVar {
    key: String,
    shell_value: String,
    systemd_value: String,
}

impl BootstrapConfig {
    pub fn device_path(&self) -> String {
        volume_device_path(&self.resource_name)
    }

    /// Render the user-data script.
    ///
    /// Errors only on a template defect; the inputs are never rejected.
    /// Callers check the result against [`MAX_USER_DATA_BYTES`].
    pub fn render(&self) -> Result<String> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("user-data.sh", include_str!("../templates/user-data.sh")),
            ("agent.service", include_str!("../templates/agent.service")),
        ])
        .map_err(|e| ProviderError::Config(format!("Failed to load bootstrap templates: {}", e)))?;

        let env_vars: Vec<RenderedVar> = self
            .env_vars
            .iter()
            .map(|(key, value)| RenderedVar {
                key: key.clone(),
                shell_value: shell_quote(value),
                systemd_value: systemd_quote(&format!("{}={}", key, value)),
            })
            .collect();

        let mut ctx = TeraContext::new();
        ctx.insert("resource_name", &self.resource_name);
        ctx.insert("device_path", &self.device_path());
        ctx.insert("home_dir", &self.home_dir);
        ctx.insert("user", &self.user);
        ctx.insert("data_dir", &self.data_dir);
        ctx.insert("env_vars", &env_vars);
        ctx.insert(
            "auth_header",
            &shell_quote(&format!("Authorization: Bearer {}", self.api_key)),
        );
        ctx.insert("agent_download_url", &shell_quote(&self.agent_download_url));
        ctx.insert("service_name", &self.service.name);
        ctx.insert("service_description", &self.service.description);
        ctx.insert("exec_start", &self.service.exec_start);

        tera.render("user-data.sh", &ctx)
            .map_err(|e| ProviderError::Config(format!("Failed to render bootstrap script: {}", e)))
    }
}

/// Whether `key` can be exported from a shell script
pub fn is_valid_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn systemd_quote(assignment: &str) -> String {
    let escaped = assignment
        .replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace('\n', r"\n")
        .replace('%', "%%");
    format!("\"{}\"", escaped)
}
