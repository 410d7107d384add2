//! Shared data types for droplet provisioning
//!
//! These types mirror the shapes exchanged with the workspace orchestrator
//! (targets and their options) and with the DigitalOcean API (droplets and
//! volumes). They carry no behavior beyond small derivations.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Targets (inbound)
// ============================================================================

/// The logical unit being provisioned, owned by the workspace orchestrator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Target {
    /// Stable identifier, unique within the orchestrator namespace
    pub id: String,
    /// Display name
    pub name: String,
    /// Environment injected into the droplet and the agent service
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    /// Workspace API key handed to the agent installer
    pub api_key: String,
    /// JSON-encoded [`TargetOptions`]
    #[serde(default)]
    pub options: String,
}

pub const DEFAULT_REGION: &str = "fra1";
pub const DEFAULT_SIZE: &str = "s-2vcpu-4gb";
pub const DEFAULT_DISK_SIZE_GB: u32 = 20;
pub const DEFAULT_IMAGE: &str = "docker-20-04";

/// Provisioning options carried in the target's options blob
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetOptions {
    /// Region slug
    #[serde(rename = "Region", default = "default_region")]
    pub region: String,
    /// Size slug
    #[serde(rename = "Size", default = "default_size")]
    pub size: String,
    /// Volume size in GB
    #[serde(rename = "Disk Size", alias = "DiskSize", default = "default_disk_size")]
    pub disk_size: u32,
    /// Base image slug
    #[serde(rename = "Image", default = "default_image")]
    pub image: String,
    /// API token; falls back to the environment when absent
    #[serde(rename = "Auth Token", default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_size() -> String {
    DEFAULT_SIZE.to_string()
}

fn default_disk_size() -> u32 {
    DEFAULT_DISK_SIZE_GB
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

impl TargetOptions {
    /// Parse the JSON options blob. An empty blob yields the defaults.
    pub fn parse(options_json: &str) -> Result<Self, serde_json::Error> {
        if options_json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(options_json)
    }
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            region: default_region(),
            size: default_size(),
            disk_size: default_disk_size(),
            image: default_image(),
            auth_token: None,
        }
    }
}

impl fmt::Debug for TargetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetOptions")
            .field("region", &self.region)
            .field("size", &self.size)
            .field("disk_size", &self.disk_size)
            .field("image", &self.image)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "****"))
            .finish()
    }
}

// ============================================================================
// Droplets
// ============================================================================

/// Droplet status as reported by the provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DropletStatus {
    New,
    Active,
    Off,
    Archived,
    #[serde(other)]
    Unknown,
}

impl DropletStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropletStatus::New => "new",
            DropletStatus::Active => "active",
            DropletStatus::Off => "off",
            DropletStatus::Archived => "archived",
            DropletStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DropletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkV4 {
    pub ip_address: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Networks {
    #[serde(default)]
    pub v4: Vec<NetworkV4>,
}

/// A provider-managed virtual machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    pub status: DropletStatus,
    #[serde(default)]
    pub networks: Networks,
    #[serde(default)]
    pub volume_ids: Vec<String>,
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default)]
    pub size_slug: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Droplet {
    /// First public IPv4 address, if the provider has assigned one yet
    pub fn public_ipv4(&self) -> Option<&str> {
        self.networks
            .v4
            .iter()
            .find(|n| n.kind == "public")
            .map(|n| n.ip_address.as_str())
    }
}

/// Body of a droplet create call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropletCreateRequest {
    pub name: String,
    pub region: String,
    pub size: String,
    /// Image slug
    pub image: String,
    pub user_data: String,
    pub tags: Vec<String>,
    /// Volume ids attached at creation
    pub volumes: Vec<String>,
}

// ============================================================================
// Volumes
// ============================================================================

/// A provider-managed block storage volume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size_gigabytes: u32,
    #[serde(default)]
    pub filesystem_type: String,
    #[serde(default)]
    pub filesystem_label: String,
    /// Droplets the volume is currently attached to
    #[serde(default)]
    pub droplet_ids: Vec<u64>,
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Volume {
    pub fn is_detached(&self) -> bool {
        self.droplet_ids.is_empty()
    }

    pub fn region_slug(&self) -> Option<&str> {
        self.region.as_ref().map(|r| r.slug.as_str())
    }
}

/// Body of a volume create call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeCreateRequest {
    pub name: String,
    pub region: String,
    pub size_gigabytes: u32,
    pub filesystem_type: String,
    pub filesystem_label: String,
    pub tags: Vec<String>,
}

// ============================================================================
// Lifecycle state and metadata (outbound to the orchestrator)
// ============================================================================

/// Per-target lifecycle state, derived from what the provider reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    Absent,
    Provisioning,
    Ready,
    Stopped,
}

impl TargetState {
    pub fn from_droplet(droplet: Option<&Droplet>) -> Self {
        match droplet.map(|d| d.status) {
            None => TargetState::Absent,
            Some(DropletStatus::Active) => TargetState::Ready,
            Some(DropletStatus::Off) | Some(DropletStatus::Archived) => TargetState::Stopped,
            Some(DropletStatus::New) | Some(DropletStatus::Unknown) => TargetState::Provisioning,
        }
    }
}

/// Read-only snapshot handed back to the orchestrator host as JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetMetadata {
    pub resource_name: String,
    pub state: TargetState,
    /// Provider status string, or "absent"
    pub status: String,
    pub droplet_id: Option<u64>,
    pub public_ip: Option<String>,
    pub region: Option<String>,
    pub volume_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_options_parse_manifest_keys() {
        let json = r#"{"Region":"nyc3","Size":"s-1vcpu-1gb","Disk Size":30,"Image":"ubuntu-22-04-x64","Auth Token":"tok"}"#;
        let options = TargetOptions::parse(json).unwrap();

        assert_eq!(options.region, "nyc3");
        assert_eq!(options.size, "s-1vcpu-1gb");
        assert_eq!(options.disk_size, 30);
        assert_eq!(options.image, "ubuntu-22-04-x64");
        assert_eq!(options.auth_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_target_options_accepts_disk_size_alias() {
        let options = TargetOptions::parse(r#"{"DiskSize":20}"#).unwrap();
        assert_eq!(options.disk_size, 20);
        assert_eq!(options.region, DEFAULT_REGION);
        assert!(options.auth_token.is_none());
    }

    #[test]
    fn test_target_options_empty_blob_uses_defaults() {
        assert_eq!(TargetOptions::parse("  ").unwrap(), TargetOptions::default());
    }

    #[test]
    fn test_target_options_rejects_malformed_json() {
        assert!(TargetOptions::parse("{\"Region\":").is_err());
        assert!(TargetOptions::parse(r#"{"Disk Size":"big"}"#).is_err());
    }

    #[test]
    fn test_target_options_debug_masks_token() {
        let options = TargetOptions {
            auth_token: Some("secret-token".to_string()),
            ..TargetOptions::default()
        };
        let rendered = format!("{:?}", options);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("****"));
    }

    #[test]
    fn test_droplet_deserializes_provider_payload() {
        let json = r#"{
            "id": 3164444,
            "name": "ws-123",
            "status": "active",
            "networks": {"v4": [
                {"ip_address": "10.128.192.124", "type": "private"},
                {"ip_address": "192.241.165.154", "type": "public"}
            ]},
            "volume_ids": ["506f78a4-e098-11e5-ad9f-000f53306ae1"],
            "region": {"slug": "nyc3", "name": "New York 3"},
            "size_slug": "s-1vcpu-1gb",
            "tags": ["daytona"],
            "created_at": "2020-07-21T18:37:44Z"
        }"#;
        let droplet: Droplet = serde_json::from_str(json).unwrap();

        assert_eq!(droplet.id, 3164444);
        assert_eq!(droplet.status, DropletStatus::Active);
        assert_eq!(droplet.public_ipv4(), Some("192.241.165.154"));
        assert_eq!(droplet.volume_ids.len(), 1);
        assert!(droplet.created_at.is_some());
    }

    #[test]
    fn test_unknown_droplet_status_does_not_fail() {
        let droplet: Droplet =
            serde_json::from_str(r#"{"id": 1, "name": "x", "status": "rebooting"}"#).unwrap();
        assert_eq!(droplet.status, DropletStatus::Unknown);
        assert_eq!(droplet.public_ipv4(), None);
    }

    #[test]
    fn test_target_state_from_droplet() {
        let mut droplet: Droplet =
            serde_json::from_str(r#"{"id": 1, "name": "x", "status": "new"}"#).unwrap();
        assert_eq!(TargetState::from_droplet(None), TargetState::Absent);
        assert_eq!(TargetState::from_droplet(Some(&droplet)), TargetState::Provisioning);

        droplet.status = DropletStatus::Active;
        assert_eq!(TargetState::from_droplet(Some(&droplet)), TargetState::Ready);

        droplet.status = DropletStatus::Off;
        assert_eq!(TargetState::from_droplet(Some(&droplet)), TargetState::Stopped);
    }

    #[test]
    fn test_volume_detached() {
        let volume: Volume = serde_json::from_str(
            r#"{"id": "v-1", "name": "ws-123", "droplet_ids": [7], "region": {"slug": "nyc3"}}"#,
        )
        .unwrap();
        assert!(!volume.is_detached());
        assert_eq!(volume.region_slug(), Some("nyc3"));
    }
}
