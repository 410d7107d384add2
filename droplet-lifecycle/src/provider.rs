//! Lifecycle entry points called by the workspace orchestrator host
//!
//! Every call resolves the target's options and credential, builds a
//! request-scoped session against the provider, and runs one flow from
//! [`crate::orchestrations`] inside a tracing span. Errors come back as
//! [`LifecycleError`], tagged with the operation and derived resource name.

use std::collections::BTreeMap;
use std::sync::Arc;

use droplet_models::{Target, TargetMetadata, TargetOptions, TargetState};
use tracing::Instrument;
use uuid::Uuid;

use crate::bootstrap::is_valid_env_key;
use crate::client::{CloudConnector, DigitalOceanConnector};
use crate::error::{LifecycleError, ProviderError, Result};
use crate::instance::{InstanceManager, InstancePolicies, InstanceSpec};
use crate::names::{operations, resource_name};
use crate::reachability::{Dialer, TcpDialer};
use crate::settings::ProviderSettings;
use crate::volume::VolumeManager;

pub struct DropletProvider {
    pub(crate) settings: ProviderSettings,
    connector: Arc<dyn CloudConnector>,
    pub(crate) dialer: Arc<dyn Dialer>,
}

/// Per-request view of one target: parsed options plus managers bound to a
/// client authenticated with the target's token
pub(crate) struct Session {
    pub resource_name: String,
    pub options: TargetOptions,
    pub instances: InstanceManager,
    pub volumes: VolumeManager,
}

impl Session {
    pub fn instance_spec(&self) -> InstanceSpec {
        InstanceSpec {
            region: self.options.region.clone(),
            size: self.options.size.clone(),
            image: self.options.image.clone(),
        }
    }
}

/// Pick the API token: the options' `Auth Token` when non-empty, else the
/// environment fallback.
pub fn resolve_token(options: &TargetOptions, env_token: Option<String>) -> Result<String> {
    options
        .auth_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| env_token.filter(|t| !t.trim().is_empty()))
        .ok_or_else(|| {
            ProviderError::Config(
                "no API token: set \"Auth Token\" in the target options or the token environment variable"
                    .to_string(),
            )
        })
}

impl DropletProvider {
    pub fn new(
        settings: ProviderSettings,
        connector: Arc<dyn CloudConnector>,
        dialer: Arc<dyn Dialer>,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            connector,
            dialer,
        })
    }

    /// Provider against the public DigitalOcean API, probing over plain TCP
    pub fn digitalocean(settings: ProviderSettings, api_base_url: &str) -> Result<Self> {
        Self::new(
            settings,
            Arc::new(DigitalOceanConnector::new(api_base_url)),
            Arc::new(TcpDialer::default()),
        )
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    // ========================================================================
    // Public lifecycle API
    // ========================================================================

    /// Bring the target's volume and droplet into existence and wait until
    /// the agent answers on the management port.
    pub async fn create(&self, target: &Target) -> Result<(), LifecycleError> {
        let name = target_name(target);
        self.create_flow(target, &name)
            .instrument(operation_span(operations::CREATE, &name))
            .await
            .map_err(|e| LifecycleError::new(operations::CREATE, name.as_str(), e))
    }

    /// Power the droplet on (creating it when absent) and wait for the agent
    pub async fn start(&self, target: &Target) -> Result<(), LifecycleError> {
        let name = target_name(target);
        self.start_flow(target, &name)
            .instrument(operation_span(operations::START, &name))
            .await
            .map_err(|e| LifecycleError::new(operations::START, name.as_str(), e))
    }

    pub async fn stop(&self, target: &Target) -> Result<(), LifecycleError> {
        let name = target_name(target);
        self.stop_flow(target, &name)
            .instrument(operation_span(operations::STOP, &name))
            .await
            .map_err(|e| LifecycleError::new(operations::STOP, name.as_str(), e))
    }

    /// Delete droplet and volume. Safe to call again after a partial failure.
    pub async fn destroy(&self, target: &Target) -> Result<(), LifecycleError> {
        let name = target_name(target);
        self.destroy_flow(target, &name)
            .instrument(operation_span(operations::DESTROY, &name))
            .await
            .map_err(|e| LifecycleError::new(operations::DESTROY, name.as_str(), e))
    }

    /// Current state of the target as the provider sees it. Never mutates.
    pub async fn info(&self, target: &Target) -> Result<TargetMetadata, LifecycleError> {
        let name = target_name(target);
        self.info_flow(target, &name)
            .instrument(operation_span(operations::INFO, &name))
            .await
            .map_err(|e| LifecycleError::new(operations::INFO, name.as_str(), e))
    }

    /// [`DropletProvider::info`] serialized for the host to persist
    pub async fn info_json(&self, target: &Target) -> Result<String, LifecycleError> {
        let metadata = self.info(target).await?;
        serde_json::to_string(&metadata).map_err(|e| {
            LifecycleError::new(
                operations::INFO,
                metadata.resource_name.clone(),
                ProviderError::Config(format!("Failed to serialize metadata: {}", e)),
            )
        })
    }

    // ========================================================================
    // Session plumbing
    // ========================================================================

    pub(crate) fn session(&self, target: &Target, name: &str) -> Result<Session> {
        let options = TargetOptions::parse(&target.options)?;
        let token = resolve_token(&options, std::env::var(&self.settings.token_env_var).ok())?;
        let client = self.connector.connect(&token)?;

        tracing::debug!(?options, "Resolved target options");

        let poll = &self.settings.poll;
        Ok(Session {
            resource_name: name.to_string(),
            options,
            instances: InstanceManager::new(
                client.clone(),
                InstancePolicies {
                    active: poll.active,
                    power: poll.power,
                    deletion: poll.deletion,
                },
            ),
            volumes: VolumeManager::new(client, poll.detach),
        })
    }

    /// Target environment with the provider's own variables layered on top.
    /// Keys that cannot be exported from a shell are dropped.
    pub(crate) fn merged_env(&self, target: &Target) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        for (key, value) in &target.env_vars {
            if is_valid_env_key(key) {
                env.insert(key.clone(), value.clone());
            } else {
                tracing::warn!(key = %key, "Skipping environment variable with invalid name");
            }
        }
        env.extend(
            self.settings
                .extra_env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        env
    }

    async fn info_flow(&self, target: &Target, name: &str) -> Result<TargetMetadata> {
        let session = self.session(target, name)?;
        let droplet = session.instances.find(name).await?;

        Ok(TargetMetadata {
            resource_name: name.to_string(),
            state: TargetState::from_droplet(droplet.as_ref()),
            status: droplet
                .as_ref()
                .map(|d| d.status.as_str())
                .unwrap_or("absent")
                .to_string(),
            droplet_id: droplet.as_ref().map(|d| d.id),
            public_ip: droplet
                .as_ref()
                .and_then(|d| d.public_ipv4())
                .map(str::to_string),
            region: droplet
                .as_ref()
                .and_then(|d| d.region.as_ref())
                .map(|r| r.slug.clone()),
            volume_ids: droplet.map(|d| d.volume_ids).unwrap_or_default(),
        })
    }
}

fn target_name(target: &Target) -> String {
    resource_name(&target.id, &target.name)
}

fn operation_span(operation: &'static str, name: &str) -> tracing::Span {
    tracing::info_span!(
        "lifecycle",
        operation,
        resource = %name,
        request_id = %Uuid::new_v4()
    )
}
