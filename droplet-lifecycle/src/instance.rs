//! Droplet management

use std::sync::Arc;

use droplet_models::{Droplet, DropletCreateRequest, DropletStatus};

use crate::client::{CloudClient, RESOURCE_TAG};
use crate::error::{ProviderError, Result};
use crate::poller::{wait_for, OnAbsent, PollPolicy};

/// What a new droplet is built from
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    pub region: String,
    pub size: String,
    pub image: String,
}

/// Waits used by [`InstanceManager`]
#[derive(Debug, Clone, Copy)]
pub struct InstancePolicies {
    pub active: PollPolicy,
    pub power: PollPolicy,
    pub deletion: PollPolicy,
}

pub struct InstanceManager {
    client: Arc<dyn CloudClient>,
    policies: InstancePolicies,
}

impl InstanceManager {
    pub fn new(client: Arc<dyn CloudClient>, policies: InstancePolicies) -> Self {
        Self { client, policies }
    }

    pub async fn find(&self, name: &str) -> Result<Option<Droplet>> {
        let droplets = self.client.list_droplets_by_name(name).await?;
        Ok(droplets.into_iter().find(|d| d.name == name))
    }

    /// Return the droplet called `name`, creating it (and waiting for it to
    /// become active) if there is none.
    ///
    /// A droplet that already exists is returned unchanged; `spec` and
    /// `user_data` are not compared against it.
    pub async fn ensure_exists(
        &self,
        name: &str,
        spec: &InstanceSpec,
        user_data: &str,
        volume_id: &str,
    ) -> Result<Droplet> {
        if let Some(existing) = self.find(name).await? {
            tracing::debug!(
                droplet_id = existing.id,
                status = %existing.status,
                "Droplet already exists, reusing it"
            );
            return Ok(existing);
        }

        tracing::info!(region = %spec.region, size = %spec.size, "Creating droplet {}...", name);
        let request = DropletCreateRequest {
            name: name.to_string(),
            region: spec.region.clone(),
            size: spec.size.clone(),
            image: spec.image.clone(),
            user_data: user_data.to_string(),
            tags: vec![RESOURCE_TAG.to_string()],
            volumes: vec![volume_id.to_string()],
        };
        let created = self.client.create_droplet(&request).await?;
        tracing::info!(droplet_id = created.id, "Droplet created, waiting for it to become active");

        let droplet = self
            .wait_for_status(created.id, DropletStatus::Active, "wait-active", self.policies.active)
            .await?;
        tracing::info!(droplet_id = droplet.id, "✓ Droplet active");

        Ok(droplet)
    }

    /// Delete the droplet called `name` and wait until the provider no
    /// longer knows it. A missing droplet is an error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let droplet = self.find(name).await?.ok_or_else(|| ProviderError::NotFound {
            resource: "droplet",
            name: name.to_string(),
        })?;

        tracing::info!(droplet_id = droplet.id, "Deleting droplet {}...", name);
        self.client.delete_droplet(droplet.id).await?;

        let resource = format!("droplet {}", droplet.id);
        let client = &self.client;
        let id = droplet.id;
        wait_for(
            "wait-deleted",
            &resource,
            self.policies.deletion,
            OnAbsent::Succeed,
            move || async move { client.get_droplet(id).await },
            |_| false,
        )
        .await?;
        tracing::info!(droplet_id = droplet.id, "✓ Droplet deleted");

        Ok(())
    }

    /// Wait for a droplet that is still booting without issuing any action
    pub async fn wait_until_active(&self, id: u64) -> Result<Droplet> {
        self.wait_for_status(id, DropletStatus::Active, "wait-active", self.policies.active)
            .await
    }

    pub async fn power_on(&self, id: u64) -> Result<Droplet> {
        tracing::info!(droplet_id = id, "Powering on droplet");
        self.client.power_on_droplet(id).await?;
        self.wait_for_status(id, DropletStatus::Active, "wait-power-on", self.policies.power)
            .await
    }

    pub async fn power_off(&self, id: u64) -> Result<Droplet> {
        tracing::info!(droplet_id = id, "Powering off droplet");
        self.client.power_off_droplet(id).await?;
        self.wait_for_status(id, DropletStatus::Off, "wait-power-off", self.policies.power)
            .await
    }

    async fn wait_for_status(
        &self,
        id: u64,
        status: DropletStatus,
        operation: &'static str,
        policy: PollPolicy,
    ) -> Result<Droplet> {
        let resource = format!("droplet {}", id);
        let client = &self.client;
        let droplet = wait_for(
            operation,
            &resource,
            policy,
            OnAbsent::Fail,
            move || async move { client.get_droplet(id).await },
            |d: &Droplet| d.status == status,
        )
        .await?;

        // OnAbsent::Fail never yields None
        droplet.ok_or(ProviderError::NotFound {
            resource: "droplet",
            name: id.to_string(),
        })
    }
}
