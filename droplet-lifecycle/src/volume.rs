//! Block-storage volume management

use std::sync::Arc;

use droplet_models::{Volume, VolumeCreateRequest};

use crate::client::{CloudClient, RESOURCE_TAG};
use crate::error::{ProviderError, Result};
use crate::poller::{wait_for, OnAbsent, PollPolicy};

pub const FILESYSTEM_TYPE: &str = "ext4";
pub const FILESYSTEM_LABEL: &str = "Daytona Data";

pub struct VolumeManager {
    client: Arc<dyn CloudClient>,
    detach_policy: PollPolicy,
}

impl VolumeManager {
    pub fn new(client: Arc<dyn CloudClient>, detach_policy: PollPolicy) -> Self {
        Self {
            client,
            detach_policy,
        }
    }

    pub async fn find(&self, name: &str) -> Result<Option<Volume>> {
        let volumes = self.client.list_volumes_by_name(name).await?;
        Ok(volumes.into_iter().find(|v| v.name == name))
    }

    /// Return the volume called `name`, creating it if there is none.
    ///
    /// An existing volume is returned as-is even when its size or region
    /// differ from the request.
    pub async fn ensure_exists(&self, name: &str, region: &str, size_gb: u32) -> Result<Volume> {
        if let Some(existing) = self.find(name).await? {
            tracing::info!(volume_id = %existing.id, "Volume already exists, skipping creation");
            return Ok(existing);
        }

        tracing::info!(region, size_gb, "Creating volume {}...", name);
        let request = VolumeCreateRequest {
            name: name.to_string(),
            region: region.to_string(),
            size_gigabytes: size_gb,
            filesystem_type: FILESYSTEM_TYPE.to_string(),
            filesystem_label: FILESYSTEM_LABEL.to_string(),
            tags: vec![RESOURCE_TAG.to_string()],
        };
        let volume = self.client.create_volume(&request).await?;
        tracing::info!(volume_id = %volume.id, "✓ Volume created");

        Ok(volume)
    }

    /// Detach the volume from every droplet and delete it.
    ///
    /// Returns `false` when there was no such volume. A failure part-way
    /// leaves whatever was already detached; calling again finishes the job.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let Some(volume) = self.find(name).await? else {
            tracing::info!("Volume {} not found, nothing to delete", name);
            return Ok(false);
        };

        if !volume.is_detached() {
            let region = volume.region_slug().ok_or_else(|| ProviderError::Api {
                operation: "detach-volume",
                resource: format!("volume {}", volume.id),
                status: 0,
                message: "volume has no region".to_string(),
            })?;

            // Step 1: one detach per attached droplet
            for droplet_id in &volume.droplet_ids {
                tracing::info!(volume_id = %volume.id, droplet_id, "Detaching volume");
                self.client.detach_volume(&volume.id, *droplet_id, region).await?;
            }

            // Step 2: wait for the attachment set to drain
            let resource = format!("volume {}", volume.id);
            let client = &self.client;
            let volume_id = volume.id.as_str();
            wait_for(
                "wait-detached",
                &resource,
                self.detach_policy,
                OnAbsent::Succeed,
                move || async move { client.get_volume(volume_id).await },
                |v: &Volume| v.is_detached(),
            )
            .await?;
            tracing::info!(volume_id = %volume.id, "✓ Volume detached");
        }

        // Step 3: delete
        match self.client.delete_volume(&volume.id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::info!(volume_id = %volume.id, "Volume already gone");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
        tracing::info!(volume_id = %volume.id, "✓ Volume deleted");

        Ok(true)
    }
}
