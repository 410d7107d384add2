//! Stop flow

use droplet_models::{DropletStatus, Target};

use crate::error::{ProviderError, Result};
use crate::provider::DropletProvider;

impl DropletProvider {
    pub(crate) async fn stop_flow(&self, target: &Target, name: &str) -> Result<()> {
        tracing::info!("Stopping target {}", name);
        let session = self.session(target, name)?;

        let droplet = session
            .instances
            .find(name)
            .await?
            .ok_or_else(|| ProviderError::NotFound {
                resource: "droplet",
                name: name.to_string(),
            })?;

        if droplet.status == DropletStatus::Off {
            tracing::info!(droplet_id = droplet.id, "Droplet already off, nothing to do");
            return Ok(());
        }

        session.instances.power_off(droplet.id).await?;
        tracing::info!(droplet_id = droplet.id, "✓ Droplet stopped");
        Ok(())
    }
}
