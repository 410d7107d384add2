//! Destroy flow

use droplet_models::Target;

use crate::error::Result;
use crate::provider::DropletProvider;

impl DropletProvider {
    /// Droplet first, then the volume it held. Either may already be gone,
    /// so a retry after a partial failure picks up where the last run stopped.
    pub(crate) async fn destroy_flow(&self, target: &Target, name: &str) -> Result<()> {
        tracing::info!("Destroying target {}", name);
        let session = self.session(target, name)?;

        // Step 1: droplet, polled until the provider returns 404
        match session.instances.delete(name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::info!("Droplet {} not found, skipping", name);
            }
            Err(e) => return Err(e),
        }

        // Step 2: volume, detached from every droplet before deletion
        session.volumes.delete(name).await?;

        tracing::info!("✓ Target {} destroyed", name);
        Ok(())
    }
}
