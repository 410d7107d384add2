//! Create and start flows

use droplet_models::{Droplet, DropletStatus, Target};

use crate::bootstrap::{BootstrapConfig, MAX_USER_DATA_BYTES};
use crate::error::{ProviderError, Result};
use crate::progress::Progress;
use crate::provider::{DropletProvider, Session};
use crate::reachability::ReachabilityGate;

impl DropletProvider {
    pub(crate) async fn create_flow(&self, target: &Target, name: &str) -> Result<()> {
        tracing::info!("Creating target {}", name);
        let session = self.session(target, name)?;

        let droplet = self.provision(target, &session).await?;
        let droplet = self.converge_running(&session, droplet).await?;
        self.wait_for_agent(target, &droplet).await?;

        tracing::info!("✓ Workspace agent started");
        Ok(())
    }

    pub(crate) async fn start_flow(&self, target: &Target, name: &str) -> Result<()> {
        tracing::info!("Starting target {}", name);
        let session = self.session(target, name)?;

        let droplet = match session.instances.find(name).await? {
            Some(existing) => existing,
            None => {
                tracing::info!("Droplet not found, running the create flow");
                self.provision(target, &session).await?
            }
        };
        let droplet = self.converge_running(&session, droplet).await?;
        self.wait_for_agent(target, &droplet).await?;

        tracing::info!("✓ Workspace agent started");
        Ok(())
    }

    /// Volume, user-data and droplet. The script is rendered (and size
    /// checked) before anything is created.
    async fn provision(&self, target: &Target, session: &Session) -> Result<Droplet> {
        let name = session.resource_name.as_str();

        // Step 1: render the bootstrap script
        let user_data = self.render_user_data(target, name)?;
        tracing::debug!(bytes = user_data.len(), "Rendered user-data");

        // Step 2: volume
        let volume = session
            .volumes
            .ensure_exists(name, &session.options.region, session.options.disk_size)
            .await?;

        // Step 3: droplet with the volume attached, polled to active
        session
            .instances
            .ensure_exists(name, &session.instance_spec(), &user_data, &volume.id)
            .await
    }

    /// Bring a reused or freshly created droplet to `active`
    async fn converge_running(&self, session: &Session, droplet: Droplet) -> Result<Droplet> {
        match droplet.status {
            DropletStatus::Active => Ok(droplet),
            DropletStatus::New => {
                tracing::info!(droplet_id = droplet.id, "Droplet still booting, waiting");
                session.instances.wait_until_active(droplet.id).await
            }
            DropletStatus::Off | DropletStatus::Archived | DropletStatus::Unknown => {
                session.instances.power_on(droplet.id).await
            }
        }
    }

    fn render_user_data(&self, target: &Target, name: &str) -> Result<String> {
        let config = BootstrapConfig {
            resource_name: name.to_string(),
            user: self.settings.agent_user.clone(),
            home_dir: self.settings.home_dir.clone(),
            data_dir: self.settings.data_dir.clone(),
            env_vars: self.merged_env(target),
            api_key: target.api_key.clone(),
            agent_download_url: self.settings.agent_download_url.clone(),
            service: self.settings.service.clone(),
        };
        let script = config.render()?;

        if script.len() > MAX_USER_DATA_BYTES {
            return Err(ProviderError::Config(format!(
                "user-data is {} bytes, provider limit is {}",
                script.len(),
                MAX_USER_DATA_BYTES
            )));
        }
        Ok(script)
    }

    /// Block on the reachability gate with the spinner running
    async fn wait_for_agent(&self, target: &Target, droplet: &Droplet) -> Result<()> {
        let host = droplet.public_ipv4().unwrap_or(target.id.as_str());
        let gate = ReachabilityGate::new(self.dialer.clone(), self.settings.poll.reachability);

        let progress = Progress::start(
            "Waiting for the agent to start...",
            self.settings.progress_frame_interval,
            self.settings.progress_log_every,
        );
        let result = gate
            .wait_for_reachable(host, self.settings.management_port)
            .await;
        progress.finish().await;

        result
    }
}
