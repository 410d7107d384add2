//! Provider capability interface and its DigitalOcean REST implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use droplet_models::{Droplet, DropletCreateRequest, Volume, VolumeCreateRequest};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ProviderError, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://api.digitalocean.com";

/// Tag applied to every droplet and volume this crate creates
pub const RESOURCE_TAG: &str = "daytona";

/// Upper bound on a single provider request, connect through body
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Every provider call the lifecycle needs, and nothing else
#[async_trait]
pub trait CloudClient: Send + Sync {
    async fn list_droplets_by_name(&self, name: &str) -> Result<Vec<Droplet>>;

    async fn create_droplet(&self, request: &DropletCreateRequest) -> Result<Droplet>;

    /// Returns [`ProviderError::NotFound`] once the droplet is gone
    async fn get_droplet(&self, id: u64) -> Result<Droplet>;

    async fn delete_droplet(&self, id: u64) -> Result<()>;

    async fn power_on_droplet(&self, id: u64) -> Result<()>;

    async fn power_off_droplet(&self, id: u64) -> Result<()>;

    async fn list_volumes_by_name(&self, name: &str) -> Result<Vec<Volume>>;

    async fn create_volume(&self, request: &VolumeCreateRequest) -> Result<Volume>;

    /// Returns [`ProviderError::NotFound`] once the volume is gone
    async fn get_volume(&self, id: &str) -> Result<Volume>;

    async fn detach_volume(&self, volume_id: &str, droplet_id: u64, region: &str) -> Result<()>;

    async fn delete_volume(&self, id: &str) -> Result<()>;
}

/// Builds an authenticated client for one lifecycle request
pub trait CloudConnector: Send + Sync {
    fn connect(&self, token: &str) -> Result<Arc<dyn CloudClient>>;
}

/// Connector for the public DigitalOcean API
#[derive(Debug, Clone)]
pub struct DigitalOceanConnector {
    base_url: String,
}

impl DigitalOceanConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for DigitalOceanConnector {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl CloudConnector for DigitalOceanConnector {
    fn connect(&self, token: &str) -> Result<Arc<dyn CloudClient>> {
        Ok(Arc::new(DigitalOceanClient::new(&self.base_url, token)?))
    }
}

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Deserialize)]
struct DropletsResponse {
    #[serde(default)]
    droplets: Vec<Droplet>,
}

#[derive(Deserialize)]
struct DropletResponse {
    droplet: Droplet,
}

#[derive(Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    volumes: Vec<Volume>,
}

#[derive(Deserialize)]
struct VolumeResponse {
    volume: Volume,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// Bearer-token client for the DigitalOcean v2 API
pub struct DigitalOceanClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DigitalOceanClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, token: &str, request_timeout: Duration) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(ProviderError::Config("API token is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("droplet-lifecycle/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2{}", self.base_url, path)
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        operation: &'static str,
        kind: &'static str,
        name: &str,
    ) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                operation,
                resource: format!("{} {}", kind, name),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound {
                resource: kind,
                name: name.to_string(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        Err(ProviderError::Api {
            operation,
            resource: format!("{} {}", kind, name),
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
        kind: &'static str,
        name: &str,
    ) -> Result<T> {
        let response = self.execute(request, operation, kind, name).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| ProviderError::Transport {
                operation,
                resource: format!("{} {}", kind, name),
                source,
            })
    }
}

#[async_trait]
impl CloudClient for DigitalOceanClient {
    async fn list_droplets_by_name(&self, name: &str) -> Result<Vec<Droplet>> {
        let request = self
            .http
            .get(self.url("/droplets"))
            .query(&[("name", name), ("per_page", "200")]);
        let body: DropletsResponse = self.fetch(request, "list-droplets", "droplet", name).await?;
        Ok(body.droplets)
    }

    async fn create_droplet(&self, request: &DropletCreateRequest) -> Result<Droplet> {
        let builder = self.http.post(self.url("/droplets")).json(request);
        let body: DropletResponse = self
            .fetch(builder, "create-droplet", "droplet", &request.name)
            .await?;
        Ok(body.droplet)
    }

    async fn get_droplet(&self, id: u64) -> Result<Droplet> {
        let request = self.http.get(self.url(&format!("/droplets/{}", id)));
        let body: DropletResponse = self
            .fetch(request, "get-droplet", "droplet", &id.to_string())
            .await?;
        Ok(body.droplet)
    }

    async fn delete_droplet(&self, id: u64) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/droplets/{}", id)));
        self.execute(request, "delete-droplet", "droplet", &id.to_string())
            .await?;
        Ok(())
    }

    async fn power_on_droplet(&self, id: u64) -> Result<()> {
        let request = self
            .http
            .post(self.url(&format!("/droplets/{}/actions", id)))
            .json(&serde_json::json!({ "type": "power_on" }));
        self.execute(request, "power-on-droplet", "droplet", &id.to_string())
            .await?;
        Ok(())
    }

    async fn power_off_droplet(&self, id: u64) -> Result<()> {
        let request = self
            .http
            .post(self.url(&format!("/droplets/{}/actions", id)))
            .json(&serde_json::json!({ "type": "power_off" }));
        self.execute(request, "power-off-droplet", "droplet", &id.to_string())
            .await?;
        Ok(())
    }

    async fn list_volumes_by_name(&self, name: &str) -> Result<Vec<Volume>> {
        let request = self
            .http
            .get(self.url("/volumes"))
            .query(&[("name", name), ("per_page", "200")]);
        let body: VolumesResponse = self.fetch(request, "list-volumes", "volume", name).await?;
        Ok(body.volumes)
    }

    async fn create_volume(&self, request: &VolumeCreateRequest) -> Result<Volume> {
        let builder = self.http.post(self.url("/volumes")).json(request);
        let body: VolumeResponse = self
            .fetch(builder, "create-volume", "volume", &request.name)
            .await?;
        Ok(body.volume)
    }

    async fn get_volume(&self, id: &str) -> Result<Volume> {
        let request = self.http.get(self.url(&format!("/volumes/{}", id)));
        let body: VolumeResponse = self.fetch(request, "get-volume", "volume", id).await?;
        Ok(body.volume)
    }

    async fn detach_volume(&self, volume_id: &str, droplet_id: u64, region: &str) -> Result<()> {
        let request = self
            .http
            .post(self.url(&format!("/volumes/{}/actions", volume_id)))
            .json(&serde_json::json!({
                "type": "detach",
                "droplet_id": droplet_id,
                "region": region,
            }));
        self.execute(request, "detach-volume", "volume", volume_id)
            .await?;
        Ok(())
    }

    async fn delete_volume(&self, id: &str) -> Result<()> {
        let request = self.http.delete(self.url(&format!("/volumes/{}", id)));
        self.execute(request, "delete-volume", "volume", id).await?;
        Ok(())
    }
}
