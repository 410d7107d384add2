//! In-memory provider and dialer doubles for unit tests

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use droplet_models::{
    Droplet, DropletCreateRequest, DropletStatus, Networks, NetworkV4, Region, Volume,
    VolumeCreateRequest,
};

use crate::client::{CloudClient, CloudConnector};
use crate::error::{ProviderError, Result};
use crate::reachability::Dialer;

/// One recorded provider call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListDroplets(String),
    CreateDroplet(DropletCreateRequest),
    GetDroplet(u64),
    DeleteDroplet(u64),
    PowerOn(u64),
    PowerOff(u64),
    ListVolumes(String),
    CreateVolume(VolumeCreateRequest),
    GetVolume(String),
    DetachVolume {
        volume_id: String,
        droplet_id: u64,
        region: String,
    },
    DeleteVolume(String),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    droplets: BTreeMap<u64, Droplet>,
    /// Statuses served by successive gets, per droplet
    status_script: HashMap<u64, VecDeque<DropletStatus>>,
    /// Deleted droplets still visible for this many more gets
    deleting: HashMap<u64, (Droplet, u32)>,
    volumes: BTreeMap<String, Volume>,
    /// Pending detachments: droplet ids and gets left before they clear
    detaching: HashMap<String, (Vec<u64>, u32)>,
    failures: HashMap<&'static str, u16>,
    next_droplet_id: u64,
    next_volume_id: u64,
}

/// Scriptable stand-in for the DigitalOcean API.
///
/// Defaults: a created droplet reads `new` once and then `active`; a deleted
/// droplet stays visible for two more gets; a detach clears after one get;
/// a power action converges after one get.
pub struct FakeCloud {
    state: Mutex<FakeState>,
    pub create_statuses: Vec<DropletStatus>,
    pub delete_lag: u32,
    pub detach_lag: u32,
    pub power_lag: usize,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_droplet_id: 1000,
                next_volume_id: 1,
                ..FakeState::default()
            }),
            create_statuses: vec![DropletStatus::New, DropletStatus::Active],
            delete_lag: 2,
            detach_lag: 1,
            power_lag: 1,
        }
    }
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    /// Make every call to `operation` fail with `status`
    pub fn fail(&self, operation: &'static str, status: u16) {
        self.state.lock().unwrap().failures.insert(operation, status);
    }

    pub fn seed_droplet(&self, name: &str, status: DropletStatus, volume_ids: Vec<String>) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_droplet_id;
        state.next_droplet_id += 1;
        state.droplets.insert(id, droplet(id, name, status, volume_ids, "nyc3"));
        id
    }

    pub fn seed_volume(&self, name: &str, droplet_ids: Vec<u64>) -> String {
        let mut state = self.state.lock().unwrap();
        let id = format!("vol-{}", state.next_volume_id);
        state.next_volume_id += 1;
        state.volumes.insert(
            id.clone(),
            Volume {
                id: id.clone(),
                name: name.to_string(),
                size_gigabytes: 20,
                filesystem_type: "ext4".to_string(),
                filesystem_label: "Daytona Data".to_string(),
                droplet_ids,
                region: Some(Region {
                    slug: "nyc3".to_string(),
                    name: String::new(),
                }),
                tags: vec![],
                created_at: None,
            },
        );
        id
    }

    pub fn droplet_status(&self, id: u64) -> Option<DropletStatus> {
        self.state.lock().unwrap().droplets.get(&id).map(|d| d.status)
    }

    pub fn volume(&self, id: &str) -> Option<Volume> {
        self.state.lock().unwrap().volumes.get(id).cloned()
    }

    pub fn droplet_count(&self) -> usize {
        self.state.lock().unwrap().droplets.len()
    }

    pub fn volume_count(&self) -> usize {
        self.state.lock().unwrap().volumes.len()
    }

    fn record(&self, state: &mut FakeState, call: Call, operation: &'static str) -> Result<()> {
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(status) => Err(ProviderError::Api {
                operation,
                resource: "fake".to_string(),
                status: *status,
                message: "injected failure".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn script_power(&self, state: &mut FakeState, id: u64, target: DropletStatus) -> Result<()> {
        let current = state
            .droplets
            .get(&id)
            .map(|d| d.status)
            .ok_or_else(|| not_found("droplet", &id.to_string()))?;
        let mut script: VecDeque<DropletStatus> =
            std::iter::repeat(current).take(self.power_lag).collect();
        script.push_back(target);
        state.status_script.insert(id, script);
        Ok(())
    }
}

fn not_found(resource: &'static str, name: &str) -> ProviderError {
    ProviderError::NotFound {
        resource,
        name: name.to_string(),
    }
}

fn droplet(id: u64, name: &str, status: DropletStatus, volume_ids: Vec<String>, region: &str) -> Droplet {
    Droplet {
        id,
        name: name.to_string(),
        status,
        networks: Networks {
            v4: vec![NetworkV4 {
                ip_address: format!("203.0.113.{}", id % 250),
                kind: "public".to_string(),
            }],
        },
        volume_ids,
        region: Some(Region {
            slug: region.to_string(),
            name: String::new(),
        }),
        size_slug: None,
        tags: vec!["daytona".to_string()],
        created_at: None,
    }
}

#[async_trait]
impl CloudClient for FakeCloud {
    async fn list_droplets_by_name(&self, name: &str) -> Result<Vec<Droplet>> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::ListDroplets(name.to_string()), "list-droplets")?;
        Ok(state
            .droplets
            .values()
            .filter(|d| d.name == name)
            .cloned()
            .collect())
    }

    async fn create_droplet(&self, request: &DropletCreateRequest) -> Result<Droplet> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::CreateDroplet(request.clone()), "create-droplet")?;

        let id = state.next_droplet_id;
        state.next_droplet_id += 1;
        let created = droplet(id, &request.name, DropletStatus::New, request.volumes.clone(), &request.region);
        state.droplets.insert(id, created.clone());
        state
            .status_script
            .insert(id, self.create_statuses.iter().copied().collect());

        for volume_id in &request.volumes {
            if let Some(volume) = state.volumes.get_mut(volume_id) {
                volume.droplet_ids.push(id);
            }
        }
        Ok(created)
    }

    async fn get_droplet(&self, id: u64) -> Result<Droplet> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::GetDroplet(id), "get-droplet")?;

        if let Some((lingering, remaining)) = state.deleting.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(lingering.clone());
            }
            return Err(not_found("droplet", &id.to_string()));
        }

        let next = state.status_script.get_mut(&id).and_then(|s| s.pop_front());
        let droplet = state
            .droplets
            .get_mut(&id)
            .ok_or_else(|| not_found("droplet", &id.to_string()))?;
        if let Some(status) = next {
            droplet.status = status;
        }
        Ok(droplet.clone())
    }

    async fn delete_droplet(&self, id: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::DeleteDroplet(id), "delete-droplet")?;
        let removed = state
            .droplets
            .remove(&id)
            .ok_or_else(|| not_found("droplet", &id.to_string()))?;
        state.status_script.remove(&id);
        state.deleting.insert(id, (removed, self.delete_lag));
        Ok(())
    }

    async fn power_on_droplet(&self, id: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::PowerOn(id), "power-on-droplet")?;
        self.script_power(&mut state, id, DropletStatus::Active)
    }

    async fn power_off_droplet(&self, id: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::PowerOff(id), "power-off-droplet")?;
        self.script_power(&mut state, id, DropletStatus::Off)
    }

    async fn list_volumes_by_name(&self, name: &str) -> Result<Vec<Volume>> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::ListVolumes(name.to_string()), "list-volumes")?;
        Ok(state
            .volumes
            .values()
            .filter(|v| v.name == name)
            .cloned()
            .collect())
    }

    async fn create_volume(&self, request: &VolumeCreateRequest) -> Result<Volume> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::CreateVolume(request.clone()), "create-volume")?;

        let id = format!("vol-{}", state.next_volume_id);
        state.next_volume_id += 1;
        let volume = Volume {
            id: id.clone(),
            name: request.name.clone(),
            size_gigabytes: request.size_gigabytes,
            filesystem_type: request.filesystem_type.clone(),
            filesystem_label: request.filesystem_label.clone(),
            droplet_ids: vec![],
            region: Some(Region {
                slug: request.region.clone(),
                name: String::new(),
            }),
            tags: request.tags.clone(),
            created_at: None,
        };
        state.volumes.insert(id, volume.clone());
        Ok(volume)
    }

    async fn get_volume(&self, id: &str) -> Result<Volume> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::GetVolume(id.to_string()), "get-volume")?;

        let cleared = match state.detaching.get(id).map(|(_, remaining)| *remaining) {
            Some(remaining) if remaining > 0 => {
                if let Some(entry) = state.detaching.get_mut(id) {
                    entry.1 -= 1;
                }
                None
            }
            Some(_) => state.detaching.remove(id).map(|(ids, _)| ids),
            None => None,
        };

        let volume = state
            .volumes
            .get_mut(id)
            .ok_or_else(|| not_found("volume", id))?;
        if let Some(ids) = cleared {
            volume.droplet_ids.retain(|d| !ids.contains(d));
        }
        Ok(volume.clone())
    }

    async fn detach_volume(&self, volume_id: &str, droplet_id: u64, region: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        self.record(
            &mut state,
            Call::DetachVolume {
                volume_id: volume_id.to_string(),
                droplet_id,
                region: region.to_string(),
            },
            "detach-volume",
        )?;
        if !state.volumes.contains_key(volume_id) {
            return Err(not_found("volume", volume_id));
        }
        let lag = self.detach_lag;
        let entry = state
            .detaching
            .entry(volume_id.to_string())
            .or_insert_with(|| (Vec::new(), lag));
        entry.0.push(droplet_id);
        Ok(())
    }

    async fn delete_volume(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        self.record(&mut state, Call::DeleteVolume(id.to_string()), "delete-volume")?;
        let attached = state
            .volumes
            .get(id)
            .map(|v| !v.droplet_ids.is_empty())
            .ok_or_else(|| not_found("volume", id))?;
        if attached {
            return Err(ProviderError::Api {
                operation: "delete-volume",
                resource: format!("volume {}", id),
                status: 409,
                message: "volume is still attached".to_string(),
            });
        }
        state.volumes.remove(id);
        Ok(())
    }
}

/// Connector that hands out one shared fake and remembers the tokens it saw
pub struct FakeConnector {
    pub cloud: Arc<FakeCloud>,
    tokens: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(cloud: Arc<FakeCloud>) -> Arc<Self> {
        Arc::new(Self {
            cloud,
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

impl CloudConnector for FakeConnector {
    fn connect(&self, token: &str) -> Result<Arc<dyn CloudClient>> {
        self.tokens.lock().unwrap().push(token.to_string());
        Ok(self.cloud.clone())
    }
}

/// Dialer that refuses a fixed number of attempts before accepting
pub struct FakeDialer {
    refusals: Option<u32>,
    attempts: Mutex<Vec<(String, u16)>>,
}

impl FakeDialer {
    pub fn reachable_after(refusals: u32) -> Self {
        Self {
            refusals: Some(refusals),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            refusals: None,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn addresses(&self) -> Vec<(String, u16)> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialer for FakeDialer {
    async fn dial(&self, host: &str, port: u16) -> io::Result<()> {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.push((host.to_string(), port));
        match self.refusals {
            Some(refusals) if attempts.len() as u32 > refusals => Ok(()),
            _ => Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused")),
        }
    }
}
