//! Cascading grid option resolver
//!
//! Drives the provider → region → instance type selection used to build a
//! grid request. Changing a selection clears everything downstream before the
//! refetch is dispatched, and every fetch is tagged with the generation of the
//! level it fills so that a late response for an older selection is dropped.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use swarmhub_models::CreateGridRequest;

use crate::errors::ClientError;
use crate::http::SwarmApi;
use crate::notify::Notifier;

/// Option lists offered to the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptionSet {
    pub providers: Vec<String>,
    pub regions: Vec<String>,
    pub master_types: Vec<String>,
    pub slave_types: Vec<String>,
}

/// Grid request being built. Numeric fields hold the text as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridDraft {
    pub name: String,
    pub provider: Option<String>,
    pub region: Option<String>,
    pub master_type: Option<String>,
    pub slave_type: Option<String>,
    pub slave_nodes: String,
    pub ttl: String,
}

impl GridDraft {
    /// Convert the draft into a request, parsing `slave_nodes` and `ttl`
    pub fn to_request(&self) -> Result<CreateGridRequest, ClientError> {
        Ok(CreateGridRequest {
            name: self.name.clone(),
            provider: required("provider", &self.provider)?,
            region: required("region", &self.region)?,
            master_type: required("master type", &self.master_type)?,
            slave_type: required("slave type", &self.slave_type)?,
            slave_nodes: integer("slave nodes", &self.slave_nodes)?,
            ttl: integer("TTL", &self.ttl)?,
        })
    }
}

fn required(field: &str, value: &Option<String>) -> Result<String, ClientError> {
    value
        .clone()
        .ok_or_else(|| ClientError::ValidationError(format!("No {} selected", field)))
}

fn integer(field: &str, value: &str) -> Result<i64, ClientError> {
    value.trim().parse::<i64>().map_err(|_| {
        ClientError::ValidationError(format!("{} must be an integer, got {:?}", field, value))
    })
}

/// Resolver state slice
#[derive(Debug, Clone, Default)]
pub struct ResolverState {
    pub options: ResourceOptionSet,
    pub draft: GridDraft,
    region_generation: u64,
    instance_generation: u64,
}

impl ResolverState {
    /// No downstream list is populated while its upstream selector is unset
    pub fn is_consistent(&self) -> bool {
        let regions_ok = self.draft.provider.is_some() || self.options.regions.is_empty();
        let instances_ok = self.draft.region.is_some()
            || (self.options.master_types.is_empty() && self.options.slave_types.is_empty());
        let region_ok = self.draft.provider.is_some() || self.draft.region.is_none();
        regions_ok && instances_ok && region_ok
    }

    fn clear_below_provider(&mut self) {
        self.draft.region = None;
        self.options.regions.clear();
        self.region_generation += 1;
        self.clear_below_region();
    }

    fn clear_below_region(&mut self) {
        self.draft.master_type = None;
        self.draft.slave_type = None;
        self.draft.slave_nodes.clear();
        self.options.master_types.clear();
        self.options.slave_types.clear();
        self.instance_generation += 1;
    }
}

/// Outcome of a cascading fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The list was filled with this many options
    Applied(usize),

    /// A newer selection was made while the fetch was in flight; the
    /// response was dropped
    Superseded,
}

/// Cascading option resolver
pub struct ResourceOptionResolver {
    api: Arc<dyn SwarmApi>,
    notifier: Notifier,
    state: watch::Sender<ResolverState>,
}

impl ResourceOptionResolver {
    pub fn new(api: Arc<dyn SwarmApi>, notifier: Notifier) -> Self {
        let (state, _rx) = watch::channel(ResolverState::default());
        Self {
            api,
            notifier,
            state,
        }
    }

    /// Current state
    pub fn snapshot(&self) -> ResolverState {
        self.state.borrow().clone()
    }

    /// Current draft
    pub fn draft(&self) -> GridDraft {
        self.state.borrow().draft.clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ResolverState> {
        self.state.subscribe()
    }

    /// Fetch the provider list, replacing the current one
    pub async fn load_providers(&self) -> Result<usize, ClientError> {
        debug!("Loading grid providers");
        match self.api.list_providers().await {
            Ok(response) => {
                let count = response.providers.len();
                self.state.send_modify(|state| state.options.providers = response.providers);
                Ok(count)
            }
            Err(e) => {
                self.notifier
                    .error(format!("Unable to load grid providers: {}", e));
                Err(e)
            }
        }
    }

    /// Select a provider and fetch its regions
    pub async fn select_provider(&self, provider: &str) -> Result<Resolution, ClientError> {
        let mut generation = None;
        self.state.send_if_modified(|state| {
            if !state.options.providers.iter().any(|p| p == provider) {
                return false;
            }
            state.draft.provider = Some(provider.to_string());
            state.clear_below_provider();
            generation = Some(state.region_generation);
            true
        });
        let generation = generation.ok_or_else(|| {
            ClientError::ValidationError(format!("Unknown provider {:?}", provider))
        })?;

        info!("Provider selected: {}", provider);

        let fetched = self.api.list_regions(provider).await;
        let regions = match fetched {
            Ok(response) => response
                .regions
                .into_iter()
                .map(|record| record.region)
                .collect::<Vec<_>>(),
            Err(e) => return self.fail_region_fetch(generation, provider, e),
        };

        let mut resolution = Resolution::Superseded;
        self.state.send_if_modified(|state| {
            if state.region_generation != generation {
                return false;
            }
            resolution = Resolution::Applied(regions.len());
            state.options.regions = regions;
            true
        });

        if resolution == Resolution::Superseded {
            debug!("Discarding stale region list for {}", provider);
        }
        Ok(resolution)
    }

    fn fail_region_fetch(
        &self,
        generation: u64,
        provider: &str,
        err: ClientError,
    ) -> Result<Resolution, ClientError> {
        if self.state.borrow().region_generation != generation {
            debug!("Discarding stale region failure for {}: {}", provider, err);
            return Ok(Resolution::Superseded);
        }
        self.notifier
            .error(format!("Unable to load regions for {}: {}", provider, err));
        Err(err)
    }

    /// Select a region of the selected provider and fetch its instance types
    pub async fn select_region(
        &self,
        provider: &str,
        region: &str,
    ) -> Result<Resolution, ClientError> {
        let mut outcome = Err(ClientError::ValidationError(format!(
            "Provider {:?} is not selected",
            provider
        )));
        self.state.send_if_modified(|state| {
            if state.draft.provider.as_deref() != Some(provider) {
                return false;
            }
            if !state.options.regions.iter().any(|r| r == region) {
                outcome = Err(ClientError::ValidationError(format!(
                    "Unknown region {:?} for provider {:?}",
                    region, provider
                )));
                return false;
            }
            state.draft.region = Some(region.to_string());
            state.clear_below_region();
            outcome = Ok(state.instance_generation);
            true
        });
        let generation = outcome?;

        info!("Region selected: {}/{}", provider, region);

        let fetched = self.api.list_instances(provider, region).await;
        let instances = match fetched {
            Ok(response) => response
                .instances
                .into_iter()
                .map(|record| record.instance)
                .collect::<Vec<_>>(),
            Err(e) => {
                if self.state.borrow().instance_generation != generation {
                    debug!("Discarding stale instance failure for {}: {}", region, e);
                    return Ok(Resolution::Superseded);
                }
                self.notifier.error(format!(
                    "Unable to load instance types for {}/{}: {}",
                    provider, region, e
                ));
                return Err(e);
            }
        };

        let mut resolution = Resolution::Superseded;
        self.state.send_if_modified(|state| {
            if state.instance_generation != generation {
                return false;
            }
            resolution = Resolution::Applied(instances.len());
            // One catalog serves both roles
            state.options.master_types = instances.clone();
            state.options.slave_types = instances;
            true
        });

        if resolution == Resolution::Superseded {
            debug!("Discarding stale instance list for {}/{}", provider, region);
        }
        Ok(resolution)
    }

    /// Pick the master node instance type
    pub fn select_master_type(&self, instance: &str) -> Result<(), ClientError> {
        self.select_instance(instance, |draft, value| draft.master_type = Some(value))
    }

    /// Pick the slave node instance type
    pub fn select_slave_type(&self, instance: &str) -> Result<(), ClientError> {
        self.select_instance(instance, |draft, value| draft.slave_type = Some(value))
    }

    fn select_instance(
        &self,
        instance: &str,
        set: impl FnOnce(&mut GridDraft, String),
    ) -> Result<(), ClientError> {
        let accepted = self.state.send_if_modified(|state| {
            if !state.options.master_types.iter().any(|i| i == instance) {
                return false;
            }
            set(&mut state.draft, instance.to_string());
            true
        });
        if accepted {
            Ok(())
        } else {
            Err(ClientError::ValidationError(format!(
                "Unknown instance type {:?}",
                instance
            )))
        }
    }

    pub fn set_name(&self, name: &str) {
        self.state.send_modify(|state| state.draft.name = name.to_string());
    }

    pub fn set_slave_nodes(&self, slave_nodes: &str) {
        self.state
            .send_modify(|state| state.draft.slave_nodes = slave_nodes.to_string());
    }

    pub fn set_ttl(&self, ttl: &str) {
        self.state.send_modify(|state| state.draft.ttl = ttl.to_string());
    }

    /// Reset the draft and every dependent list. Providers stay loaded.
    pub fn clear(&self) {
        self.state.send_modify(|state| {
            state.draft.provider = None;
            state.draft.name.clear();
            state.draft.ttl.clear();
            state.clear_below_provider();
        });
    }
}
