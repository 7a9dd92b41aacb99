//! Grid lifecycle manager

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use swarmhub_models::{Grid, SubmitAck};

use crate::errors::ClientError;
use crate::http::{LogSubject, SwarmApi};
use crate::notify::Notifier;
use crate::resolver::ResourceOptionResolver;
use crate::tail::LogTailController;

/// Grid lifecycle manager
pub struct GridLifecycleManager {
    api: Arc<dyn SwarmApi>,
    notifier: Notifier,
    resolver: Arc<ResourceOptionResolver>,
    tail: Arc<LogTailController>,
    grids: watch::Sender<Vec<Grid>>,
}

impl GridLifecycleManager {
    pub fn new(
        api: Arc<dyn SwarmApi>,
        notifier: Notifier,
        resolver: Arc<ResourceOptionResolver>,
        tail: Arc<LogTailController>,
    ) -> Self {
        let (grids, _rx) = watch::channel(Vec::new());
        Self {
            api,
            notifier,
            resolver,
            tail,
            grids,
        }
    }

    /// Last fetched grid list
    pub fn grids(&self) -> Vec<Grid> {
        self.grids.borrow().clone()
    }

    /// Grids whose status is `Deployed`
    pub fn deployed_grids(&self) -> Vec<Grid> {
        self.grids
            .borrow()
            .iter()
            .filter(|grid| grid.is_deployed())
            .cloned()
            .collect()
    }

    /// Subscribe to grid list changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<Grid>> {
        self.grids.subscribe()
    }

    /// The option resolver feeding grid creation
    pub fn resolver(&self) -> &Arc<ResourceOptionResolver> {
        &self.resolver
    }

    /// Refetch the grid list
    pub async fn refresh(&self) -> Result<Vec<Grid>, ClientError> {
        match self.api.list_grids().await {
            Ok(grids) => {
                self.grids.send_replace(grids.clone());
                Ok(grids)
            }
            Err(e) => {
                self.notifier.error(format!("Unable to load grids: {}", e));
                Err(e)
            }
        }
    }

    /// Fetch one grid
    pub async fn get(&self, grid_id: &str) -> Result<Grid, ClientError> {
        self.api.get_grid(grid_id).await.inspect_err(|e| {
            self.notifier
                .error(format!("Unable to load grid {}: {}", grid_id, e));
        })
    }

    /// Submit the resolver's draft as a new grid
    pub async fn create(&self) -> Result<SubmitAck, ClientError> {
        let request = self.resolver.draft().to_request().inspect_err(|e| {
            self.notifier.warn(e.to_string());
        })?;

        info!(
            "Creating grid {:?} on {}/{}",
            request.name, request.provider, request.region
        );

        let ack = self.api.create_grid(&request).await.inspect_err(|e| {
            self.notifier.error(format!("Unable to create grid: {}", e));
        })?;

        self.resolver.clear();
        let _ = self.refresh().await;
        Ok(ack)
    }

    /// Provision a grid that is `Ready`
    pub async fn start(&self, grid_id: &str) -> Result<SubmitAck, ClientError> {
        info!("Starting grid {}", grid_id);
        let ack = self.api.start_grid(grid_id).await.inspect_err(|e| {
            self.notifier
                .error(format!("Unable to start grid {}: {}", grid_id, e));
        })?;
        let _ = self.refresh().await;
        Ok(ack)
    }

    /// Tear down a running grid
    pub async fn stop(&self, grid_id: &str) -> Result<SubmitAck, ClientError> {
        info!("Stopping grid {}", grid_id);
        let ack = self.api.stop_grid(grid_id).await.inspect_err(|e| {
            self.notifier
                .error(format!("Unable to stop grid {}: {}", grid_id, e));
        })?;
        let _ = self.refresh().await;
        Ok(ack)
    }

    /// Delete a grid and refetch the list whatever the outcome
    pub async fn delete(&self, grid_id: &str) -> Result<SubmitAck, ClientError> {
        info!("Deleting grid {}", grid_id);
        let result = self.api.delete_grid(grid_id).await;
        let _ = self.refresh().await;
        result.inspect_err(|e| {
            self.notifier
                .error(format!("Unable to delete grid {}: {}", grid_id, e));
        })
    }

    /// Tail the grid's deployment output
    pub async fn watch_logs(&self, grid_id: &str) -> Result<(), ClientError> {
        self.tail.start(LogSubject::Grid(grid_id.to_string())).await
    }
}
