//! Grid API client

use async_trait::async_trait;

use swarmhub_models::{
    CreateGridRequest, Grid, InstancesResponse, ProvidersResponse, RegionsResponse, SubmitAck,
};

use crate::errors::ClientError;
use crate::http::client::{require_ack, HttpClient};

/// Grid endpoints
#[async_trait]
pub trait GridsApi: Send + Sync {
    /// List all grids
    async fn list_grids(&self) -> Result<Vec<Grid>, ClientError>;

    /// Get a specific grid by ID
    async fn get_grid(&self, grid_id: &str) -> Result<Grid, ClientError>;

    /// Request a new grid
    async fn create_grid(&self, request: &CreateGridRequest) -> Result<SubmitAck, ClientError>;

    /// Provision a grid that is in the `Ready` state
    async fn start_grid(&self, grid_id: &str) -> Result<SubmitAck, ClientError>;

    /// Tear down a running grid
    async fn stop_grid(&self, grid_id: &str) -> Result<SubmitAck, ClientError>;

    /// Delete a grid
    async fn delete_grid(&self, grid_id: &str) -> Result<SubmitAck, ClientError>;

    /// List cloud providers
    async fn list_providers(&self) -> Result<ProvidersResponse, ClientError>;

    /// List regions offered by a provider
    async fn list_regions(&self, provider: &str) -> Result<RegionsResponse, ClientError>;

    /// List instance types offered in a provider region
    async fn list_instances(
        &self,
        provider: &str,
        region: &str,
    ) -> Result<InstancesResponse, ClientError>;
}

#[async_trait]
impl GridsApi for HttpClient {
    async fn list_grids(&self) -> Result<Vec<Grid>, ClientError> {
        let grids: Option<Vec<Grid>> = self.get("/api/grids").await?;
        Ok(grids.unwrap_or_default())
    }

    async fn get_grid(&self, grid_id: &str) -> Result<Grid, ClientError> {
        let path = format!("/api/grid/{}", grid_id);
        self.get(&path).await
    }

    async fn create_grid(&self, request: &CreateGridRequest) -> Result<SubmitAck, ClientError> {
        self.post("/api/grid", request).await
    }

    async fn start_grid(&self, grid_id: &str) -> Result<SubmitAck, ClientError> {
        let path = format!("/api/grid/{}/start", grid_id);
        self.post_empty(&path).await
    }

    async fn stop_grid(&self, grid_id: &str) -> Result<SubmitAck, ClientError> {
        let path = format!("/api/grid/{}/stop", grid_id);
        let ack = self.post_empty(&path).await?;
        require_ack(ack, "sent a stop command")
    }

    async fn delete_grid(&self, grid_id: &str) -> Result<SubmitAck, ClientError> {
        let path = format!("/api/grid/{}/delete", grid_id);
        self.post_empty(&path).await
    }

    async fn list_providers(&self) -> Result<ProvidersResponse, ClientError> {
        self.get("/api/grids/providers").await
    }

    async fn list_regions(&self, provider: &str) -> Result<RegionsResponse, ClientError> {
        self.get_with_query("/api/grids/regions", &[("provider", provider)])
            .await
    }

    async fn list_instances(
        &self,
        provider: &str,
        region: &str,
    ) -> Result<InstancesResponse, ClientError> {
        self.get_with_query(
            "/api/grids/instances",
            &[("provider", provider), ("region", region)],
        )
        .await
    }
}
