//! API models

pub mod de;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grid status the client treats as ready to run tests
pub const GRID_STATUS_DEPLOYED: &str = "Deployed";

/// A submitted test workload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Test {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub launched: String,
    #[serde(default)]
    pub stopped: String,
}

/// Metadata part of a test submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestMetadata {
    pub name: String,
    pub desc: String,
}

/// Acknowledgement returned by submission endpoints.
///
/// The server answers test creation with `{Status, Description}`; other
/// deployments echo the created resource. Both decode into this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubmitAck {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
}

/// Request body for launching a test on a grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTestRequest {
    #[serde(rename = "GridID")]
    pub grid_id: String,
    #[serde(rename = "StartAutomatically")]
    pub start_automatically: bool,
    #[serde(rename = "GridRegion")]
    pub grid_region: String,
}

/// A provisioned grid.
///
/// List and detail responses use `Master`, `Slave` and `Nodes`, and send the
/// numeric fields as strings; both forms are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Grid {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub region: String,
    #[serde(alias = "Master", default)]
    pub master_type: String,
    #[serde(alias = "Slave", default)]
    pub slave_type: String,
    #[serde(alias = "Nodes", default, deserialize_with = "de::int_or_string")]
    pub slave_nodes: i64,
    #[serde(rename = "TTL", default, deserialize_with = "de::int_or_string")]
    pub ttl: i64,
    #[serde(default)]
    pub status: String,
}

impl Grid {
    pub fn is_deployed(&self) -> bool {
        self.status == GRID_STATUS_DEPLOYED
    }
}

/// Grid creation request. `SlaveNodes` and `TTL` are always integers on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGridRequest {
    pub name: String,
    pub provider: String,
    pub region: String,
    pub master_type: String,
    pub slave_type: String,
    pub slave_nodes: i64,
    #[serde(rename = "TTL")]
    pub ttl: i64,
}

/// Provider list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvidersResponse {
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub providers: Vec<String>,
}

/// Region record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegionRecord {
    #[serde(default)]
    pub provider: String,
    pub region: String,
}

/// Region list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegionsResponse {
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub regions: Vec<RegionRecord>,
}

/// Instance type record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceRecord {
    pub instance: String,
}

/// Instance type list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstancesResponse {
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub instances: Vec<InstanceRecord>,
}

/// One line of deployment output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(default)]
    pub stream_type: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default, deserialize_with = "de::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sequence: u64,
}
