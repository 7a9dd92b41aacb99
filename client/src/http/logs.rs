//! Deployment log API

use std::fmt;

use async_trait::async_trait;

use swarmhub_models::LogEntry;

use crate::errors::ClientError;
use crate::http::client::HttpClient;

/// The resource whose deployment output is tailed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogSubject {
    Test(String),
    Grid(String),
}

impl LogSubject {
    /// Path of the full log history for this subject
    pub fn path(&self) -> String {
        match self {
            LogSubject::Test(id) => format!("/api/test/{}/deploylogs", id),
            LogSubject::Grid(id) => format!("/api/grid/{}/deploylogs", id),
        }
    }
}

impl fmt::Display for LogSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSubject::Test(id) => write!(f, "test {}", id),
            LogSubject::Grid(id) => write!(f, "grid {}", id),
        }
    }
}

/// Deployment log endpoints
#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Fetch the full, chronologically ordered log history
    async fn deploy_logs(&self, subject: &LogSubject) -> Result<Vec<LogEntry>, ClientError>;
}

#[async_trait]
impl LogsApi for HttpClient {
    async fn deploy_logs(&self, subject: &LogSubject) -> Result<Vec<LogEntry>, ClientError> {
        let entries: Option<Vec<LogEntry>> = self.get(&subject.path()).await?;
        Ok(entries.unwrap_or_default())
    }
}
