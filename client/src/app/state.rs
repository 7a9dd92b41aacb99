//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::errors::ClientError;
use crate::http::client::HttpClient;
use crate::http::SwarmApi;
use crate::lifecycle::{GridLifecycleManager, TestLifecycleManager};
use crate::notify::Notifier;
use crate::resolver::ResourceOptionResolver;
use crate::tail::LogTailController;

/// Main application state.
///
/// Test and grid views share one tail controller, so at most one deployment
/// is being followed at a time.
pub struct AppState {
    /// Backend API
    pub api: Arc<dyn SwarmApi>,

    /// Operator notices
    pub notifier: Notifier,

    /// Deploy log tail
    pub tail: Arc<LogTailController>,

    /// Grid option resolver
    pub resolver: Arc<ResourceOptionResolver>,

    /// Grid manager
    pub grids: Arc<GridLifecycleManager>,

    /// Test manager
    pub tests: Arc<TestLifecycleManager>,
}

impl AppState {
    /// Initialize application state against the configured backend
    pub fn init(options: &AppOptions) -> Result<Self, ClientError> {
        info!("Connecting to SwarmHub at {}", options.backend_base_url);

        let mut http_client = HttpClient::new(&options.backend_base_url, options.request_timeout)?
            .with_upload_timeout(options.upload_timeout);
        if let Some(cookie) = &options.auth_cookie {
            http_client = http_client.with_auth_cookie(cookie.clone());
        }

        Ok(Self::with_api(Arc::new(http_client), options))
    }

    /// Build the components on top of any API implementation
    pub fn with_api(api: Arc<dyn SwarmApi>, options: &AppOptions) -> Self {
        let notifier = Notifier::new(options.notice_capacity);

        let tail = Arc::new(LogTailController::new(
            api.clone(),
            options.tail.clone(),
            notifier.clone(),
        ));

        let resolver = Arc::new(ResourceOptionResolver::new(api.clone(), notifier.clone()));

        let grids = Arc::new(GridLifecycleManager::new(
            api.clone(),
            notifier.clone(),
            resolver.clone(),
            tail.clone(),
        ));

        let tests = Arc::new(TestLifecycleManager::new(
            api.clone(),
            notifier.clone(),
            tail.clone(),
            grids.clone(),
            options.tests.clone(),
        ));

        Self {
            api,
            notifier,
            tail,
            resolver,
            grids,
            tests,
        }
    }

    /// Stop any active tail
    pub fn shutdown(&self) {
        info!("Shutting down application state...");
        self.tail.stop();
    }
}
