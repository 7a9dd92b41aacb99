//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;
use tracing::warn;

use crate::lifecycle::TestOptions;
use crate::storage::settings::Settings;
use crate::tail::TailOptions;

/// Shortest accepted polling interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Backend API base URL
    pub backend_base_url: String,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Timeout for a whole upload; `None` lets large files take as long as needed
    pub upload_timeout: Option<Duration>,

    /// Opaque `Authorization` cookie forwarded with every request
    pub auth_cookie: Option<SecretString>,

    /// Log tail options
    pub tail: TailOptions,

    /// Test manager options
    pub tests: TestOptions,

    /// Buffered notices per subscriber
    pub notice_capacity: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(10),
            upload_timeout: None,
            auth_cookie: None,
            tail: TailOptions::default(),
            tests: TestOptions::default(),
            notice_capacity: 64,
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: Settings) -> Self {
        let mut interval = Duration::from_millis(settings.tail.poll_interval_ms);
        if interval < MIN_POLL_INTERVAL {
            warn!(
                "tail.poll_interval_ms {} is too short, using {} ms",
                settings.tail.poll_interval_ms,
                MIN_POLL_INTERVAL.as_millis()
            );
            interval = MIN_POLL_INTERVAL;
        }

        Self {
            backend_base_url: settings.backend.base_url,
            request_timeout: Duration::from_secs(settings.backend.request_timeout_secs),
            upload_timeout: settings.backend.upload_timeout_secs.map(Duration::from_secs),
            auth_cookie: settings.backend.auth_cookie,
            tail: TailOptions {
                interval,
                max_consecutive_failures: settings.tail.max_consecutive_failures,
                max_backoff: Duration::from_secs(settings.tail.max_backoff_secs),
            },
            tests: TestOptions {
                preserve_draft_on_failure: settings.upload.preserve_draft_on_failure,
            },
            ..Default::default()
        }
    }
}
