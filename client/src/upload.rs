//! Test upload coordinator
//!
//! Streams the workload file and its JSON metadata as one multipart request
//! and tracks byte-level progress in a watchable slice.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use swarmhub_models::{SubmitAck, TestMetadata};

use crate::errors::ClientError;
use crate::http::{SwarmApi, UploadForm};

/// Progress of the current upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
    pub percent: u8,
    pub in_flight: bool,
}

/// `floor(loaded * 100 / total)` clamped to `0..=100`. An empty upload is
/// complete by definition.
pub fn progress_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (u128::from(loaded) * 100 / u128::from(total)).min(100);
    percent as u8
}

/// Record a transfer event. Progress never moves backwards within an upload.
fn record(progress: &watch::Sender<UploadProgress>, loaded: u64, total: u64) {
    progress.send_if_modified(|current| {
        if loaded < current.loaded {
            return false;
        }
        current.loaded = loaded;
        current.total = total;
        current.percent = current.percent.max(progress_percent(loaded, total));
        true
    });
}

/// Upload coordinator
pub struct UploadCoordinator {
    api: Arc<dyn SwarmApi>,
    progress: Arc<watch::Sender<UploadProgress>>,
}

impl UploadCoordinator {
    pub fn new(api: Arc<dyn SwarmApi>) -> Self {
        let (progress, _rx) = watch::channel(UploadProgress::default());
        Self {
            api,
            progress: Arc::new(progress),
        }
    }

    /// Current progress
    pub fn progress(&self) -> UploadProgress {
        *self.progress.borrow()
    }

    /// Subscribe to progress changes
    pub fn subscribe(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    /// Submit `file` with `metadata` as a new test
    pub async fn submit(
        &self,
        file: &Path,
        metadata: &TestMetadata,
    ) -> Result<SubmitAck, ClientError> {
        let handle = tokio::fs::File::open(file).await?;
        let file_len = handle.metadata().await?.len();
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        self.progress.send_replace(UploadProgress {
            loaded: 0,
            total: file_len,
            percent: 0,
            in_flight: true,
        });

        info!("Uploading {} ({} bytes) as test {:?}", file_name, file_len, metadata.name);

        let progress = self.progress.clone();
        let mut loaded = 0u64;
        let body = Box::pin(ReaderStream::new(handle).inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                loaded += bytes.len() as u64;
                record(&progress, loaded, file_len);
            }
        }));

        let form = UploadForm {
            file_name,
            file_len,
            body,
            metadata: metadata.clone(),
        };

        let result = self.api.create_test(form).await;

        if result.is_ok() {
            record(&self.progress, file_len, file_len);
        }
        self.progress.send_modify(|p| p.in_flight = false);

        match &result {
            Ok(ack) => debug!("Upload accepted: {:?}", ack),
            Err(e) => debug!("Upload failed: {}", e),
        }
        result
    }
}
