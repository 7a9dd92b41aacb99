//! Upload coordinator tests

use std::sync::Arc;

use swarmhub::errors::ClientError;
use swarmhub::http::SwarmApi;
use swarmhub::upload::{UploadCoordinator, UploadProgress};
use swarmhub_models::TestMetadata;

use crate::common::{workload_file, MockApi};

fn metadata() -> TestMetadata {
    TestMetadata {
        name: "checkout flow".to_string(),
        desc: "peak hour".to_string(),
    }
}

#[tokio::test]
async fn test_submit_streams_file_and_metadata() {
    let contents: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let file = workload_file(&contents);

    let api = Arc::new(MockApi::default());
    let dyn_api: Arc<dyn SwarmApi> = api.clone();
    let uploader = UploadCoordinator::new(dyn_api);

    let mut rx = uploader.subscribe();
    let observer = tokio::spawn(async move {
        let mut seen: Vec<UploadProgress> = Vec::new();
        while rx.changed().await.is_ok() {
            seen.push(*rx.borrow_and_update());
        }
        seen
    });

    let ack = uploader.submit(file.path(), &metadata()).await.unwrap();
    assert_eq!(ack.description, "Test created");

    let progress = uploader.progress();
    assert_eq!(progress.loaded, contents.len() as u64);
    assert_eq!(progress.total, contents.len() as u64);
    assert_eq!(progress.percent, 100);
    assert!(!progress.in_flight);

    let uploads = api.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].received, contents);
    assert_eq!(uploads[0].declared_len, contents.len() as u64);
    assert!(uploads[0].file_name.starts_with("swarmhub-"));
    assert_eq!(uploads[0].metadata, metadata());

    drop(uploader);
    let seen = observer.await.unwrap();
    assert!(!seen.is_empty());
    for pair in seen.windows(2) {
        assert!(pair[0].percent <= pair[1].percent);
        assert!(pair[0].loaded <= pair[1].loaded);
    }
    assert_eq!(seen.last().map(|p| p.percent), Some(100));
}

#[tokio::test]
async fn test_empty_file_reports_complete() {
    let file = workload_file(b"");
    let api: Arc<dyn SwarmApi> = Arc::new(MockApi::default());
    let uploader = UploadCoordinator::new(api);

    uploader.submit(file.path(), &metadata()).await.unwrap();

    let progress = uploader.progress();
    assert_eq!(progress.total, 0);
    assert_eq!(progress.percent, 100);
}

#[tokio::test]
async fn test_rejected_upload_ends_in_flight() {
    let file = workload_file(b"not a zip");
    let api = MockApi::default();
    api.fail_upload.store(true, std::sync::atomic::Ordering::SeqCst);
    let uploader = UploadCoordinator::new(Arc::new(api));

    let result = uploader.submit(file.path(), &metadata()).await;
    assert!(matches!(result, Err(ClientError::ServerError { .. })));
    assert!(!uploader.progress().in_flight);
}

#[tokio::test]
async fn test_missing_file() {
    let api: Arc<dyn SwarmApi> = Arc::new(MockApi::default());
    let uploader = UploadCoordinator::new(api);

    let result = uploader
        .submit(std::path::Path::new("/nonexistent/test.zip"), &metadata())
        .await;
    assert!(matches!(result, Err(ClientError::IoError(_))));
    assert_eq!(uploader.progress(), UploadProgress::default());
}
