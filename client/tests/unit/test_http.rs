//! HTTP client tests against a local server

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Multipart, Path, Query};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::channel::mpsc;
use futures::stream;
use secrecy::SecretString;
use serde_json::{json, Value};

use swarmhub::errors::ClientError;
use swarmhub::http::client::HttpClient;
use swarmhub::http::{GridsApi, LogSubject, LogsApi, TestsApi, UploadForm};
use swarmhub_models::{CreateGridRequest, LaunchTestRequest, SubmitAck, TestMetadata};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn router() -> Router {
    Router::new()
        .route("/api/tests", get(|| async { Json(Value::Null) }))
        .route(
            "/api/test",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                Json(json!({ "ID": query["id"], "Name": "checkout", "Labels": null }))
            })
            .post(upload),
        )
        .route(
            "/api/test/{id}/deploylogs",
            get(|Path(id): Path<String>| async move {
                Json(json!([
                    { "ID": id, "Output": "pulling image", "Running": true, "Timestamp": 1672567200000i64 },
                    { "ID": id, "Output": "\u{1b}[32mOK\u{1b}[0m", "Running": false, "Timestamp": "2023-01-01T10:00:00Z" }
                ]))
            }),
        )
        .route(
            "/api/test/{id}/start",
            post(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                if body["GridID"] == "g-busy" {
                    "This grid is not in a deployed state.".to_string()
                } else {
                    format!("sent a start command for test id: {}", id)
                }
            }),
        )
        .route(
            "/api/test/{id}/cancel",
            post(|Path(id): Path<String>| async move {
                format!("sent a stop command for test id: {}", id)
            }),
        )
        .route(
            "/api/test/{id}/label/{label}",
            post(echo_label).delete(echo_label),
        )
        .route(
            "/api/test/{id}/stop",
            post(|| async { (StatusCode::BAD_REQUEST, "Test is not running") }),
        )
        .route(
            "/api/grids",
            get(|| async {
                Json(json!([{
                    "ID": "g-1", "Name": "smoke", "Provider": "aws", "Region": "us-east-1",
                    "Master": "t2.micro", "Slave": "m5.large", "Nodes": "3", "TTL": "3600",
                    "Status": "Deployed"
                }]))
            }),
        )
        .route(
            "/api/grid/{id}",
            get(|Path(id): Path<String>, headers: HeaderMap| async move {
                let cookie = headers
                    .get("cookie")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({ "ID": id, "Name": cookie }))
            }),
        )
        .route(
            "/api/grid",
            post(|Json(body): Json<Value>| async move {
                if body["SlaveNodes"].is_i64() && body["TTL"].is_i64() {
                    (StatusCode::OK, Json(json!({ "ID": "g-2", "Status": "Provisioning" })))
                } else {
                    (StatusCode::BAD_REQUEST, Json(json!({ "Description": "bad numbers" })))
                }
            }),
        )
        .route("/api/grid/{id}/delete", post(|| async { StatusCode::OK }))
        .route("/api/grid/{id}/start", post(|| async { StatusCode::OK }))
        .route(
            "/api/grid/{id}/stop",
            post(|Path(id): Path<String>| async move {
                if id == "g-gone" {
                    format!("Failed to perform StopGrid: {}", id)
                } else {
                    format!("sent a stop command for grid id: {}", id)
                }
            }),
        )
        .route(
            "/api/grids/regions",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                Json(json!({ "Regions": [{ "Provider": query["provider"], "Region": "us-east-1" }] }))
            }),
        )
        .route(
            "/api/grids/instances",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                let instance = format!("{}-{}", query["provider"], query["region"]);
                Json(json!({ "Instances": [{ "Instance": instance }] }))
            }),
        )
        .route(
            "/api/grids/providers",
            get(|| async { Json(json!({ "Providers": null })) }),
        )
}

async fn echo_label(method: Method, Path((id, label)): Path<(String, String)>) -> Json<Value> {
    Json(json!({ "ID": id, "Description": format!("{} {}", method, label) }))
}

async fn upload(mut multipart: Multipart) -> Json<Value> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap();
        parts.push(json!({
            "name": name,
            "file_name": file_name,
            "data": String::from_utf8_lossy(&data),
        }));
    }
    Json(json!({ "Status": "Success", "Description": Value::Array(parts).to_string() }))
}

async fn client() -> HttpClient {
    let base_url = serve(router()).await;
    HttpClient::new(&base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_null_lists_read_as_empty() {
    let client = client().await;
    assert!(client.list_tests().await.unwrap().is_empty());
    assert!(client.list_providers().await.unwrap().providers.is_empty());
}

#[tokio::test]
async fn test_get_test_by_query() {
    let client = client().await;
    let test = client.get_test("t-7").await.unwrap();
    assert_eq!(test.id, "t-7");
    assert_eq!(test.name, "checkout");
    assert!(test.labels.is_empty());
}

#[tokio::test]
async fn test_deploy_logs_mixed_timestamps() {
    let client = client().await;
    let entries = client
        .deploy_logs(&LogSubject::Test("t-1".to_string()))
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].timestamp, entries[1].timestamp);
    assert!(!entries[1].running);
    assert_eq!(
        swarmhub::tail::format_log_line(&entries[1]),
        "Jan 1, 2023 10:00:00AM: OK"
    );
}

#[tokio::test]
async fn test_multipart_upload() {
    let client = client().await;
    let chunks: Vec<std::io::Result<Bytes>> =
        vec![Ok(Bytes::from_static(b"PK\x03")), Ok(Bytes::from_static(b"\x04zip"))];
    let form = UploadForm {
        file_name: "load.zip".to_string(),
        file_len: 7,
        body: Box::pin(stream::iter(chunks)),
        metadata: TestMetadata {
            name: "checkout".to_string(),
            desc: "peak".to_string(),
        },
    };

    let ack = client.create_test(form).await.unwrap();
    assert_eq!(ack.status, "Success");

    let parts: Value = serde_json::from_str(&ack.description).unwrap();
    assert_eq!(parts[0]["name"], "file");
    assert_eq!(parts[0]["file_name"], "load.zip");
    assert_eq!(parts[0]["data"], "PK\u{3}\u{4}zip");
    assert_eq!(parts[1]["name"], "metadata");
    let metadata: Value = serde_json::from_str(parts[1]["data"].as_str().unwrap()).unwrap();
    assert_eq!(metadata, json!({ "Name": "checkout", "Desc": "peak" }));
}

/// A body fed one chunk every `gap`
fn trickle(chunks: &[&'static str], gap: Duration) -> UploadForm {
    let file_len = chunks.iter().map(|c| c.len() as u64).sum();
    let chunks = chunks.to_vec();
    let (tx, rx) = mpsc::unbounded();
    tokio::spawn(async move {
        for chunk in chunks {
            tokio::time::sleep(gap).await;
            if tx.unbounded_send(Ok(Bytes::from_static(chunk.as_bytes()))).is_err() {
                return;
            }
        }
    });
    UploadForm {
        file_name: "slow.zip".to_string(),
        file_len,
        body: Box::pin(rx),
        metadata: TestMetadata {
            name: "soak".to_string(),
            desc: String::new(),
        },
    }
}

#[tokio::test]
async fn test_upload_outlasts_request_timeout() {
    let base_url = serve(router()).await;
    let client = HttpClient::new(&base_url, Duration::from_secs(1)).unwrap();

    let form = trickle(
        &["PK\u{3}\u{4}", "slow", "body", "done"],
        Duration::from_millis(500),
    );
    let ack = client.create_test(form).await.unwrap();

    let parts: Value = serde_json::from_str(&ack.description).unwrap();
    assert_eq!(parts[0]["data"], "PK\u{3}\u{4}slowbodydone");
}

#[tokio::test]
async fn test_upload_timeout_bounds_uploads() {
    let base_url = serve(router()).await;
    let client = HttpClient::new(&base_url, Duration::from_secs(5))
        .unwrap()
        .with_upload_timeout(Some(Duration::from_millis(300)));

    let form = trickle(&["PK\u{3}\u{4}", "slow"], Duration::from_millis(500));
    let result = client.create_test(form).await;
    assert!(matches!(result, Err(ClientError::HttpError(_))));
}

fn launch_request(grid_id: &str) -> LaunchTestRequest {
    LaunchTestRequest {
        grid_id: grid_id.to_string(),
        start_automatically: true,
        grid_region: "us-east-1".to_string(),
    }
}

#[tokio::test]
async fn test_plain_text_ack() {
    let client = client().await;
    let ack = client.launch_test("t-1", &launch_request("g-1")).await.unwrap();
    assert_eq!(ack.description, "sent a start command for test id: t-1");
}

#[tokio::test]
async fn test_launch_refusal_with_ok_status() {
    let client = client().await;
    match client.launch_test("t-1", &launch_request("g-busy")).await {
        Err(ClientError::Rejected(reason)) => {
            assert_eq!(reason, "This grid is not in a deployed state.");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_test() {
    let client = client().await;
    let ack = client.cancel_test("t-3").await.unwrap();
    assert_eq!(ack.description, "sent a stop command for test id: t-3");
}

#[tokio::test]
async fn test_label_path_is_encoded() {
    let client = client().await;

    let ack = client.add_label("t-1", "peak load/eu").await.unwrap();
    assert_eq!(ack.id, "t-1");
    assert_eq!(ack.description, "POST peak load/eu");

    let ack = client.remove_label("t-1", "peak load/eu").await.unwrap();
    assert_eq!(ack.description, "DELETE peak load/eu");
}

#[tokio::test]
async fn test_grid_start_and_stop() {
    let client = client().await;
    assert_eq!(client.start_grid("g-1").await.unwrap(), SubmitAck::default());

    let ack = client.stop_grid("g-1").await.unwrap();
    assert_eq!(ack.description, "sent a stop command for grid id: g-1");

    match client.stop_grid("g-gone").await {
        Err(ClientError::Rejected(reason)) => {
            assert_eq!(reason, "Failed to perform StopGrid: g-gone");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_error_status_maps_to_server_error() {
    let client = client().await;
    match client.stop_test("t-1").await {
        Err(ClientError::ServerError { status, body }) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, "Test is not running");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_grid_list_legacy_fields() {
    let client = client().await;
    let grids = client.list_grids().await.unwrap();
    assert_eq!(grids.len(), 1);
    assert_eq!(grids[0].master_type, "t2.micro");
    assert_eq!(grids[0].slave_type, "m5.large");
    assert_eq!(grids[0].slave_nodes, 3);
    assert_eq!(grids[0].ttl, 3600);
    assert!(grids[0].is_deployed());
}

#[tokio::test]
async fn test_grid_create_and_delete() {
    let client = client().await;
    let request = CreateGridRequest {
        name: "g1".to_string(),
        provider: "aws".to_string(),
        region: "us-east-1".to_string(),
        master_type: "t2.micro".to_string(),
        slave_type: "t2.micro".to_string(),
        slave_nodes: 3,
        ttl: 3600,
    };
    let ack = client.create_grid(&request).await.unwrap();
    assert_eq!(ack.id, "g-2");
    assert_eq!(ack.status, "Provisioning");

    let ack = client.delete_grid("g-2").await.unwrap();
    assert_eq!(ack, SubmitAck::default());
}

#[tokio::test]
async fn test_option_queries() {
    let client = client().await;
    let regions = client.list_regions("aws").await.unwrap();
    assert_eq!(regions.regions[0].provider, "aws");
    assert_eq!(regions.regions[0].region, "us-east-1");

    let instances = client.list_instances("aws", "us-east-1").await.unwrap();
    assert_eq!(instances.instances[0].instance, "aws-us-east-1");
}

#[tokio::test]
async fn test_auth_cookie_is_forwarded() {
    let base_url = serve(router()).await;
    let client = HttpClient::new(&base_url, Duration::from_secs(5))
        .unwrap()
        .with_auth_cookie(SecretString::from("session-token".to_string()));

    let grid = client.get_grid("g-1").await.unwrap();
    assert_eq!(grid.name, "Authorization=session-token");
}
