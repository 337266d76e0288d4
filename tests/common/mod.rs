//! Shared utilities for integration tests: a scripted stand-in for the Admin
//! GraphQL API and its blob store, plus a relay wired to it.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use shop_media_relay::{RelayConfig, RelayServer};

pub const ADMIN_PASSWORD: &str = "correct-horse";

/// 1x1 transparent PNG.
pub const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub fn png_data_uri() -> String {
    format!("data:image/png;base64,{}", PIXEL_PNG)
}

/// How a newly created file behaves when polled.
#[derive(Debug, Clone, Copy)]
pub enum Processing {
    /// `fileCreate` already returns READY with a URL.
    Immediate,
    /// PROCESSING for this many polls, then READY.
    AfterPolls(u32),
    /// FAILED on the first poll.
    Fails,
    /// PROCESSING forever.
    Never,
}

#[derive(Debug, Clone)]
pub struct MockFile {
    pub id: String,
    pub alt: String,
    pub url: Option<String>,
    pub status: &'static str,
    polls_left: Option<u32>,
    fails: bool,
}

impl MockFile {
    pub fn ready(id: &str, alt: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            alt: alt.to_string(),
            url: Some(url.to_string()),
            status: "READY",
            polls_left: Some(0),
            fails: false,
        }
    }

    fn to_node(&self) -> Value {
        let errors = if self.status == "FAILED" {
            json!([{ "code": "MEDIA_ERROR", "message": "unsupported image" }])
        } else {
            json!([])
        };
        json!({
            "__typename": "MediaImage",
            "id": self.id,
            "alt": self.alt,
            "fileStatus": self.status,
            "fileErrors": errors,
            "image": self.url.as_ref().map(|url| json!({ "url": url })),
        })
    }
}

#[derive(Debug)]
pub struct MockState {
    pub addr: SocketAddr,
    pub processing: Processing,
    pub transfer_status: u16,
    pub staging_user_error: Option<String>,
    pub files: Vec<MockFile>,
    /// Operation names in the order received.
    pub operations: Vec<String>,
    /// Form field names of every transfer, in wire order.
    pub transfers: Vec<Vec<String>>,
    /// `fileDelete` calls (0-based) that answer with HTTP 500.
    pub failing_delete_calls: HashSet<usize>,
    pub delete_calls: usize,
    pub next_id: u64,
}

/// Handle to a running mock platform.
#[derive(Clone)]
pub struct MockPlatform {
    pub state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(MockState {
            addr,
            processing: Processing::Immediate,
            transfer_status: 204,
            staging_user_error: None,
            files: Vec::new(),
            operations: Vec::new(),
            transfers: Vec::new(),
            failing_delete_calls: HashSet::new(),
            delete_calls: 0,
            next_id: 1,
        }));

        let app = Router::new()
            .route("/graphql", post(graphql))
            .route("/upload", post(blob_upload))
            .with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/graphql", self.state.lock().unwrap().addr)
    }

    pub fn set_processing(&self, processing: Processing) {
        self.state.lock().unwrap().processing = processing;
    }

    pub fn set_transfer_status(&self, status: u16) {
        self.state.lock().unwrap().transfer_status = status;
    }

    pub fn set_staging_user_error(&self, message: &str) {
        self.state.lock().unwrap().staging_user_error = Some(message.to_string());
    }

    pub fn fail_delete_call(&self, call: usize) {
        self.state.lock().unwrap().failing_delete_calls.insert(call);
    }

    pub fn seed_files(&self, files: impl IntoIterator<Item = MockFile>) {
        self.state.lock().unwrap().files.extend(files);
    }

    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn transfers(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().transfers.clone()
    }

    pub fn file_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .files
            .iter()
            .map(|f| f.id.clone())
            .collect()
    }
}

fn operation_name(query: &str) -> String {
    query
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .split('(')
        .next()
        .unwrap_or_default()
        .to_string()
}

async fn graphql(State(state): State<Arc<Mutex<MockState>>>, Json(body): Json<Value>) -> Response {
    let query = body["query"].as_str().unwrap_or_default();
    let vars = &body["variables"];
    let op = operation_name(query);

    let mut s = state.lock().unwrap();
    s.operations.push(op.clone());

    let data = match op.as_str() {
        "stagedUploadsCreate" => {
            if let Some(message) = s.staging_user_error.clone() {
                json!({ "stagedUploadsCreate": {
                    "stagedTargets": [],
                    "userErrors": [{ "field": ["input"], "message": message }],
                }})
            } else {
                let filename = vars["input"][0]["filename"].as_str().unwrap_or_default();
                json!({ "stagedUploadsCreate": {
                    "stagedTargets": [{
                        "url": format!("http://{}/upload", s.addr),
                        "resourceUrl": format!("http://{}/tmp/{}", s.addr, filename),
                        "parameters": [
                            { "name": "key", "value": format!("tmp/{}", filename) },
                            { "name": "policy", "value": "cG9saWN5" },
                            { "name": "x-goog-signature", "value": "c2ln" },
                        ],
                    }],
                    "userErrors": [],
                }})
            }
        }
        "fileCreate" => {
            let alt = vars["files"][0]["alt"].as_str().unwrap_or_default().to_string();
            let id = format!("gid://shopify/MediaImage/{}", s.next_id);
            s.next_id += 1;
            let cdn = format!("https://cdn.example.com/files/{}", alt);
            let file = match s.processing {
                Processing::Immediate => MockFile::ready(&id, &alt, &cdn),
                Processing::AfterPolls(n) => MockFile {
                    id,
                    alt,
                    url: None,
                    status: "UPLOADED",
                    polls_left: Some(n),
                    fails: false,
                },
                Processing::Fails => MockFile {
                    id,
                    alt,
                    url: None,
                    status: "UPLOADED",
                    polls_left: None,
                    fails: true,
                },
                Processing::Never => MockFile {
                    id,
                    alt,
                    url: None,
                    status: "UPLOADED",
                    polls_left: None,
                    fails: false,
                },
            };
            let node = file.to_node();
            s.files.push(file);
            json!({ "fileCreate": { "files": [node], "userErrors": [] } })
        }
        "fileStatus" => {
            let id = vars["id"].as_str().unwrap_or_default();
            let node = s.files.iter_mut().find(|f| f.id == id).map(|file| {
                if file.status != "READY" {
                    if file.fails {
                        file.status = "FAILED";
                    } else {
                        match file.polls_left {
                            Some(0) => {
                                file.status = "READY";
                                file.url = Some(format!("https://cdn.example.com/files/{}", file.alt));
                            }
                            Some(n) => {
                                file.status = "PROCESSING";
                                file.polls_left = Some(n - 1);
                            }
                            None => file.status = "PROCESSING",
                        }
                    }
                }
                file.to_node()
            });
            // Ids of other node types resolve, but select nothing from the
            // `File` fragment.
            let node = node.or_else(|| id.contains("/Product/").then(|| json!({})));
            json!({ "node": node })
        }
        "listFiles" => {
            let first = vars["first"].as_u64().unwrap_or(50) as usize;
            let start = vars["after"]
                .as_str()
                .and_then(|c| c.parse::<usize>().ok())
                .unwrap_or(0);
            let end = (start + first).min(s.files.len());
            let nodes: Vec<Value> = s.files[start..end].iter().map(MockFile::to_node).collect();
            let has_next = end < s.files.len();
            json!({ "files": {
                "nodes": nodes,
                "pageInfo": {
                    "hasNextPage": has_next,
                    "endCursor": has_next.then(|| end.to_string()),
                },
            }})
        }
        "fileDelete" => {
            let call = s.delete_calls;
            s.delete_calls += 1;
            if s.failing_delete_calls.contains(&call) {
                return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
            }
            let ids: Vec<String> = vars["fileIds"]
                .as_array()
                .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default();
            let deleted: Vec<String> = ids
                .iter()
                .filter(|id| s.files.iter().any(|f| &f.id == *id))
                .cloned()
                .collect();
            s.files.retain(|f| !deleted.contains(&f.id));
            json!({ "fileDelete": { "deletedFileIds": deleted, "userErrors": [] } })
        }
        other => {
            return Json(json!({ "errors": [{ "message": format!("unknown operation {}", other) }] }))
                .into_response()
        }
    };

    Json(json!({ "data": data })).into_response()
}

async fn blob_upload(State(state): State<Arc<Mutex<MockState>>>, body: Bytes) -> Response {
    let text = String::from_utf8_lossy(&body);
    let fields: Vec<String> = text
        .split("; name=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(String::from)
        .collect();

    let mut s = state.lock().unwrap();
    s.transfers.push(fields);
    let status = StatusCode::from_u16(s.transfer_status).unwrap_or(StatusCode::OK);
    if status.is_success() {
        status.into_response()
    } else {
        (status, "<Error><Code>AccessDenied</Code></Error>").into_response()
    }
}

/// Relay configuration pointed at the mock, with short timings.
pub fn relay_config(platform: &MockPlatform) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.server.bind_address = "127.0.0.1:0".to_string();
    config.shop.domain = Some("test-shop.myshopify.com".to_string());
    config.shop.access_token = Some(SecretString::new("shpat_test".to_string()));
    config.shop.graphql_endpoint = Some(platform.endpoint());
    config.upload.poll_interval_ms = 20;
    config.upload.poll_timeout_secs = 1;
    config.removal.admin_password = Some(SecretString::new(ADMIN_PASSWORD.to_string()));
    config.removal.inter_batch_delay_ms = 0;
    config
}

/// A running relay. Shuts down when dropped.
pub struct TestRelay {
    pub base: String,
    pub client: reqwest::Client,
    shutdown: broadcast::Sender<()>,
}

impl TestRelay {
    pub async fn start(config: RelayConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = broadcast::channel(1);
        let (_updates_tx, updates_rx) = mpsc::unbounded_channel();

        let server = RelayServer::new(config);
        tokio::spawn(async move {
            let _ = server.run(listener, updates_rx, rx).await;
        });

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            shutdown,
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, reqwest::header::HeaderMap, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(res.status().as_u16()).unwrap();
        let headers = res.headers().clone();
        let json = res.json::<Value>().await.unwrap_or(Value::Null);
        (status, headers, json)
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}
