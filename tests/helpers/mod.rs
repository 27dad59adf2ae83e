//! Test helper utilities for the relay integration tests
//!
//! Every test gets its own server on an ephemeral port and, where needed,
//! its own mock workflow engine.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use contract_analyzer::app_state::AppState;
use contract_analyzer::client::sse::SseDecoder;
use contract_analyzer::config::AppConfig;
use contract_analyzer::models::execution::StatusRecord;
use contract_analyzer::models::submission::SubmitResponse;
use contract_analyzer::routes;
use contract_analyzer::services::registry::ExecutionRegistry;
use contract_analyzer::services::workflow::WorkflowClient;
use futures::{Stream, StreamExt};
use reqwest::multipart;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::fixtures::{SAMPLE_FILE_NAME, SAMPLE_PDF, SINGLE_CRITERION};

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

pub const FILE: Option<(&str, &[u8])> = Some((SAMPLE_FILE_NAME, SAMPLE_PDF));

/// A running server plus direct access to its registry.
pub struct TestApp {
    pub base_url: String,
    pub registry: Arc<ExecutionRegistry>,
    pub http: reqwest::Client,
}

pub fn test_config(workflow_url: &str) -> AppConfig {
    AppConfig {
        workflow_url: workflow_url.to_string(),
        callback_url: "http://frontend.test/api/webhook/updates".to_string(),
        dispatch_timeout_secs: 2,
        poll_interval_ms: 20,
        stream_timeout_secs: 10,
        ..AppConfig::default()
    }
}

/// Serve the real router on 127.0.0.1 with a random port.
pub async fn spawn_app(config: AppConfig) -> TestApp {
    let registry = Arc::new(ExecutionRegistry::new());
    let workflow = WorkflowClient::new(&config.workflow_url, config.dispatch_timeout())
        .expect("Failed to build workflow client");
    let state = AppState::new(&config, registry.clone(), workflow);
    let app = routes::router(state, config.max_upload_bytes);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    TestApp {
        base_url: format!("http://{addr}"),
        registry,
        http: reqwest::Client::new(),
    }
}

/// One request as seen by the mock workflow engine.
#[derive(Debug, Clone)]
pub struct ReceivedDispatch {
    pub fields: HashMap<String, String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_bytes: Bytes,
}

/// Stand-in for the workflow engine webhook. Answers every upload with
/// `status` and forwards what it received.
pub struct MockEngine {
    pub url: String,
    pub received: mpsc::UnboundedReceiver<ReceivedDispatch>,
}

impl MockEngine {
    pub async fn next_dispatch(&mut self) -> ReceivedDispatch {
        timeout(WAIT, self.received.recv())
            .await
            .expect("Engine received nothing")
            .expect("Engine channel closed")
    }
}

#[derive(Clone)]
struct EngineState {
    status: StatusCode,
    delay: Duration,
    received: mpsc::UnboundedSender<ReceivedDispatch>,
}

pub async fn spawn_engine(status: StatusCode) -> MockEngine {
    spawn_slow_engine(status, Duration::ZERO).await
}

/// Engine that reads the whole upload, then waits `delay` before answering.
pub async fn spawn_slow_engine(status: StatusCode, delay: Duration) -> MockEngine {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/webhook/upload-pdf", post(engine_upload))
        .with_state(EngineState {
            status,
            delay,
            received: tx,
        });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind engine listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock engine failed");
    });

    MockEngine {
        url: format!("http://{addr}/webhook/upload-pdf"),
        received: rx,
    }
}

async fn engine_upload(State(state): State<EngineState>, mut multipart: Multipart) -> StatusCode {
    let mut dispatch = ReceivedDispatch {
        fields: HashMap::new(),
        file_name: None,
        file_type: None,
        file_bytes: Bytes::new(),
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            dispatch.file_name = field.file_name().map(str::to_string);
            dispatch.file_type = field.content_type().map(str::to_string);
            dispatch.file_bytes = field.bytes().await.unwrap_or_default();
        } else {
            let value = field.text().await.unwrap_or_default();
            dispatch.fields.insert(name, value);
        }
    }

    let _ = state.received.send(dispatch);
    tokio::time::sleep(state.delay).await;
    state.status
}

/// URL of a port nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind placeholder listener");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{addr}/webhook/upload-pdf")
}

fn pdf_part(file_name: &str, content: &[u8]) -> multipart::Part {
    multipart::Part::bytes(content.to_vec())
        .file_name(file_name.to_string())
        .mime_str("application/pdf")
        .expect("Valid mime type")
}

/// POST /api/contracts/analyze
pub async fn upload_with_criteria(
    app: &TestApp,
    file: Option<(&str, &[u8])>,
    criteria: Option<&str>,
) -> reqwest::Response {
    let mut form = multipart::Form::new();
    if let Some((name, content)) = file {
        form = form.part("file", pdf_part(name, content));
    }
    if let Some(criteria) = criteria {
        form = form.text("criteria", criteria.to_string());
    }
    app.http
        .post(format!("{}/api/contracts/analyze", app.base_url))
        .multipart(form)
        .send()
        .await
        .expect("Upload request failed")
}

/// POST /api/analysis/callback
pub async fn upload_for_callback(
    app: &TestApp,
    file: Option<(&str, &[u8])>,
    callback_url: Option<&str>,
) -> reqwest::Response {
    let mut form = multipart::Form::new();
    if let Some((name, content)) = file {
        form = form.part("file", pdf_part(name, content));
    }
    if let Some(url) = callback_url {
        form = form.text("callbackUrl", url.to_string());
    }
    app.http
        .post(format!("{}/api/analysis/callback", app.base_url))
        .multipart(form)
        .send()
        .await
        .expect("Upload request failed")
}

pub async fn submit_response(response: reqwest::Response) -> (reqwest::StatusCode, SubmitResponse) {
    let status = response.status();
    let body = response
        .json::<SubmitResponse>()
        .await
        .expect("Submission response was not JSON");
    (status, body)
}

/// Submit the sample contract with one criterion and return its id.
pub async fn submit_contract(app: &TestApp) -> String {
    let (status, body) =
        submit_response(upload_with_criteria(app, FILE, Some(SINGLE_CRITERION)).await).await;
    assert_eq!(status, reqwest::StatusCode::OK, "submission failed: {:?}", body.error);
    body.execution_id.expect("No executionId").to_string()
}

/// POST a notification to `path` (either webhook alias).
pub async fn notify(app: &TestApp, path: &str, body: serde_json::Value) -> reqwest::Response {
    app.http
        .post(format!("{}{}", app.base_url, path))
        .json(&body)
        .send()
        .await
        .expect("Notification request failed")
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Reader for GET /api/webhook/updates.
pub struct UpdateStream {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<StatusRecord>,
}

impl UpdateStream {
    pub async fn open(app: &TestApp, execution_id: &str) -> Self {
        let response = app
            .http
            .get(format!("{}/api/webhook/updates", app.base_url))
            .query(&[("executionId", execution_id)])
            .send()
            .await
            .expect("Stream request failed");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(
            content_type.starts_with("text/event-stream"),
            "unexpected content type {content_type}"
        );
        assert_eq!(
            response
                .headers()
                .get(reqwest::header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-cache")
        );

        Self {
            body: Box::pin(response.bytes_stream()),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    /// Next record, or `None` once the server closed the stream.
    pub async fn next_record(&mut self) -> Option<StatusRecord> {
        timeout(WAIT, self.read_record())
            .await
            .expect("Timed out waiting for a stream event")
    }

    async fn read_record(&mut self) -> Option<StatusRecord> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(record);
            }
            let chunk = self.body.next().await?.expect("Stream body failed");
            for event in self.decoder.push(&chunk) {
                let record = serde_json::from_str(&event.data).expect("Event was not a record");
                self.pending.push_back(record);
            }
        }
    }

    /// Assert the server ends the stream without sending another record.
    pub async fn expect_closed(&mut self) {
        if let Some(record) = self.next_record().await {
            panic!("expected end of stream, got {record:?}");
        }
    }
}

/// Poll until the registry no longer knows `id`.
pub async fn wait_until_evicted(app: &TestApp, id: &str) {
    let id = id.into();
    timeout(WAIT, async {
        while app.registry.get(&id).is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Execution was never evicted");
}
