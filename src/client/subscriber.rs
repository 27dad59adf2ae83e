use futures::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::sse::SseDecoder;
use crate::client::ClientError;
use crate::models::execution::{ExecutionId, ExecutionStatus, StatusRecord};

/// Lifecycle of a subscription as seen by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionPhase {
    Idle,
    Listening,
    /// A terminal record (`completed` or `error`) arrived; the connection
    /// is closed.
    Complete,
    /// The stream ended without a terminal record: the server hit its
    /// safety timeout, or the subscription was closed locally.
    Interrupted,
    /// The connection failed. There is no automatic reconnect.
    Failed { message: String },
}

/// UI-facing state of the current subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateState {
    pub execution_id: Option<ExecutionId>,
    pub title: String,
    pub description: String,
    pub progress: u8,
    pub status: Option<ExecutionStatus>,
    pub results: Option<Vec<serde_json::Value>>,
    pub phase: SubscriptionPhase,
}

impl Default for UpdateState {
    fn default() -> Self {
        Self {
            execution_id: None,
            title: "Starting...".to_string(),
            description: "Initializing connection to the workflow. Please wait...".to_string(),
            progress: 0,
            status: None,
            results: None,
            phase: SubscriptionPhase::Idle,
        }
    }
}

impl UpdateState {
    fn listening(execution_id: ExecutionId) -> Self {
        Self {
            execution_id: Some(execution_id),
            phase: SubscriptionPhase::Listening,
            ..Self::default()
        }
    }

    /// Fold one received record into the state. Repeated identical records
    /// leave the state unchanged.
    pub fn apply(&mut self, record: StatusRecord) {
        self.title = record.title;
        self.description = record.description;
        self.progress = record.progress;
        self.status = Some(record.status);
        if record.results.is_some() {
            self.results = record.results;
        }
        if record.status.is_terminal() {
            self.phase = SubscriptionPhase::Complete;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == SubscriptionPhase::Complete
    }
}

struct ActiveSubscription {
    execution_id: ExecutionId,
    task: JoinHandle<()>,
}

/// Follows the live update stream of one execution at a time.
///
/// Dropping the subscriber closes its connection. Closing or cancelling a
/// subscription never affects the job on the workflow engine.
pub struct ExecutionSubscriber {
    http: reqwest::Client,
    base_url: String,
    state: watch::Sender<UpdateState>,
    active: Option<ActiveSubscription>,
}

impl ExecutionSubscriber {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// `http` must not carry a request timeout; streams stay open for as
    /// long as the job runs.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(UpdateState::default());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state,
            active: None,
        }
    }

    pub fn updates(&self) -> watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> UpdateState {
        self.state.borrow().clone()
    }

    /// Start following `execution_id`.
    ///
    /// Following the id that is already being followed is a no-op; any
    /// other open subscription is closed first.
    pub fn listen(&mut self, execution_id: ExecutionId) {
        if let Some(active) = &self.active {
            if active.execution_id == execution_id && !active.task.is_finished() {
                return;
            }
        }
        self.close();

        self.state
            .send_replace(UpdateState::listening(execution_id.clone()));
        let url = format!("{}/api/webhook/updates", self.base_url);
        let task = tokio::spawn(follow(
            self.http.clone(),
            url,
            execution_id.clone(),
            self.state.clone(),
        ));

        self.active = Some(ActiveSubscription { execution_id, task });
    }

    /// Close the connection and keep the last received state. A
    /// subscription closed before it completed is marked `Interrupted`.
    pub fn close(&mut self) {
        if let Some(active) = self.active.take() {
            if !active.task.is_finished() {
                active.task.abort();
                self.state.send_if_modified(|s| {
                    if s.phase == SubscriptionPhase::Listening {
                        s.phase = SubscriptionPhase::Interrupted;
                        true
                    } else {
                        false
                    }
                });
            }
            tracing::debug!(execution_id = %active.execution_id, "Subscription closed");
        }
    }

    /// Stop listening and reset the state. Local only: the job keeps
    /// running on the workflow engine.
    pub fn cancel(&mut self) {
        self.close();
        self.state.send_replace(UpdateState::default());
    }
}

impl Drop for ExecutionSubscriber {
    fn drop(&mut self) {
        self.close();
    }
}

async fn follow(
    http: reqwest::Client,
    url: String,
    execution_id: ExecutionId,
    state: watch::Sender<UpdateState>,
) {
    match stream_until_terminal(&http, &url, &execution_id, &state).await {
        Ok(true) => {
            tracing::debug!(execution_id = %execution_id, "Execution reached terminal status");
        }
        Ok(false) => {
            tracing::warn!(execution_id = %execution_id, "Stream ended before a terminal status");
            state.send_modify(|s| s.phase = SubscriptionPhase::Interrupted);
        }
        Err(e) => {
            tracing::warn!(execution_id = %execution_id, error = %e, "Update stream failed");
            state.send_modify(|s| {
                s.phase = SubscriptionPhase::Failed {
                    message: e.to_string(),
                }
            });
        }
    }
}

/// Returns `Ok(true)` once a terminal record has been applied. Returning
/// drops the response body, which closes the connection.
async fn stream_until_terminal(
    http: &reqwest::Client,
    url: &str,
    execution_id: &ExecutionId,
    state: &watch::Sender<UpdateState>,
) -> Result<bool, ClientError> {
    let response = http
        .get(url)
        .query(&[("executionId", execution_id.as_str())])
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?;
    let response = ClientError::check(response).await?;

    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = body.next().await {
        for event in decoder.push(&chunk?) {
            let record: StatusRecord = serde_json::from_str(&event.data)?;
            let terminal = record.status.is_terminal();
            state.send_modify(|s| s.apply(record));
            if terminal {
                return Ok(true);
            }
        }
    }

    Ok(false)
}
