use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use garde::Validate;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::execution::{ExecutionId, StatusRecord};
use crate::models::notification::{NotificationRequest, NotificationResponse};
use crate::services::relay;

/// POST /api/webhook/updates and /api/webhook/n8n — Progress pushed by the
/// workflow engine.
///
/// Replaces the stored record of a known execution. Notifications for ids
/// this process never issued (or already evicted) are rejected with 404.
pub async fn receive_notification(
    State(state): State<AppState>,
    payload: Result<Json<NotificationRequest>, JsonRejection>,
) -> AppResult<Json<NotificationResponse>> {
    let Json(notification) = payload.map_err(|rejection| {
        metrics::counter!("notifications_rejected_total").increment(1);
        AppError::BadRequest(rejection.body_text())
    })?;

    let execution_id = notification.execution_id().ok_or_else(|| {
        metrics::counter!("notifications_rejected_total").increment(1);
        AppError::BadRequest("Missing executionId".to_string())
    })?;

    notification.validate().map_err(|report| {
        metrics::counter!("notifications_rejected_total").increment(1);
        AppError::BadRequest(format!("Invalid notification: {report}"))
    })?;

    let record = notification.into_record();
    let status = record.status;
    let progress = record.progress;

    if let Err(e) = state.registry.replace(&execution_id, record) {
        metrics::counter!("notifications_rejected_total").increment(1);
        tracing::warn!(execution_id = %execution_id, "Notification for unknown execution");
        return Err(e.into());
    }

    metrics::counter!("notifications_received_total").increment(1);
    tracing::info!(
        execution_id = %execution_id,
        status = %status,
        progress,
        "Notification applied"
    );

    Ok(Json(NotificationResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "executionId")]
    pub execution_id: Option<String>,
}

/// GET /api/webhook/updates?executionId=… — Live update stream.
///
/// One SSE `message` event per observed record, carrying the record as
/// JSON. The server closes the stream after a terminal record or when the
/// stream timeout elapses.
pub async fn stream_updates(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let execution_id = query
        .execution_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ExecutionId::from)
        .ok_or_else(|| AppError::BadRequest("Missing executionId".to_string()))?;

    tracing::info!(execution_id = %execution_id, "Update stream opened");
    let relay = relay::open(state.registry.clone(), execution_id, state.relay);

    Ok(Sse::new(record_events(relay.updates)).keep_alive(KeepAlive::default()))
}

fn record_events(
    updates: tokio::sync::mpsc::Receiver<StatusRecord>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    ReceiverStream::new(updates).filter_map(|record| async move {
        match Event::default().json_data(&record) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode status record");
                None
            }
        }
    })
}
