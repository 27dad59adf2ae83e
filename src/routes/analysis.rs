use axum::extract::{Multipart, State};
use axum::Json;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::criteria::{parse_criteria, Criterion};
use crate::models::execution::{ExecutionId, ExecutionStatus, StatusRecord};
use crate::models::submission::{SubmitResponse, UploadedFile};
use crate::services::dispatch;
use crate::services::workflow::DispatchJob;

/// Form fields of a submission, before validation.
#[derive(Default)]
struct SubmissionForm {
    file: Option<UploadedFile>,
    callback_url: Option<String>,
    criteria: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> AppResult<SubmissionForm> {
    let mut form = SubmissionForm::default();
    // An empty file part still counts towards the one-file limit.
    let mut file_seen = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if file_seen {
                    return Err(AppError::BadRequest(
                        "Exactly one file must be provided".to_string(),
                    ));
                }
                file_seen = true;
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file: {}", e.body_text()))
                })?;
                if !bytes.is_empty() {
                    form.file = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            "callbackUrl" | "criteria" => {
                let value = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read {name}: {}", e.body_text()))
                })?;
                if name == "criteria" {
                    form.criteria = Some(value);
                } else {
                    form.callback_url = Some(value).filter(|url| !url.trim().is_empty());
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unexpected form field");
            }
        }
    }

    Ok(form)
}

/// Register the execution, build the outbound request, and hand it to a
/// background task. Returns once the request is dispatched, not delivered.
fn start_execution(
    state: &AppState,
    initial: StatusRecord,
    file: UploadedFile,
    callback_url: String,
    criteria: Option<Vec<Criterion>>,
) -> AppResult<ExecutionId> {
    let execution_id = state.registry.register(initial);

    let job = DispatchJob {
        execution_id: execution_id.clone(),
        file,
        callback_url,
        criteria,
    };

    let request = match state.workflow.prepare(&job) {
        Ok(request) => request,
        Err(e) => {
            state.registry.evict(&execution_id);
            return Err(e.into());
        }
    };

    dispatch::spawn(
        state.registry.clone(),
        state.workflow.clone(),
        execution_id.clone(),
        request,
    );

    metrics::counter!("executions_submitted_total").increment(1);
    tracing::info!(
        execution_id = %execution_id,
        file_name = %job.file.file_name,
        size_bytes = job.file.bytes.len(),
        criteria = job.criteria.as_ref().map_or(0, Vec::len),
        "Execution submitted"
    );

    Ok(execution_id)
}

/// POST /api/analysis/callback — Upload a contract; the engine reports
/// progress to `callbackUrl` (or the configured default).
pub async fn submit_with_callback(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<SubmitResponse>> {
    let form = read_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let callback_url = form
        .callback_url
        .unwrap_or_else(|| state.callback_url.to_string());

    let initial = StatusRecord::new(
        "Datei wird hochgeladen...",
        "Übertragung zum Workflow läuft",
        10,
        ExecutionStatus::Uploading,
    );

    let execution_id = start_execution(&state, initial, file, callback_url, None)?;
    Ok(Json(SubmitResponse::accepted(execution_id)))
}

/// POST /api/contracts/analyze — Upload a contract together with the
/// criteria it should be checked against.
pub async fn submit_with_criteria(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<SubmitResponse>> {
    let form = read_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let criteria = parse_criteria(form.criteria.as_deref().unwrap_or_default())?;
    let callback_url = form
        .callback_url
        .unwrap_or_else(|| state.callback_url.to_string());

    let initial = StatusRecord::new(
        "Analyse wird gestartet",
        format!(
            "Vertrag und {} Kriterien werden übermittelt",
            criteria.len()
        ),
        0,
        ExecutionStatus::Submitted,
    );

    let execution_id = start_execution(&state, initial, file, callback_url, Some(criteria))?;
    Ok(Json(SubmitResponse::accepted(execution_id)))
}
