use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::models::execution::{ExecutionId, StatusRecord};
use crate::services::registry::ExecutionRegistry;
use crate::services::workflow::{WorkflowClient, WorkflowError};

/// Send a prepared workflow request on a detached task.
///
/// The submission response has already gone out by the time this
/// finishes, so a failure is reported only through the registry as a
/// terminal error record. One attempt, no retry.
pub fn spawn(
    registry: Arc<ExecutionRegistry>,
    workflow: Arc<WorkflowClient>,
    execution_id: ExecutionId,
    request: reqwest::Request,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(execution_id = %execution_id, "Dispatching to workflow engine");
        let start = Instant::now();
        let outcome = workflow.send(request).await;
        metrics::histogram!("workflow_dispatch_seconds").record(start.elapsed().as_secs_f64());

        match outcome {
            Ok(status) => {
                metrics::counter!("workflow_dispatch_total", "outcome" => "delivered").increment(1);
                tracing::info!(
                    execution_id = %execution_id,
                    status = %status,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Workflow engine accepted execution"
                );
            }
            Err(e) => {
                let label = match &e {
                    WorkflowError::Timeout => "timeout",
                    _ => "failed",
                };
                metrics::counter!("workflow_dispatch_total", "outcome" => label).increment(1);
                tracing::error!(execution_id = %execution_id, error = %e, "Workflow dispatch failed");
                report_failure(&registry, &execution_id, &e);
            }
        }
    })
}

fn report_failure(registry: &ExecutionRegistry, execution_id: &ExecutionId, error: &WorkflowError) {
    let description = match error {
        WorkflowError::Timeout => "Zeitüberschreitung: Der Workflow hat nicht rechtzeitig geantwortet".to_string(),
        other => other.to_string(),
    };

    // The entry may already be gone (terminal notification or timeout).
    if registry
        .replace(execution_id, StatusRecord::failed(description))
        .is_err()
    {
        tracing::warn!(
            execution_id = %execution_id,
            "Execution already evicted, dropping dispatch failure"
        );
    }
}
