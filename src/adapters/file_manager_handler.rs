//! Custom handler endpoint for the queue-triggered `FileManager` function.
//!
//! The Functions host owns the queues. It posts each dequeued message inside
//! an invocation envelope and writes whatever lands in `Outputs` to the
//! output binding. A non-2xx answer fails the invocation, which leaves retry
//! and poison handling to the host.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{error, info};

use crate::files::{dispatch, DispatchError, FileCommand};
use crate::AppState;

const FUNCTION: &str = "FileManager";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationRequest {
    #[serde(rename = "Data", default)]
    pub data: HashMap<String, Value>,
    #[serde(rename = "Metadata", default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "Outputs")]
    pub outputs: HashMap<String, Value>,
    #[serde(rename = "Logs")]
    pub logs: Vec<String>,
    #[serde(rename = "ReturnValue")]
    pub return_value: Option<Value>,
}

impl InvocationResponse {
    fn failed(reason: String) -> Self {
        Self {
            logs: vec![reason],
            ..Self::default()
        }
    }
}

pub async fn handle_file_manager(
    State(state): State<AppState>,
    Json(invocation): Json<InvocationRequest>,
) -> (StatusCode, Json<InvocationResponse>) {
    let functions = &state.settings.functions;

    if let Some(dequeue_count) = invocation.metadata.get("DequeueCount") {
        info!(%dequeue_count, "Queue item received");
    }

    match process(&invocation, &functions.queue_trigger_binding) {
        Ok((outcome, result_json, log_line)) => {
            state
                .metrics
                .file_commands_total
                .with_label_values(&[outcome])
                .inc();
            state
                .metrics
                .invocations_total
                .with_label_values(&[FUNCTION, "200"])
                .inc();

            let mut outputs = HashMap::new();
            outputs.insert(
                functions.queue_output_binding.clone(),
                Value::String(result_json),
            );
            (
                StatusCode::OK,
                Json(InvocationResponse {
                    outputs,
                    logs: vec![log_line],
                    return_value: None,
                }),
            )
        }
        Err(e) => {
            error!(error = %e, "File command rejected");
            state
                .metrics
                .file_commands_total
                .with_label_values(&["malformed"])
                .inc();
            state
                .metrics
                .invocations_total
                .with_label_values(&[FUNCTION, "500"])
                .inc();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(InvocationResponse::failed(e.to_string())),
            )
        }
    }
}

fn process(
    invocation: &InvocationRequest,
    trigger_binding: &str,
) -> Result<(&'static str, String, String), DispatchError> {
    let payload = invocation
        .data
        .get(trigger_binding)
        .ok_or_else(|| DispatchError::MissingBinding(trigger_binding.to_string()))?;

    let command = FileCommand::from_payload(payload)?;
    let outcome = command.outcome().as_str();

    let result = dispatch(command);
    let log_line = format!("{} (CorrelationId {})", result.value, result.correlation_id);
    Ok((outcome, serde_json::to_string(&result)?, log_line))
}
