use super::file_manager_handler::{handle_file_manager, InvocationRequest};
use crate::agents::testing::ScriptedService;
use crate::config::Settings;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn state() -> AppState {
    let settings = Settings::from_toml(
        r#"
        [agent]
        endpoint = "https://res.services.ai.azure.com/api/projects/p"

        [queues]
        service_endpoint = "https://acct.queue.core.windows.net"
        "#,
    )
    .unwrap();
    AppState::new(settings, Arc::new(ScriptedService::new())).unwrap()
}

fn invocation(msg: Value) -> InvocationRequest {
    InvocationRequest {
        data: HashMap::from([("msg".to_string(), msg)]),
        metadata: HashMap::from([("DequeueCount".to_string(), json!(1))]),
    }
}

fn output_message(outputs: &HashMap<String, Value>) -> Value {
    let text = outputs["outputQueueItem"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_string_payload_is_dispatched() {
    let msg = json!({
        "fileName": "notes.txt",
        "command": "create",
        "mode": "live",
        "CorrelationId": "corr-1"
    })
    .to_string();

    let (status, Json(response)) =
        handle_file_manager(State(state()), Json(invocation(Value::String(msg)))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        output_message(&response.outputs),
        json!({ "Value": "Created file notes.txt", "CorrelationId": "corr-1" })
    );
    assert!(response.return_value.is_none());
    assert_eq!(response.logs.len(), 1);
}

#[tokio::test]
async fn test_object_payload_is_dispatched() {
    let msg = json!({
        "fileName": "notes.txt",
        "command": "delete",
        "mode": "dry_run",
        "CorrelationId": "corr-2"
    });

    let (status, Json(response)) = handle_file_manager(State(state()), Json(invocation(msg))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        output_message(&response.outputs)["Value"],
        "Simulated file operation for notes.txt"
    );
}

#[tokio::test]
async fn test_missing_correlation_id_fails_invocation() {
    let msg = json!({ "fileName": "notes.txt", "command": "create", "mode": "live" });

    let (status, Json(response)) = handle_file_manager(State(state()), Json(invocation(msg))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.outputs.is_empty());
    assert!(response.logs[0].contains("CorrelationId"));
}

#[tokio::test]
async fn test_missing_trigger_binding_fails_invocation() {
    let request = InvocationRequest::default();

    let (status, Json(response)) = handle_file_manager(State(state()), Json(request)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.logs, vec!["Invocation has no 'msg' binding".to_string()]);
}
