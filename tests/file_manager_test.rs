mod common;

use axum::body::Body;
use axum::http::StatusCode;
use courier::agents::testing::ScriptedService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

use common::{app, app_with, body_text, post_json, settings};

fn envelope(msg: Value) -> Value {
    json!({
        "Data": { "msg": msg },
        "Metadata": { "DequeueCount": 1, "Id": "d3a1" }
    })
}

async fn result_message(response: axum::http::Response<Body>) -> Value {
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["ReturnValue"].is_null());
    serde_json::from_str(body["Outputs"]["outputQueueItem"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_delete_command_round_trip() {
    let msg = json!({
        "fileName": "budget.xlsx",
        "command": "delete",
        "mode": "live",
        "CorrelationId": "call_abc"
    })
    .to_string();

    let response = app(Arc::new(ScriptedService::new()))
        .oneshot(post_json("/FileManager", envelope(Value::String(msg))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        result_message(response).await,
        json!({ "Value": "Deleted file budget.xlsx", "CorrelationId": "call_abc" })
    );
}

#[tokio::test]
async fn test_dry_run_wins_over_delete() {
    let msg = json!({
        "fileName": "*",
        "command": "delete",
        "mode": "dry_run",
        "CorrelationId": "call_dry"
    });

    let response = app(Arc::new(ScriptedService::new()))
        .oneshot(post_json("/FileManager", envelope(msg)))
        .await
        .unwrap();

    let result = result_message(response).await;
    assert_eq!(result["Value"], "Simulated file operation for *");
    assert_eq!(result["CorrelationId"], "call_dry");
}

#[tokio::test]
async fn test_malformed_message_fails_invocation() {
    let response = app(Arc::new(ScriptedService::new()))
        .oneshot(post_json("/FileManager", envelope(Value::String("{not json".to_string()))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["Logs"][0].as_str().unwrap().starts_with("Malformed command message"));
}

#[tokio::test]
async fn test_queue_route_skips_function_keys() {
    let settings = settings("[auth]\nenabled = true\nfunction_keys = [\"k\"]\n");
    let msg = json!({
        "fileName": "a.txt",
        "command": "create",
        "mode": "live",
        "CorrelationId": "c1"
    });

    let response = app_with(settings, Arc::new(ScriptedService::new()))
        .oneshot(post_json("/FileManager", envelope(msg)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
