#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use courier::agents::testing::ScriptedService;
use courier::config::Settings;
use courier::AppState;
use http_body_util::BodyExt;
use std::sync::Arc;

pub const BASE_TOML: &str = r#"
[agent]
endpoint = "https://res.services.ai.azure.com/api/projects/p"

[queues]
service_endpoint = "https://acct.queue.core.windows.net"

[polling]
initial_interval_ms = 1
max_interval_ms = 1
max_wait_secs = 5
"#;

pub fn settings(extra: &str) -> Settings {
    Settings::from_toml(&format!("{}\n{}", BASE_TOML, extra)).unwrap()
}

pub fn app(service: Arc<ScriptedService>) -> axum::Router {
    app_with(settings(""), service)
}

pub fn app_with(settings: Settings, service: Arc<ScriptedService>) -> axum::Router {
    courier::create_app(AppState::new(settings, service).unwrap())
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
