use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Settings;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub agent_endpoint: String,
    pub queue_endpoint: String,
}

pub struct HealthHandler {
    settings: Arc<Settings>,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            start_time: std::time::Instant::now(),
        }
    }

    fn checks(&self) -> HealthChecks {
        let state = |value: &str| {
            if value.is_empty() { "missing" } else { "ok" }.to_string()
        };
        HealthChecks {
            agent_endpoint: state(&self.settings.agent.endpoint),
            queue_endpoint: state(&self.settings.queues.service_endpoint),
        }
    }

    /// Basic health check - returns 200 if server is running
    pub async fn health(&self) -> impl IntoResponse {
        let status = HealthStatus {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            checks: self.checks(),
        };

        (StatusCode::OK, Json(status))
    }

    /// Readiness check - both endpoints the function app depends on are configured
    pub async fn ready(&self) -> impl IntoResponse {
        let checks = self.checks();
        if checks.agent_endpoint == "ok" && checks.queue_endpoint == "ok" {
            (StatusCode::OK, Json(serde_json::json!({
                "status": "ready",
                "message": "Server is ready to accept invocations"
            })))
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({
                "status": "not_ready",
                "checks": checks
            })))
        }
    }

    pub async fn live(&self) -> impl IntoResponse {
        (StatusCode::OK, Json(serde_json::json!({
            "status": "alive",
            "message": "Server is alive"
        })))
    }
}
