//! # Courier
//!
//! Azure Functions custom handler that puts a Foundry agent behind an HTTP
//! trigger and serves the agent's file tool from a queue trigger.
//!
//! - `POST /api/prompt` creates a throwaway agent and thread, runs the
//!   prompt, and answers with the agent's last text reply.
//! - `POST /FileManager` receives queue invocations from the Functions host
//!   and answers each file command on the output binding.
//!
//! ## Architecture
//!
//! - **agents**: agent service port, REST client, credentials, run polling
//! - **files**: file command messages and the dispatcher
//! - **adapters**: axum handlers, auth, health and metrics
//! - **config**: settings, validation

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod domain;
pub mod files;
pub mod logging;

use crate::adapters::auth_middleware::{auth_middleware, AuthMiddleware, SharedAuthMiddleware};
use crate::adapters::file_manager_handler::handle_file_manager;
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::metrics_handler::{MetricsCollector, MetricsHandler};
use crate::adapters::prompt_handler::handle_prompt;
use crate::agents::domain::AgentService;
use crate::agents::session::SessionManager;
use crate::config::Settings;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<SessionManager>,
    pub metrics: Arc<MetricsCollector>,
}

impl AppState {
    pub fn new(settings: Settings, service: Arc<dyn AgentService>) -> anyhow::Result<Self> {
        let sessions = SessionManager::new(service, &settings);
        Ok(Self {
            settings: Arc::new(settings),
            sessions: Arc::new(sessions),
            metrics: Arc::new(MetricsCollector::new()?),
        })
    }
}

/// Creates the Axum application router with all endpoints configured.
pub fn create_app(state: AppState) -> Router {
    let health_handler = Arc::new(HealthHandler::new(state.settings.clone()));
    let metrics_handler = Arc::new(MetricsHandler::new(state.metrics.clone()));

    // Public routes (no authentication required)
    let public_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }));

    // Invoked by the Functions host, which has already applied its own auth
    let host_router = Router::new()
        .route(&state.settings.file_manager_path(), post(handle_file_manager))
        .with_state(state.clone());

    let mut protected_router = Router::new()
        .route("/metrics", get({
            let handler = metrics_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.metrics().await }
            }
        }))
        .route(&state.settings.prompt_path(), post(handle_prompt))
        .with_state(state.clone());

    if state.settings.auth.enabled {
        let auth: SharedAuthMiddleware =
            Arc::new(AuthMiddleware::new(Arc::new(state.settings.auth.clone())));
        protected_router =
            protected_router.layer(axum::middleware::from_fn_with_state(auth, auth_middleware));
    }

    public_router
        .merge(host_router)
        .merge(protected_router)
        .layer(TraceLayer::new_for_http())
}
