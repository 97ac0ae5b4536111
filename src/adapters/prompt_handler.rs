use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::agents::error::AgentError;
use crate::agents::session::Conversation;
use crate::AppState;

const FUNCTION: &str = "prompt";

/// Body of the HTTP-triggered prompt function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(rename = "Prompt")]
    pub prompt: String,
}

#[derive(Debug)]
pub struct PromptError(AgentError);

impl IntoResponse for PromptError {
    fn into_response(self) -> Response {
        let status = if self.0.is_run_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, format!("Agent request failed: {}", self.0)).into_response()
    }
}

/// `POST /api/prompt`: one throwaway agent per request
pub async fn handle_prompt(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<String, PromptError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("prompt", %request_id);

    async move {
        info!(prompt_len = request.prompt.len(), "Prompt received");
        let metrics = &state.metrics;
        let in_flight = metrics.track_in_flight();
        let started = Instant::now();

        let result = run_prompt(&state, &request.prompt).await;

        drop(in_flight);
        metrics
            .invocation_duration
            .with_label_values(&[FUNCTION])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(conversation) => {
                metrics
                    .invocations_total
                    .with_label_values(&[FUNCTION, "200"])
                    .inc();
                Ok(conversation.reply_text().to_string())
            }
            Err(e) => {
                error!(error = %e, "Prompt failed");
                let error = PromptError(e);
                let status = if error.0.is_run_timeout() { "504" } else { "500" };
                metrics
                    .invocations_total
                    .with_label_values(&[FUNCTION, status])
                    .inc();
                Err(error)
            }
        }
    }
    .instrument(span)
    .await
}

async fn run_prompt(state: &AppState, prompt: &str) -> Result<Conversation, AgentError> {
    let session = state.sessions.create_session().await?;
    let result = session.converse(prompt).await;

    if !session.close().await {
        state.metrics.agent_cleanup_failures.inc();
    }

    let conversation = result?;
    state
        .metrics
        .runs_total
        .with_label_values(&[conversation.run.status.as_str()])
        .inc();
    state.metrics.run_polls.observe(f64::from(conversation.polls));
    Ok(conversation)
}
