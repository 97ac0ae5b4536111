//! REST client for the Azure AI Foundry agent service

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::agents::domain::{
    Agent, AgentDefinition, AgentService, DeletionStatus, Message, MessagePage, NewMessage, NewRun,
    Run, Thread,
};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::identity::{resolve_credential, TokenCredential, AGENT_SERVICE_SCOPE};
use crate::config::AgentServiceSettings;

const PAGE_SIZE: u32 = 100;

/// Client bound to one project endpoint
pub struct FoundryAgentClient {
    http: reqwest::Client,
    endpoint: String,
    api_version: String,
    credential: Arc<dyn TokenCredential>,
}

impl FoundryAgentClient {
    /// Create a client for `endpoint`
    ///
    /// `endpoint` is the project endpoint, e.g.
    /// `https://my-resource.services.ai.azure.com/api/projects/my-project`.
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            credential,
        }
    }

    /// Client for the configured project, authenticating per the configured
    /// managed identity (or the default chain when there is none)
    pub fn from_settings(settings: &AgentServiceSettings) -> AgentResult<Self> {
        let http = Self::http_client(settings.request_timeout())?;
        let credential =
            resolve_credential(settings.managed_identity_client_id.as_deref(), http.clone());
        Ok(Self::new(
            http,
            settings.endpoint.as_str(),
            settings.api_version.as_str(),
            credential,
        ))
    }

    /// HTTP client with the request timeout every call to the service uses
    pub fn http_client(request_timeout: Duration) -> AgentResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(AgentError::from)
    }

    async fn request(&self, method: Method, path: &str) -> AgentResult<RequestBuilder> {
        let token = self.credential.get_token(AGENT_SERVICE_SCOPE).await?;
        let url = format!("{}{}", self.endpoint, path);
        debug!(%method, %url, "Agent service request");
        Ok(self
            .http
            .request(method, url)
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(token.secret.expose_secret()))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AgentResult<T> {
        let response = request.send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map non-success responses to `AgentError::Api`, keeping the service's
/// own error message when it sends one
async fn check_status(response: Response) -> AgentResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => match (envelope.error.code, envelope.error.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) => body,
        },
        Err(_) => body,
    };

    Err(AgentError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AgentService for FoundryAgentClient {
    async fn create_agent(&self, definition: &AgentDefinition) -> AgentResult<Agent> {
        let request = self.request(Method::POST, "/assistants").await?.json(definition);
        self.send_json(request).await
    }

    async fn get_agent(&self, agent_id: &str) -> AgentResult<Agent> {
        let request = self
            .request(Method::GET, &format!("/assistants/{}", agent_id))
            .await?;
        self.send_json(request).await
    }

    async fn delete_agent(&self, agent_id: &str) -> AgentResult<()> {
        let request = self
            .request(Method::DELETE, &format!("/assistants/{}", agent_id))
            .await?;
        let status: DeletionStatus = self.send_json(request).await?;
        if status.deleted {
            Ok(())
        } else {
            Err(AgentError::Api {
                status: 200,
                message: format!("Agent {} was not deleted", status.id),
            })
        }
    }

    async fn create_thread(&self) -> AgentResult<Thread> {
        let request = self.request(Method::POST, "/threads").await?.json(&json!({}));
        self.send_json(request).await
    }

    async fn create_message(&self, thread_id: &str, message: &NewMessage) -> AgentResult<Message> {
        let request = self
            .request(Method::POST, &format!("/threads/{}/messages", thread_id))
            .await?
            .json(message);
        self.send_json(request).await
    }

    async fn list_messages(&self, thread_id: &str) -> AgentResult<Vec<Message>> {
        let path = format!("/threads/{}/messages", thread_id);
        let limit = PAGE_SIZE.to_string();
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::GET, &path)
                .await?
                .query(&[("order", "desc"), ("limit", limit.as_str())]);
            if let Some(cursor) = &after {
                request = request.query(&[("after", cursor.as_str())]);
            }

            let page: MessagePage = self.send_json(request).await?;
            messages.extend(page.data);

            match (page.has_more, page.last_id) {
                (true, Some(last_id)) => after = Some(last_id),
                _ => break,
            }
        }

        Ok(messages)
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> AgentResult<Run> {
        let body = NewRun {
            assistant_id: agent_id.to_string(),
        };
        let request = self
            .request(Method::POST, &format!("/threads/{}/runs", thread_id))
            .await?
            .json(&body);
        self.send_json(request).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> AgentResult<Run> {
        let request = self
            .request(Method::GET, &format!("/threads/{}/runs/{}", thread_id, run_id))
            .await?;
        self.send_json(request).await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> AgentResult<Run> {
        let request = self
            .request(
                Method::POST,
                &format!("/threads/{}/runs/{}/cancel", thread_id, run_id),
            )
            .await?;
        self.send_json(request).await
    }
}
