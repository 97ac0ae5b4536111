use thiserror::Error;

use crate::config::{AgentServiceSettings, PollSettings, QueueSettings, ServerSettings, Settings};
use crate::domain::auth::AuthConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        errors.extend(Self::validate_server(&settings.server));
        errors.extend(Self::validate_agent(&settings.agent));
        errors.extend(Self::validate_queues(&settings.queues));
        errors.extend(Self::validate_polling(&settings.polling));
        errors.extend(Self::validate_auth(&settings.auth));

        if settings.functions.prompt_route.trim_matches('/').is_empty() {
            errors.push(ValidationError::MissingField("functions.prompt_route".to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Only what a client of the agent service needs: endpoint and polling
    pub fn validate_agent_client(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Self::validate_agent(&settings.agent);
        errors.extend(Self::validate_polling(&settings.polling));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        errors
    }

    fn validate_agent(agent: &AgentServiceSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if agent.endpoint.is_empty() {
            errors.push(ValidationError::MissingField(
                "agent.endpoint (PROJECT_ENDPOINT)".to_string(),
            ));
        } else if !is_http_url(&agent.endpoint) {
            errors.push(ValidationError::InvalidValue {
                field: "agent.endpoint".to_string(),
                reason: format!("'{}' is not an http(s) URL", agent.endpoint),
            });
        }

        if agent.model.is_empty() {
            errors.push(ValidationError::MissingField("agent.model".to_string()));
        }

        if agent.request_timeout_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "agent.request_timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        errors
    }

    fn validate_queues(queues: &QueueSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if queues.service_endpoint.is_empty() {
            errors.push(ValidationError::MissingField(
                "queues.service_endpoint (STORAGE_CONNECTION__queueServiceUri)".to_string(),
            ));
        }

        if queues.input_queue.is_empty() {
            errors.push(ValidationError::MissingField("queues.input_queue".to_string()));
        }

        if queues.output_queue.is_empty() {
            errors.push(ValidationError::MissingField("queues.output_queue".to_string()));
        }

        if !queues.input_queue.is_empty() && queues.input_queue == queues.output_queue {
            errors.push(ValidationError::InvalidValue {
                field: "queues.output_queue".to_string(),
                reason: "Input and output queues must differ".to_string(),
            });
        }

        errors
    }

    fn validate_polling(polling: &PollSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if polling.initial_interval_ms == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "polling.initial_interval_ms".to_string(),
                reason: "Interval must be greater than 0".to_string(),
            });
        }

        if polling.max_interval_ms < polling.initial_interval_ms {
            errors.push(ValidationError::InvalidValue {
                field: "polling.max_interval_ms".to_string(),
                reason: "Must be at least polling.initial_interval_ms".to_string(),
            });
        }

        if !(polling.multiplier >= 1.0) {
            errors.push(ValidationError::InvalidValue {
                field: "polling.multiplier".to_string(),
                reason: "Multiplier must be 1.0 or greater".to_string(),
            });
        }

        if polling.max_wait_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "polling.max_wait_secs".to_string(),
                reason: "A run needs a non-zero wait budget".to_string(),
            });
        }

        errors
    }

    fn validate_auth(auth: &AuthConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if auth.enabled && auth.function_keys.is_empty() {
            errors.push(ValidationError::InvalidValue {
                field: "auth.function_keys".to_string(),
                reason: "At least one key is required when auth is enabled".to_string(),
            });
        }

        errors
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}
