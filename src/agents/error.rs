//! Error types for the agent session flow

use thiserror::Error;

/// Errors that can occur while talking to the agent service
#[derive(Debug, Error)]
pub enum AgentError {
    /// Credential resolution failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Service answered with a non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out at the HTTP layer
    #[error("Request timed out")]
    Timeout,

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Run did not reach a terminal status within the poll budget
    #[error("Run {run_id} still {status} after {waited_secs}s")]
    RunTimeout {
        run_id: String,
        status: String,
        waited_secs: u64,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors raised while acquiring a bearer token
#[derive(Debug, Error)]
pub enum AuthError {
    /// A credential source is not available in this environment
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },

    /// The token endpoint rejected the request
    #[error("{source_name} token request failed: {status} - {message}")]
    Rejected {
        source_name: &'static str,
        status: u16,
        message: String,
    },

    /// Every credential in the chain failed
    #[error("No credential in the chain could provide a token: {}", .0.join("; "))]
    ChainExhausted(Vec<String>),

    /// Token response could not be decoded
    #[error("Malformed token response from {source_name}: {reason}")]
    Malformed {
        source_name: &'static str,
        reason: String,
    },
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::Timeout
        } else if err.is_decode() {
            AgentError::Parse(err.to_string())
        } else if err.is_connect() {
            AgentError::Network(format!("Connection error: {}", err))
        } else {
            AgentError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Parse(err.to_string())
    }
}

impl AgentError {
    /// Whether this error came from the poll budget running out
    pub fn is_run_timeout(&self) -> bool {
        matches!(self, AgentError::RunTimeout { .. })
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for credential operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_exhausted_lists_every_reason() {
        let err = AuthError::ChainExhausted(vec![
            "environment unavailable".to_string(),
            "managed identity unavailable".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("environment unavailable; managed identity unavailable"));
    }

    #[test]
    fn test_run_timeout_display() {
        let err = AgentError::RunTimeout {
            run_id: "run_1".to_string(),
            status: "in_progress".to_string(),
            waited_secs: 30,
        };
        assert!(err.is_run_timeout());
        assert_eq!(err.to_string(), "Run run_1 still in_progress after 30s");
    }
}
