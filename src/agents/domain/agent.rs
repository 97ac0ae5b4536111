//! Agent and thread resources

use serde::{Deserialize, Serialize};

use super::ToolDefinition;

/// Request body for creating an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Model deployment name
    pub model: String,
    /// Display name
    pub name: String,
    /// Natural-language instructions
    pub instructions: String,
    /// Declared tool capabilities
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

/// An agent as returned by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Opaque agent id
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// A conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Opaque thread id
    pub id: String,
    /// Creation timestamp (Unix epoch seconds)
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Deletion acknowledgement
#[derive(Debug, Clone, Deserialize)]
pub struct DeletionStatus {
    pub id: String,
    pub deleted: bool,
}
