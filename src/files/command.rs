//! Queue message shapes for the file tool

use serde::{Deserialize, Serialize};

/// Operation requested by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Command {
    Create,
    Delete,
    /// Anything else, kept verbatim
    Other(String),
}

impl From<String> for Command {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "create" => Command::Create,
            "delete" => Command::Delete,
            _ => Command::Other(raw),
        }
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        match command {
            Command::Create => "create".to_string(),
            Command::Delete => "delete".to_string(),
            Command::Other(raw) => raw,
        }
    }
}

/// How the tool should behave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mode {
    DryRun,
    Other(String),
}

impl From<String> for Mode {
    fn from(raw: String) -> Self {
        if raw == "dry_run" {
            Mode::DryRun
        } else {
            Mode::Other(raw)
        }
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::DryRun => "dry_run".to_string(),
            Mode::Other(raw) => raw,
        }
    }
}

/// Message the agent service writes to the input queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCommand {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub command: Command,
    pub mode: Mode,
    #[serde(rename = "CorrelationId")]
    pub correlation_id: String,
}

/// Message written back to the output queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCommandResult {
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "CorrelationId")]
    pub correlation_id: String,
}
