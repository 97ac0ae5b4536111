//! Maps a file command to its result text

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use super::command::{Command, FileCommand, FileCommandResult, Mode};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invocation has no '{0}' binding")]
    MissingBinding(String),

    #[error("Malformed command message: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl FileCommand {
    /// Decode a queue payload.
    ///
    /// The Functions host hands the message over either as the raw JSON text
    /// or, when the text parses as JSON, as the parsed object. Both are taken.
    pub fn from_payload(payload: &Value) -> Result<Self, DispatchError> {
        match payload {
            Value::String(text) => Ok(serde_json::from_str(text)?),
            other => Ok(FileCommand::deserialize(other)?),
        }
    }
}

/// What a command resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Simulated,
    Deleted,
    Created,
    Unsupported,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Simulated => "simulated",
            Outcome::Deleted => "deleted",
            Outcome::Created => "created",
            Outcome::Unsupported => "unsupported",
        }
    }

    fn describe(self, file_name: &str) -> String {
        match self {
            Outcome::Simulated => format!("Simulated file operation for {}", file_name),
            Outcome::Deleted => format!("Deleted file {}", file_name),
            Outcome::Created => format!("Created file {}", file_name),
            Outcome::Unsupported => format!("Not supported operation for {}", file_name),
        }
    }
}

impl FileCommand {
    /// Dry run beats the command; unknown commands are answered, not rejected
    pub fn outcome(&self) -> Outcome {
        match (&self.mode, &self.command) {
            (Mode::DryRun, _) => Outcome::Simulated,
            (_, Command::Delete) => Outcome::Deleted,
            (_, Command::Create) => Outcome::Created,
            (_, Command::Other(_)) => Outcome::Unsupported,
        }
    }
}

/// Answer a command. Delete and create are acknowledged without touching storage.
pub fn dispatch(command: FileCommand) -> FileCommandResult {
    let outcome = command.outcome();
    info!(
        correlation_id = %command.correlation_id,
        command = ?command.command,
        mode = ?command.mode,
        outcome = outcome.as_str(),
        "Dispatched file command"
    );

    FileCommandResult {
        value: outcome.describe(&command.file_name),
        correlation_id: command.correlation_id,
    }
}
