//! Domain types for the agent service
//!
//! Resources (agents, threads, messages, runs) and the port the session flow
//! talks to.

mod agent;
mod message;
mod run;
mod tool;

pub use agent::*;
pub use message::*;
pub use run::*;
pub use tool::*;

use async_trait::async_trait;

use crate::agents::error::AgentResult;

/// Port trait for the remote agent service
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Create an agent from a definition
    async fn create_agent(&self, definition: &AgentDefinition) -> AgentResult<Agent>;

    /// Fetch an existing agent
    async fn get_agent(&self, agent_id: &str) -> AgentResult<Agent>;

    /// Delete an agent
    async fn delete_agent(&self, agent_id: &str) -> AgentResult<()>;

    /// Open a new, empty thread
    async fn create_thread(&self) -> AgentResult<Thread>;

    /// Append a message to a thread
    async fn create_message(&self, thread_id: &str, message: &NewMessage) -> AgentResult<Message>;

    /// All messages on a thread, newest first
    async fn list_messages(&self, thread_id: &str) -> AgentResult<Vec<Message>>;

    /// Start a run of `agent_id` against the thread
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> AgentResult<Run>;

    /// Re-fetch a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> AgentResult<Run>;

    /// Ask the service to stop a run
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> AgentResult<Run>;
}
