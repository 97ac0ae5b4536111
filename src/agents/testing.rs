//! In-memory [`AgentService`] with a scripted run lifecycle.
//!
//! Used by unit tests and the `tests/` integration suite. Run statuses are
//! served in order by `get_run`; the last status repeats once the script runs
//! out. Messages posted to a thread are kept, and the configured reply is
//! appended as an assistant message when the run is created.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::agents::domain::{
    Agent, AgentDefinition, AgentService, Message, NewMessage, Role, Run, RunError, RunStatus,
    Thread,
};
use crate::agents::error::{AgentError, AgentResult};

#[derive(Default)]
struct Script {
    run_statuses: VecDeque<RunStatus>,
    run_error: Option<RunError>,
    reply: Option<Message>,
    failing: Option<&'static str>,
}

#[derive(Default)]
struct Ledger {
    next_id: u32,
    definitions: Vec<AgentDefinition>,
    fetched_agents: Vec<String>,
    deleted_agents: Vec<String>,
    threads: HashMap<String, Vec<Message>>,
    run_fetches: u32,
    cancelled_runs: Vec<String>,
}

pub struct ScriptedService {
    script: Mutex<Script>,
    ledger: Mutex<Ledger>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedService {
    /// Runs complete on the first fetch and the agent says nothing
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                run_statuses: VecDeque::from([RunStatus::Completed]),
                ..Script::default()
            }),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Statuses returned by successive `get_run` calls
    pub fn with_run_statuses(self, statuses: Vec<RunStatus>) -> Self {
        self.script().run_statuses = statuses.into();
        self
    }

    /// Assistant text added to the thread once a run starts
    pub fn with_reply(self, text: &str) -> Self {
        self.script().reply =
            Some(Message::with_text("msg_reply", Role::Assistant, text));
        self
    }

    /// Assistant message added to the thread once a run starts
    pub fn with_reply_message(self, message: Message) -> Self {
        self.script().reply = Some(message);
        self
    }

    pub fn with_run_error(self, error: RunError) -> Self {
        self.script().run_error = Some(error);
        self
    }

    /// Make the named operation (e.g. `"create_run"`) answer with a 500
    pub fn failing_on(self, operation: &'static str) -> Self {
        self.script().failing = Some(operation);
        self
    }

    pub fn created_agents(&self) -> Vec<AgentDefinition> {
        self.ledger().definitions.clone()
    }

    pub fn fetched_agents(&self) -> Vec<String> {
        self.ledger().fetched_agents.clone()
    }

    pub fn deleted_agents(&self) -> Vec<String> {
        self.ledger().deleted_agents.clone()
    }

    pub fn run_fetches(&self) -> u32 {
        self.ledger().run_fetches
    }

    pub fn cancelled_runs(&self) -> Vec<String> {
        self.ledger().cancelled_runs.clone()
    }

    /// Messages on a thread, oldest first
    pub fn thread_messages(&self, thread_id: &str) -> Vec<Message> {
        self.ledger()
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Wait until `count` agents have been deleted, for deletions spawned off
    /// the calling task
    pub async fn wait_for_deletions(&self, count: usize) -> Vec<String> {
        for _ in 0..200 {
            let deleted = self.deleted_agents();
            if deleted.len() >= count {
                return deleted;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.deleted_agents()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, operation: &'static str) -> AgentResult<()> {
        if self.script().failing == Some(operation) {
            return Err(AgentError::Api {
                status: 500,
                message: format!("scripted failure in {}", operation),
            });
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut ledger = self.ledger();
        ledger.next_id += 1;
        format!("{}_{}", prefix, ledger.next_id)
    }
}

#[async_trait]
impl AgentService for ScriptedService {
    async fn create_agent(&self, definition: &AgentDefinition) -> AgentResult<Agent> {
        self.check("create_agent")?;
        let id = self.next_id("asst");
        self.ledger().definitions.push(definition.clone());
        Ok(Agent {
            id,
            name: Some(definition.name.clone()),
            model: Some(definition.model.clone()),
            instructions: Some(definition.instructions.clone()),
        })
    }

    async fn get_agent(&self, agent_id: &str) -> AgentResult<Agent> {
        self.check("get_agent")?;
        self.ledger()
            .fetched_agents
            .push(agent_id.to_string());
        Ok(Agent {
            id: agent_id.to_string(),
            name: None,
            model: None,
            instructions: None,
        })
    }

    async fn delete_agent(&self, agent_id: &str) -> AgentResult<()> {
        self.check("delete_agent")?;
        self.ledger()
            .deleted_agents
            .push(agent_id.to_string());
        Ok(())
    }

    async fn create_thread(&self) -> AgentResult<Thread> {
        self.check("create_thread")?;
        let id = self.next_id("thread");
        self.ledger()
            .threads
            .insert(id.clone(), Vec::new());
        Ok(Thread {
            id,
            created_at: None,
        })
    }

    async fn create_message(&self, thread_id: &str, message: &NewMessage) -> AgentResult<Message> {
        self.check("create_message")?;
        let id = self.next_id("msg");
        let stored = Message::with_text(id, message.role, message.content.clone());
        self.ledger()
            .threads
            .entry(thread_id.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, thread_id: &str) -> AgentResult<Vec<Message>> {
        self.check("list_messages")?;
        let mut messages = self.thread_messages(thread_id);
        messages.reverse();
        Ok(messages)
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> AgentResult<Run> {
        self.check("create_run")?;
        let id = self.next_id("run");
        if let Some(reply) = self.script().reply.clone() {
            self.ledger()
                .threads
                .entry(thread_id.to_string())
                .or_default()
                .push(reply);
        }
        Ok(Run::new(id, thread_id, agent_id, RunStatus::Queued))
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> AgentResult<Run> {
        self.check("get_run")?;
        self.ledger().run_fetches += 1;

        let mut script = self.script();
        let status = if script.run_statuses.len() > 1 {
            script.run_statuses.pop_front().unwrap_or(RunStatus::Completed)
        } else {
            script.run_statuses.front().copied().unwrap_or(RunStatus::Completed)
        };

        let mut run = Run::new(run_id, thread_id, "asst", status);
        if status == RunStatus::Failed {
            run.last_error = script.run_error.clone();
        }
        Ok(run)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> AgentResult<Run> {
        self.check("cancel_run")?;
        self.ledger()
            .cancelled_runs
            .push(run_id.to_string());
        Ok(Run::new(run_id, thread_id, "asst", RunStatus::Cancelling))
    }
}
