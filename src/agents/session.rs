//! One agent and one thread per prompt, deleted when the prompt is done

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::agents::domain::{
    Agent, AgentDefinition, AgentService, NewMessage, Run, RunStatus, Thread, ToolDefinition,
};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::poller::{poll_until_terminal, PollPolicy};
use crate::agents::reply::{latest_assistant_reply, NO_RESPONSE};
use crate::config::Settings;

/// Result of one prompt against a thread
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Text of the latest assistant message, if there is one
    pub reply: Option<String>,
    /// The run in its terminal status
    pub run: Run,
    /// Number of times the run was re-fetched
    pub polls: u32,
}

impl Conversation {
    /// The reply, or the "no response" sentinel
    pub fn reply_text(&self) -> &str {
        self.reply.as_deref().unwrap_or(NO_RESPONSE)
    }
}

/// Post `prompt` to a thread, run the agent and read back its reply.
///
/// A run that runs out of poll budget is cancelled (best effort) before the
/// timeout is returned. A failed run is logged and its thread is still read.
pub async fn converse_on_thread(
    service: &dyn AgentService,
    agent_id: &str,
    thread_id: &str,
    prompt: &str,
    policy: &PollPolicy,
) -> AgentResult<Conversation> {
    let message = service
        .create_message(thread_id, &NewMessage::user(prompt))
        .await?;
    debug!(thread_id, message_id = %message.id, "Posted user message");

    let run = service.create_run(thread_id, agent_id).await?;
    info!(run_id = %run.id, thread_id, agent_id, "Run created");

    let polled = match poll_until_terminal(service, run, policy).await {
        Ok(polled) => polled,
        Err(AgentError::RunTimeout {
            run_id,
            status,
            waited_secs,
        }) => {
            warn!(%run_id, %status, waited_secs, "Run did not finish in time, cancelling");
            if let Err(e) = service.cancel_run(thread_id, &run_id).await {
                warn!(%run_id, error = %e, "Failed to cancel run");
            }
            return Err(AgentError::RunTimeout {
                run_id,
                status,
                waited_secs,
            });
        }
        Err(e) => return Err(e),
    };

    let run = polled.run;
    if run.status == RunStatus::Failed {
        match &run.last_error {
            Some(last_error) => error!(run_id = %run.id, "Run failed: {}", last_error),
            None => error!(run_id = %run.id, "Run failed without error detail"),
        }
    } else {
        info!(run_id = %run.id, status = %run.status, polls = polled.polls, "Run finished");
    }

    let messages = service.list_messages(thread_id).await?;
    let reply = latest_assistant_reply(&messages);
    if reply.is_none() {
        debug!(thread_id, messages = messages.len(), "No assistant text on thread");
    }

    Ok(Conversation {
        reply,
        run,
        polls: polled.polls,
    })
}

/// Creates short-lived agents bound to the file tool
pub struct SessionManager {
    service: Arc<dyn AgentService>,
    definition: AgentDefinition,
    policy: PollPolicy,
}

impl SessionManager {
    pub fn new(service: Arc<dyn AgentService>, settings: &Settings) -> Self {
        let definition = AgentDefinition {
            model: settings.agent.model.clone(),
            name: settings.agent.name.clone(),
            instructions: settings.agent.instructions.clone(),
            tools: vec![ToolDefinition::file_manager(
                &settings.queues.service_endpoint,
                &settings.queues.input_queue,
                &settings.queues.output_queue,
            )],
        };

        Self {
            service,
            definition,
            policy: PollPolicy::from_settings(&settings.polling),
        }
    }

    /// Open a thread and create a fresh agent for it.
    ///
    /// The thread is opened first so that once the agent exists it is
    /// already owned by the returned session.
    pub async fn create_session(&self) -> AgentResult<AgentSession> {
        let thread = self.service.create_thread().await?;
        let agent = self.service.create_agent(&self.definition).await?;
        info!(agent_id = %agent.id, thread_id = %thread.id, "Agent session opened");

        Ok(AgentSession {
            service: self.service.clone(),
            agent,
            thread,
            policy: self.policy.clone(),
            closed: false,
        })
    }
}

/// An agent owned for the duration of one prompt.
///
/// Call [`AgentSession::close`] when done. A session dropped without closing
/// (an error path, or the request future being cancelled) deletes its agent
/// from a task spawned on the current runtime.
pub struct AgentSession {
    service: Arc<dyn AgentService>,
    agent: Agent,
    thread: Thread,
    policy: PollPolicy,
    closed: bool,
}

impl AgentSession {
    pub fn agent_id(&self) -> &str {
        &self.agent.id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread.id
    }

    pub async fn converse(&self, prompt: &str) -> AgentResult<Conversation> {
        converse_on_thread(
            self.service.as_ref(),
            &self.agent.id,
            &self.thread.id,
            prompt,
            &self.policy,
        )
        .await
    }

    /// Delete the agent. Returns false when deletion failed; the failure is
    /// logged and otherwise ignored.
    pub async fn close(mut self) -> bool {
        let deleted = delete_agent_logged(self.service.as_ref(), &self.agent.id).await;
        self.closed = true;
        deleted
    }
}

impl Drop for AgentSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let service = self.service.clone();
        let agent_id = self.agent.id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(%agent_id, "Session dropped without close, deleting agent in background");
                handle.spawn(async move {
                    delete_agent_logged(service.as_ref(), &agent_id).await;
                });
            }
            Err(_) => warn!(%agent_id, "No runtime available to delete agent, it will be left behind"),
        }
    }
}

async fn delete_agent_logged(service: &dyn AgentService, agent_id: &str) -> bool {
    match service.delete_agent(agent_id).await {
        Ok(()) => {
            info!(agent_id, "Deleted agent");
            true
        }
        Err(e) => {
            warn!(agent_id, error = %e, "Failed to delete agent");
            false
        }
    }
}
