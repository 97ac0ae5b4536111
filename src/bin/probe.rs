//! Sends an adversarial prompt to an existing agent and prints its reply.
//!
//! The agent is not deleted afterwards.

use clap::Parser;
use courier::agents::client::FoundryAgentClient;
use courier::agents::poller::PollPolicy;
use courier::agents::probe::{probe, DEFAULT_PROBE_PROMPT};
use courier::config::Settings;
use courier::logging::init_tracing;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "probe", version, about = "Red-team probe against an existing agent")]
struct Args {
    /// Id of the agent to probe
    #[arg(long, env = "PROBE_AGENT_ID")]
    agent_id: String,

    /// Prompt to send; a dry-run line is appended
    #[arg(long, default_value = DEFAULT_PROBE_PROMPT)]
    prompt: String,

    /// Path to the configuration file
    #[arg(short, long, env = "COURIER_CONFIG", default_value = "courier.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::agent_client_from_file(&args.config)?;
    init_tracing(&settings.logging)?;
    settings.log_ignored_overrides();

    let client = FoundryAgentClient::from_settings(&settings.agent)?;
    let policy = PollPolicy::from_settings(&settings.polling);

    let outcome = probe(&client, &args.agent_id, &args.prompt, &policy).await?;
    println!("{}", outcome.conversation.reply_text());

    Ok(())
}
