use clap::Parser;
use courier::agents::client::FoundryAgentClient;
use courier::cli::Cli;
use courier::config::Settings;
use courier::logging::init_tracing;
use courier::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::new_with_cli(&cli)?;
    init_tracing(&settings.logging)?;
    settings.log_ignored_overrides();

    let host = settings.server.host.clone();
    let port = settings.server.port;
    info!(
        endpoint = %settings.agent.endpoint,
        model = %settings.agent.model,
        "Starting courier on {}:{}",
        host,
        port
    );

    let client = FoundryAgentClient::from_settings(&settings.agent)?;
    let state = AppState::new(settings, Arc::new(client))?;
    let app = courier::create_app(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
