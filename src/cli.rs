use clap::Parser;
use std::path::PathBuf;

use crate::config::LogFormat;

/// Courier - custom handler bridging Azure Functions triggers to a Foundry agent
#[derive(Parser, Debug, Clone)]
#[command(name = "courier", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "COURIER_CONFIG", default_value = "courier.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "COURIER_HOST")]
    pub host: Option<String>,

    /// Server port (the Functions host sets FUNCTIONS_CUSTOMHANDLER_PORT instead)
    #[arg(long, env = "COURIER_PORT")]
    pub port: Option<u16>,

    /// Agent service project endpoint
    #[arg(long)]
    pub project_endpoint: Option<String>,

    /// Log output format
    #[arg(long, value_enum, env = "COURIER_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}
