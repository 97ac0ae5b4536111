use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub mod validator;

use crate::cli::Cli;
use crate::domain::auth::AuthConfig;

/// Environment variable names the Functions host provides
pub mod env_keys {
    pub const PROJECT_ENDPOINT: &str = "PROJECT_ENDPOINT";
    pub const MANAGED_IDENTITY_CLIENT_ID: &str = "PROJECT_ENDPOINT__clientId";
    pub const QUEUE_SERVICE_URI: &str = "STORAGE_CONNECTION__queueServiceUri";
    pub const CUSTOM_HANDLER_PORT: &str = "FUNCTIONS_CUSTOMHANDLER_PORT";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub agent: AgentServiceSettings,
    pub queues: QueueSettings,
    pub polling: PollSettings,
    #[serde(default)]
    pub auth: AuthConfig,
    pub logging: LoggingSettings,
    pub functions: FunctionSettings,
    /// Environment overrides that were rejected while loading, logged once
    /// tracing is up
    #[serde(skip)]
    ignored_overrides: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Where the agent service lives and what agent each request creates
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentServiceSettings {
    /// Project endpoint of the agent service
    pub endpoint: String,
    pub api_version: String,
    /// User-assigned managed identity to authenticate as
    #[serde(default)]
    pub managed_identity_client_id: Option<String>,
    pub model: String,
    pub name: String,
    pub instructions: String,
    /// Per-call HTTP timeout
    pub request_timeout_secs: u64,
}

impl AgentServiceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Queue pair the file tool is routed through
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueSettings {
    /// Queue service endpoint, e.g. `https://account.queue.core.windows.net`
    pub service_endpoint: String,
    pub input_queue: String,
    pub output_queue: String,
}

/// Run polling budget
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollSettings {
    pub initial_interval_ms: u64,
    /// Growth factor between polls; 1.0 keeps the interval fixed
    pub multiplier: f64,
    pub max_interval_ms: u64,
    /// Give up on a run after this long
    pub max_wait_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Function names and binding names shared with the Functions host
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionSettings {
    /// Route of the HTTP-triggered prompt function, without the `/api` prefix
    pub prompt_route: String,
    /// Name of the queue-triggered function
    pub file_manager_function: String,
    /// Trigger binding carrying the queue message
    pub queue_trigger_binding: String,
    /// Output binding the result message is written to
    pub queue_output_binding: String,
}

impl Settings {
    /// Create settings from CLI arguments (config file, then environment, then CLI)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::read(&cli.config)?;
        settings.apply_env_overrides();
        settings.apply_cli_overrides(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Load an optional TOML file, then environment overrides
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let mut settings = Self::read(path)?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Like [`Settings::from_file`], but only the agent service and polling
    /// sections have to be valid. For tools that never touch the queues.
    pub fn agent_client_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let mut settings = Self::read(path)?;
        settings.apply_env_overrides();
        settings.check(validator::ConfigValidator::validate_agent_client(&settings))?;
        Ok(settings)
    }

    fn read(path: &Path) -> Result<Self, anyhow::Error> {
        Self::load(Self::builder(File::from(path).required(false))?)
    }

    /// Built-in defaults overlaid with TOML text; the environment is not consulted
    pub fn from_toml(contents: &str) -> Result<Self, anyhow::Error> {
        let settings = Self::load(Self::builder(File::from_str(contents, FileFormat::Toml))?)?;
        settings.validate()?;
        Ok(settings)
    }

    fn builder<T>(file: T) -> Result<config::ConfigBuilder<config::builder::DefaultState>, anyhow::Error>
    where
        T: config::Source + Send + Sync + 'static,
    {
        Ok(Config::builder()
            .add_source(file)
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("agent.endpoint", "")?
            .set_default("agent.api_version", "v1")?
            .set_default("agent.model", "gpt-4.1-mini")?
            .set_default("agent.name", "azure-function-agent-file-manager")?
            .set_default(
                "agent.instructions",
                "You are a helpful support agent. Executes file management tasks.",
            )?
            .set_default("agent.request_timeout_secs", 30)?
            .set_default("queues.service_endpoint", "")?
            .set_default("queues.input_queue", "input")?
            .set_default("queues.output_queue", "output")?
            .set_default("polling.initial_interval_ms", 1000)?
            .set_default("polling.multiplier", 1.0)?
            .set_default("polling.max_interval_ms", 1000)?
            .set_default("polling.max_wait_secs", 300)?
            .set_default("logging.filter", "info,courier=debug")?
            .set_default("logging.format", "pretty")?
            .set_default("functions.prompt_route", "prompt")?
            .set_default("functions.file_manager_function", "FileManager")?
            .set_default("functions.queue_trigger_binding", "msg")?
            .set_default("functions.queue_output_binding", "outputQueueItem")?)
    }

    fn load(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, anyhow::Error> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        self.check(validator::ConfigValidator::validate(self))
    }

    fn check(&self, outcome: Result<(), Vec<validator::ValidationError>>) -> Result<(), anyhow::Error> {
        outcome.map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    /// Apply the app settings the Functions host exposes as environment variables
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(env_keys::PROJECT_ENDPOINT) {
            self.agent.endpoint = endpoint;
        }
        if let Some(client_id) = lookup(env_keys::MANAGED_IDENTITY_CLIENT_ID) {
            if !client_id.is_empty() {
                self.agent.managed_identity_client_id = Some(client_id);
            }
        }
        if let Some(queue_uri) = lookup(env_keys::QUEUE_SERVICE_URI) {
            self.queues.service_endpoint = queue_uri;
        }
        if let Some(port) = lookup(env_keys::CUSTOM_HANDLER_PORT) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => self.ignored_overrides.push(format!(
                    "Ignoring {}={}: not a port number",
                    env_keys::CUSTOM_HANDLER_PORT,
                    port
                )),
            }
        }
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(endpoint) = &cli.project_endpoint {
            self.agent.endpoint = endpoint.clone();
        }
        if let Some(format) = cli.log_format {
            self.logging.format = format;
        }
    }

    pub fn ignored_overrides(&self) -> &[String] {
        &self.ignored_overrides
    }

    /// Warn about rejected overrides. Call after tracing is initialized.
    pub fn log_ignored_overrides(&self) {
        for message in &self.ignored_overrides {
            tracing::warn!("{}", message);
        }
    }

    /// Route the prompt function is served on
    pub fn prompt_path(&self) -> String {
        format!("/api/{}", self.functions.prompt_route.trim_matches('/'))
    }

    /// Route the Functions host posts queue invocations to
    pub fn file_manager_path(&self) -> String {
        format!("/{}", self.functions.file_manager_function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn defaults() -> Settings {
        Settings::load(Settings::builder(File::from_str("", FileFormat::Toml)).unwrap())
            .unwrap()
    }

    #[test]
    fn test_defaults_match_function_app() {
        let settings = defaults();
        assert_eq!(settings.agent.model, "gpt-4.1-mini");
        assert_eq!(settings.agent.name, "azure-function-agent-file-manager");
        assert_eq!(settings.queues.input_queue, "input");
        assert_eq!(settings.queues.output_queue, "output");
        assert_eq!(settings.polling.initial_interval_ms, 1000);
        assert_eq!(settings.polling.multiplier, 1.0);
        assert_eq!(settings.prompt_path(), "/api/prompt");
        assert_eq!(settings.file_manager_path(), "/FileManager");
        assert!(!settings.auth.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = defaults();
        let env: HashMap<&str, &str> = HashMap::from([
            (env_keys::PROJECT_ENDPOINT, "https://res.services.ai.azure.com/api/projects/p"),
            (env_keys::MANAGED_IDENTITY_CLIENT_ID, "client-123"),
            (env_keys::QUEUE_SERVICE_URI, "https://acct.queue.core.windows.net"),
            (env_keys::CUSTOM_HANDLER_PORT, "7071"),
        ]);

        settings.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.agent.endpoint, "https://res.services.ai.azure.com/api/projects/p");
        assert_eq!(settings.agent.managed_identity_client_id.as_deref(), Some("client-123"));
        assert_eq!(settings.queues.service_endpoint, "https://acct.queue.core.windows.net");
        assert_eq!(settings.server.port, 7071);
    }

    #[test]
    fn test_empty_client_id_means_default_chain() {
        let mut settings = defaults();
        settings.apply_overrides_from(|key| {
            (key == env_keys::MANAGED_IDENTITY_CLIENT_ID).then(String::new)
        });
        assert!(settings.agent.managed_identity_client_id.is_none());
    }

    #[test]
    fn test_from_toml_overlays_defaults() {
        let settings = Settings::from_toml(
            r#"
            [agent]
            endpoint = "https://res.services.ai.azure.com/api/projects/p"
            model = "gpt-4o"

            [queues]
            service_endpoint = "https://acct.queue.core.windows.net"

            [auth]
            enabled = true
            function_keys = ["k1"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.agent.model, "gpt-4o");
        assert_eq!(settings.agent.api_version, "v1");
        assert!(settings.auth.enabled);
    }

    #[test]
    fn test_from_toml_validates() {
        let err = Settings::from_toml("").unwrap_err();
        assert!(err.to_string().contains("PROJECT_ENDPOINT"));
    }

    #[test]
    fn test_bad_port_is_ignored() {
        let mut settings = defaults();
        settings.apply_overrides_from(|key| {
            (key == env_keys::CUSTOM_HANDLER_PORT).then(|| "not-a-port".to_string())
        });
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.ignored_overrides().len(), 1);
        assert!(settings.ignored_overrides()[0].contains(env_keys::CUSTOM_HANDLER_PORT));
    }
}
