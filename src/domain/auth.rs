use serde::{Deserialize, Serialize};

/// Function-key check for running without the Functions host in front.
/// Behind the host, keys are enforced there and this stays disabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub function_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthContext {
    pub authenticated: bool,
    /// Index of the key that matched, never the key itself
    pub key_index: Option<usize>,
}
