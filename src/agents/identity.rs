//! Bearer token credentials for the agent service
//!
//! Two policies, picked once at start:
//! - a managed-identity client id is configured: authenticate as that identity
//! - otherwise: the default chain (environment client secret, managed identity,
//!   Azure CLI), first success wins

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::agents::error::{AuthError, AuthResult};

/// Token scope of the agent service
pub const AGENT_SERVICE_SCOPE: &str = "https://ai.azure.com/.default";

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const IMDS_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Tokens are refreshed this long before they expire
const REFRESH_MARGIN_SECS: i64 = 300;

/// A bearer token and its expiry
pub struct AccessToken {
    pub secret: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            expires_at,
        }
    }

    /// Whether the token is still usable `margin_secs` from now
    pub fn is_fresh(&self, margin_secs: i64) -> bool {
        self.expires_at - ChronoDuration::seconds(margin_secs) > Utc::now()
    }
}

impl Clone for AccessToken {
    fn clone(&self) -> Self {
        Self {
            secret: SecretString::from(self.secret.expose_secret().to_owned()),
            expires_at: self.expires_at,
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs and chain errors
    fn name(&self) -> &'static str;

    /// Acquire a token for `scope`
    async fn get_token(&self, scope: &str) -> AuthResult<AccessToken>;
}

/// Pick the credential policy for this process
pub fn resolve_credential(
    managed_identity_client_id: Option<&str>,
    http: reqwest::Client,
) -> Arc<dyn TokenCredential> {
    let inner: Box<dyn TokenCredential> = match managed_identity_client_id {
        Some(client_id) if !client_id.is_empty() => {
            info!(client_id = %client_id, "Using user-assigned managed identity");
            Box::new(ManagedIdentityCredential::from_env(Some(client_id.to_string()), http))
        }
        _ => {
            info!("Using default credential chain");
            Box::new(ChainedCredential::default_chain(http))
        }
    };
    Arc::new(CachedCredential::new(inner))
}

// ============================================================================
// Environment client secret
// ============================================================================

/// Service principal credential from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`
/// and `AZURE_CLIENT_SECRET`
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        authority_host: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            http,
            authority_host: authority_host.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret,
        }
    }

    /// Build from the environment; `None` when any variable is missing
    pub fn from_env(http: reqwest::Client) -> Option<Self> {
        let tenant_id = env::var("AZURE_TENANT_ID").ok()?;
        let client_id = env::var("AZURE_CLIENT_ID").ok()?;
        let client_secret = env::var("AZURE_CLIENT_SECRET").ok()?;
        let authority_host =
            env::var("AZURE_AUTHORITY_HOST").unwrap_or_else(|_| DEFAULT_AUTHORITY_HOST.to_string());
        Some(Self::new(
            http,
            authority_host,
            tenant_id,
            client_id,
            SecretString::from(client_secret),
        ))
    }
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: Value,
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn get_token(&self, scope: &str) -> AuthResult<AccessToken> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", scope),
        ];

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| unavailable(self.name(), e))?;

        let body: OAuthTokenResponse = read_token_body(self.name(), response).await?;
        let expires_in = parse_epoch_like(&body.expires_in).ok_or_else(|| AuthError::Malformed {
            source_name: self.name(),
            reason: "expires_in is not a number".to_string(),
        })?;

        Ok(AccessToken::new(
            body.access_token,
            Utc::now() + ChronoDuration::seconds(expires_in),
        ))
    }
}

// ============================================================================
// Managed identity
// ============================================================================

/// Where the managed identity token endpoint lives
#[derive(Debug, Clone)]
pub enum IdentityEndpoint {
    /// App Service / Functions: `IDENTITY_ENDPOINT` + `IDENTITY_HEADER`
    AppService { endpoint: String, header: String },
    /// Instance metadata service on VMs
    Imds { endpoint: String },
}

pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    client_id: Option<String>,
    endpoint: IdentityEndpoint,
}

impl ManagedIdentityCredential {
    pub fn new(http: reqwest::Client, client_id: Option<String>, endpoint: IdentityEndpoint) -> Self {
        Self {
            http,
            client_id,
            endpoint,
        }
    }

    /// Detect the hosting environment's token endpoint
    pub fn from_env(client_id: Option<String>, http: reqwest::Client) -> Self {
        let endpoint = match (env::var("IDENTITY_ENDPOINT"), env::var("IDENTITY_HEADER")) {
            (Ok(endpoint), Ok(header)) => IdentityEndpoint::AppService { endpoint, header },
            _ => IdentityEndpoint::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        };
        Self::new(http, client_id, endpoint)
    }
}

#[derive(Deserialize)]
struct ManagedIdentityTokenResponse {
    access_token: String,
    expires_on: Value,
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "managed identity"
    }

    async fn get_token(&self, scope: &str) -> AuthResult<AccessToken> {
        let resource = scope.trim_end_matches("/.default");
        let mut query: Vec<(&str, &str)> = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let request = match &self.endpoint {
            IdentityEndpoint::AppService { endpoint, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.http
                    .get(endpoint)
                    .header("X-IDENTITY-HEADER", header)
                    .query(&query)
            }
            IdentityEndpoint::Imds { endpoint } => {
                query.push(("api-version", IMDS_API_VERSION));
                self.http
                    .get(endpoint)
                    .header("Metadata", "true")
                    .timeout(IMDS_PROBE_TIMEOUT)
                    .query(&query)
            }
        };

        let response = request.send().await.map_err(|e| unavailable(self.name(), e))?;
        let body: ManagedIdentityTokenResponse = read_token_body(self.name(), response).await?;
        let expires_on = parse_epoch_like(&body.expires_on).ok_or_else(|| AuthError::Malformed {
            source_name: self.name(),
            reason: "expires_on is not an epoch timestamp".to_string(),
        })?;
        let expires_at = Utc
            .timestamp_opt(expires_on, 0)
            .single()
            .ok_or_else(|| AuthError::Malformed {
                source_name: self.name(),
                reason: format!("expires_on {} out of range", expires_on),
            })?;

        Ok(AccessToken::new(body.access_token, expires_at))
    }
}

// ============================================================================
// Azure CLI
// ============================================================================

/// Token from a logged-in `az` CLI, for local development
pub struct AzureCliCredential {
    program: String,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self {
            program: "az".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<String>,
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "azure cli"
    }

    async fn get_token(&self, scope: &str) -> AuthResult<AccessToken> {
        let output = tokio::process::Command::new(&self.program)
            .args(["account", "get-access-token", "--output", "json", "--scope", scope])
            .output()
            .await
            .map_err(|e| AuthError::Unavailable {
                source_name: self.name(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AuthError::Unavailable {
                source_name: self.name(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let body: CliTokenResponse =
            serde_json::from_slice(&output.stdout).map_err(|e| AuthError::Malformed {
                source_name: self.name(),
                reason: e.to_string(),
            })?;

        let expires_at = cli_expiry(&body).ok_or_else(|| AuthError::Malformed {
            source_name: self.name(),
            reason: "token has no usable expiry".to_string(),
        })?;

        Ok(AccessToken::new(body.access_token, expires_at))
    }
}

/// Newer CLIs report `expires_on` as epoch seconds; older ones only give a
/// local-time `expiresOn` string
fn cli_expiry(body: &CliTokenResponse) -> Option<DateTime<Utc>> {
    if let Some(epoch) = body.expires_on_epoch {
        return Utc.timestamp_opt(epoch, 0).single();
    }
    let raw = body.expires_on.as_deref()?;
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    naive
        .and_local_timezone(chrono::Local)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

// ============================================================================
// Chain and cache
// ============================================================================

/// Tries each credential in order; first success wins
pub struct ChainedCredential {
    sources: Vec<Box<dyn TokenCredential>>,
}

impl ChainedCredential {
    pub fn new(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self { sources }
    }

    /// Environment client secret, then managed identity, then Azure CLI
    pub fn default_chain(http: reqwest::Client) -> Self {
        let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();
        if let Some(env_credential) = ClientSecretCredential::from_env(http.clone()) {
            sources.push(Box::new(env_credential));
        }
        sources.push(Box::new(ManagedIdentityCredential::from_env(None, http)));
        sources.push(Box::new(AzureCliCredential::default()));
        Self::new(sources)
    }
}

#[async_trait]
impl TokenCredential for ChainedCredential {
    fn name(&self) -> &'static str {
        "default chain"
    }

    async fn get_token(&self, scope: &str) -> AuthResult<AccessToken> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    debug!(credential = source.name(), "Acquired token");
                    return Ok(token);
                }
                Err(e) => {
                    debug!(credential = source.name(), error = %e, "Credential failed, trying next");
                    failures.push(e.to_string());
                }
            }
        }
        Err(AuthError::ChainExhausted(failures))
    }
}

/// Reuses a token until it is close to expiry
pub struct CachedCredential {
    inner: Box<dyn TokenCredential>,
    cache: RwLock<Option<(String, AccessToken)>>,
}

impl CachedCredential {
    pub fn new(inner: Box<dyn TokenCredential>) -> Self {
        Self {
            inner,
            cache: RwLock::new(None),
        }
    }
}

#[async_trait]
impl TokenCredential for CachedCredential {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get_token(&self, scope: &str) -> AuthResult<AccessToken> {
        {
            let cache = self.cache.read().await;
            if let Some((cached_scope, token)) = cache.as_ref() {
                if cached_scope == scope && token.is_fresh(REFRESH_MARGIN_SECS) {
                    return Ok(token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some((cached_scope, token)) = cache.as_ref() {
            if cached_scope == scope && token.is_fresh(REFRESH_MARGIN_SECS) {
                return Ok(token.clone());
            }
        }

        let token = self.inner.get_token(scope).await?;
        debug!(credential = self.inner.name(), expires_at = %token.expires_at, "Refreshed token");
        *cache = Some((scope.to_string(), token.clone()));
        Ok(token)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn unavailable(source_name: &'static str, err: reqwest::Error) -> AuthError {
    AuthError::Unavailable {
        source_name,
        reason: err.to_string(),
    }
}

async fn read_token_body<T: serde::de::DeserializeOwned>(
    source_name: &'static str,
    response: reqwest::Response,
) -> AuthResult<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            source_name,
            status: status.as_u16(),
            message,
        });
    }
    response.json::<T>().await.map_err(|e| AuthError::Malformed {
        source_name,
        reason: e.to_string(),
    })
}

/// Token endpoints disagree on whether numbers are sent as strings
fn parse_epoch_like(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CountingCredential {
        calls: Arc<AtomicUsize>,
        lifetime_secs: i64,
    }

    #[async_trait]
    impl TokenCredential for CountingCredential {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn get_token(&self, _scope: &str) -> AuthResult<AccessToken> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::new(
                format!("token-{}", n),
                Utc::now() + ChronoDuration::seconds(self.lifetime_secs),
            ))
        }
    }

    struct FailingCredential(&'static str);

    #[async_trait]
    impl TokenCredential for FailingCredential {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn get_token(&self, _scope: &str) -> AuthResult<AccessToken> {
            Err(AuthError::Unavailable {
                source_name: self.0,
                reason: "not configured".to_string(),
            })
        }
    }

    #[test]
    fn test_parse_epoch_like() {
        assert_eq!(parse_epoch_like(&serde_json::json!(3599)), Some(3599));
        assert_eq!(parse_epoch_like(&serde_json::json!("1700000000")), Some(1_700_000_000));
        assert_eq!(parse_epoch_like(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_client_id_selects_managed_identity() {
        let credential = resolve_credential(Some("11111111-2222"), reqwest::Client::new());
        assert_eq!(credential.name(), "managed identity");
    }

    #[test]
    fn test_missing_or_empty_client_id_selects_default_chain() {
        for client_id in [None, Some("")] {
            let credential = resolve_credential(client_id, reqwest::Client::new());
            assert_eq!(credential.name(), "default chain", "{:?}", client_id);
        }
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret", Utc::now());
        assert!(!format!("{:?}", token).contains("super-secret"));
    }

    #[tokio::test]
    async fn test_chain_falls_through_to_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ChainedCredential::new(vec![
            Box::new(FailingCredential("environment")),
            Box::new(CountingCredential {
                calls: calls.clone(),
                lifetime_secs: 3600,
            }),
        ]);

        let token = chain.get_token(AGENT_SERVICE_SCOPE).await.unwrap();
        assert_eq!(token.secret.expose_secret(), "token-0");
    }

    #[tokio::test]
    async fn test_chain_reports_every_failure() {
        let chain = ChainedCredential::new(vec![
            Box::new(FailingCredential("environment")),
            Box::new(FailingCredential("azure cli")),
        ]);

        let err = chain.get_token(AGENT_SERVICE_SCOPE).await.unwrap_err();
        match err {
            AuthError::ChainExhausted(failures) => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_cache_reuses_fresh_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedCredential::new(Box::new(CountingCredential {
            calls: calls.clone(),
            lifetime_secs: 3600,
        }));

        cached.get_token(AGENT_SERVICE_SCOPE).await.unwrap();
        cached.get_token(AGENT_SERVICE_SCOPE).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_refreshes_near_expiry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedCredential::new(Box::new(CountingCredential {
            calls: calls.clone(),
            lifetime_secs: 60,
        }));

        cached.get_token(AGENT_SERVICE_SCOPE).await.unwrap();
        let second = cached.get_token(AGENT_SERVICE_SCOPE).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.secret.expose_secret(), "token-1");
    }

    #[tokio::test]
    async fn test_managed_identity_app_service_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/msi/token"))
            .and(header("X-IDENTITY-HEADER", "header-secret"))
            .and(query_param("resource", "https://ai.azure.com"))
            .and(query_param("client_id", "11111111-2222"))
            .and(query_param("api-version", APP_SERVICE_API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "mi-token",
                "expires_on": "4102444800",
                "resource": "https://ai.azure.com",
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let credential = ManagedIdentityCredential::new(
            reqwest::Client::new(),
            Some("11111111-2222".to_string()),
            IdentityEndpoint::AppService {
                endpoint: format!("{}/msi/token", server.uri()),
                header: "header-secret".to_string(),
            },
        );

        let token = credential.get_token(AGENT_SERVICE_SCOPE).await.unwrap();
        assert_eq!(token.secret.expose_secret(), "mi-token");
        assert_eq!(token.expires_at.timestamp(), 4_102_444_800);
    }

    #[tokio::test]
    async fn test_client_secret_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            server.uri(),
            "tenant-1",
            "client-1",
            SecretString::from("wrong".to_string()),
        );

        let err = credential.get_token(AGENT_SERVICE_SCOPE).await.unwrap_err();
        match err {
            AuthError::Rejected { status, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid_client");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_client_secret_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": "sp-token"
            })))
            .mount(&server)
            .await;

        let credential = ClientSecretCredential::new(
            reqwest::Client::new(),
            server.uri(),
            "tenant-1",
            "client-1",
            SecretString::from("right".to_string()),
        );

        let token = credential.get_token(AGENT_SERVICE_SCOPE).await.unwrap();
        assert_eq!(token.secret.expose_secret(), "sp-token");
        assert!(token.is_fresh(REFRESH_MARGIN_SECS));
    }
}
