use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::auth::{AuthConfig, AuthContext};

pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";
pub const FUNCTION_KEY_QUERY: &str = "code";

/// Function-level key check, as the Functions host applies it
pub struct AuthMiddleware {
    config: Arc<AuthConfig>,
}

pub type SharedAuthMiddleware = Arc<AuthMiddleware>;

impl AuthMiddleware {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self { config }
    }

    pub fn authenticate(&self, headers: &HeaderMap, uri: &Uri) -> Result<AuthContext, AuthError> {
        if !self.config.enabled {
            return Ok(AuthContext::default());
        }

        let presented = match headers
            .get(FUNCTION_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            Some(key) => key.to_string(),
            None => Query::<HashMap<String, String>>::try_from_uri(uri)
                .ok()
                .and_then(|Query(params)| params.get(FUNCTION_KEY_QUERY).cloned())
                .ok_or(AuthError::MissingCredentials)?,
        };

        self.config
            .function_keys
            .iter()
            .position(|key| *key == presented)
            .map(|index| AuthContext {
                authenticated: true,
                key_index: Some(index),
            })
            .ok_or(AuthError::InvalidCredentials)
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidCredentials,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredentials => (StatusCode::UNAUTHORIZED, "Missing function key"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid function key"),
        };

        (status, message).into_response()
    }
}

pub async fn auth_middleware(
    State(auth): State<SharedAuthMiddleware>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_context = auth.authenticate(request.headers(), request.uri())?;

    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}
