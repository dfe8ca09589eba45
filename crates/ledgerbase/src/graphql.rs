//! Deployment-scoped GraphQL request pipeline.
//!
//! Two concerns compose here, in order: a bearer decorator that resolves
//! the token at dispatch time (never captured at build time), and an
//! error interceptor that reports credential failures to the embedder's
//! logout path exactly once per failed operation, with no automatic
//! retry. The endpoint URL is deployment-scoped, so the factory must be
//! re-invoked whenever the deployment id changes.

use std::sync::Arc;

use http::{Method, Request, StatusCode, header::AUTHORIZATION, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::auth::TokenResolver;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::outbound::call_outbound;

/// Invoked once per operation that fails with a credential error.
pub type AuthFailureHook = Arc<dyn Fn() + Send + Sync>;

/// GraphQL error codes the gateway uses for invalid or expired tokens.
const AUTH_ERROR_CODES: &[&str] = &["UNAUTHENTICATED", "UNAUTHORIZED"];

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlResponseError>,
}

#[derive(Deserialize)]
struct GraphqlResponseError {
    message: String,
    #[serde(default)]
    extensions: Option<ErrorExtensions>,
}

#[derive(Deserialize)]
struct ErrorExtensions {
    code: Option<String>,
}

impl GraphqlResponseError {
    fn is_auth_error(&self) -> bool {
        self.extensions
            .as_ref()
            .and_then(|e| e.code.as_deref())
            .is_some_and(|code| AUTH_ERROR_CODES.contains(&code))
    }
}

/// Client for one deployment's GraphQL endpoint.
pub struct GraphqlClient {
    endpoint: Url,
    token: Arc<dyn TokenResolver>,
    on_auth_failure: AuthFailureHook,
}

impl std::fmt::Debug for GraphqlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl GraphqlClient {
    /// Build a client for `deployment_id`. Rebuild when the deployment id
    /// changes; token refreshes are picked up through the resolver.
    pub fn build(
        config: &GatewayConfig,
        deployment_id: &str,
        token: Arc<dyn TokenResolver>,
        on_auth_failure: AuthFailureHook,
    ) -> Result<Self, GatewayError> {
        let endpoint = config.endpoint(&format!("deployments/{deployment_id}/graphql"))?;
        Ok(Self {
            endpoint,
            token,
            on_auth_failure,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Execute one operation and return its `data` value.
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value, GatewayError> {
        self.token.resolve().await?;
        let bearer = self
            .token
            .current()
            .ok_or_else(|| self.auth_failure("no session token available".to_string()))?;

        let body = serde_json::to_vec(&GraphqlRequest { query, variables })?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.as_str())
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)?;
        let resp = call_outbound(req).await?;

        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
            return Err(self.auth_failure(format!(
                "credentials rejected with status {}",
                resp.status()
            )));
        }
        if !resp.status().is_success() {
            return Err(GatewayError::HttpError(format!(
                "GraphQL endpoint returned status {}",
                resp.status()
            )));
        }

        let parsed: GraphqlResponse =
            serde_json::from_slice(resp.body()).map_err(|e| GatewayError::ResponseFormatError {
                message: format!("invalid GraphQL response: {e}"),
                raw_response: String::from_utf8_lossy(resp.body()).into_owned(),
            })?;

        if !parsed.errors.is_empty() {
            if let Some(err) = parsed.errors.iter().find(|e| e.is_auth_error()) {
                return Err(self.auth_failure(err.message.clone()));
            }
            let messages: Vec<&str> = parsed.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(GatewayError::Graphql(messages.join("; ")));
        }

        parsed.data.ok_or_else(|| GatewayError::ResponseFormatError {
            message: "GraphQL response carried neither data nor errors".to_string(),
            raw_response: String::new(),
        })
    }

    fn auth_failure(&self, message: String) -> GatewayError {
        log::warn!("authentication failure on {}: {message}", self.endpoint);
        (self.on_auth_failure)();
        GatewayError::AuthError(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_with_code(code: Option<&str>) -> GraphqlResponseError {
        GraphqlResponseError {
            message: "boom".into(),
            extensions: code.map(|c| ErrorExtensions {
                code: Some(c.to_string()),
            }),
        }
    }

    #[test]
    fn auth_codes_are_recognized() {
        assert!(error_with_code(Some("UNAUTHENTICATED")).is_auth_error());
        assert!(error_with_code(Some("UNAUTHORIZED")).is_auth_error());
        assert!(!error_with_code(Some("BAD_USER_INPUT")).is_auth_error());
        assert!(!error_with_code(None).is_auth_error());
    }
}
