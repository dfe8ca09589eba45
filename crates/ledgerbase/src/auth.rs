//! Wallet-address login and bearer-token resolution.
//!
//! Login is a three-step exchange: fetch a single-use nonce, have the
//! wallet sign a fixed challenge message concatenated with that nonce,
//! then trade `{message, account, nonce, signature}` for a bearer token.
//! The wallet lives behind [`WalletSigner`]; the signature request may
//! suspend indefinitely until the user responds.
//!
//! [`TokenResolver`] bridges the gap between the session store (async)
//! and request builders (sync): callers `resolve()` before each dispatch
//! so a refreshed token is honored without rebuilding any client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use http::{Method, Request, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::outbound::call_outbound;
use crate::session::Session;

/// Fixed challenge prefix; the nonce is appended before signing.
pub const LOGIN_MESSAGE: &str = "Sign this message to access your database deployment. Nonce: ";

/// External collaborator producing signatures over login challenges.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The chain address this signer controls.
    fn address(&self) -> &str;

    /// Sign `message`, suspending until the wallet responds. A user
    /// rejection must surface as [`GatewayError::SignatureRejected`].
    async fn sign_message(&self, message: &str) -> Result<String, GatewayError>;
}

#[derive(Serialize)]
struct NonceRequest<'a> {
    address: &'a str,
}

#[derive(Deserialize)]
struct NonceResponse {
    nonce: String,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    message: &'a str,
    account: &'a str,
    nonce: &'a str,
    signature: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    token: String,
}

/// Client for the gateway's login endpoints.
pub struct AuthClient {
    config: GatewayConfig,
}

impl AuthClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Fetch a single-use nonce for `address`. A fresh nonce must be
    /// requested for every login attempt.
    pub async fn request_nonce(&self, address: &str) -> Result<String, GatewayError> {
        let body = serde_json::to_vec(&NonceRequest { address })?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.config.endpoint("auth")?.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body)?;
        let resp = call_outbound(req).await?;
        if !resp.status().is_success() {
            return Err(GatewayError::AuthError(format!(
                "nonce request failed with status {}",
                resp.status()
            )));
        }
        let parsed: NonceResponse =
            serde_json::from_slice(resp.body()).map_err(|e| GatewayError::ResponseFormatError {
                message: format!("invalid nonce response: {e}"),
                raw_response: String::from_utf8_lossy(resp.body()).into_owned(),
            })?;
        Ok(parsed.nonce)
    }

    /// Sign the challenge for `nonce` and exchange the signature for a
    /// bearer token.
    pub async fn sign_and_exchange(
        &self,
        signer: &dyn WalletSigner,
        nonce: &str,
    ) -> Result<String, GatewayError> {
        let message = format!("{LOGIN_MESSAGE}{nonce}");
        let signature = signer.sign_message(&message).await?;
        // Wallets return hex signatures with an encoding prefix the
        // verifier does not expect.
        let signature = signature.strip_prefix("0x").unwrap_or(&signature);

        let body = serde_json::to_vec(&VerifyRequest {
            message: &message,
            account: signer.address(),
            nonce,
            signature,
        })?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.config.endpoint("auth/verify")?.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body)?;
        let resp = call_outbound(req).await?;
        if !resp.status().is_success() {
            return Err(GatewayError::AuthError(format!(
                "token exchange rejected with status {}",
                resp.status()
            )));
        }
        let parsed: VerifyResponse =
            serde_json::from_slice(resp.body()).map_err(|e| GatewayError::ResponseFormatError {
                message: format!("invalid verify response: {e}"),
                raw_response: String::from_utf8_lossy(resp.body()).into_owned(),
            })?;
        Ok(parsed.token)
    }

    /// Produce a valid token for this session: a saved, unexpired token is
    /// reused without network I/O, otherwise the full nonce/sign/exchange
    /// flow runs and the result is persisted.
    pub async fn login(
        &self,
        signer: &dyn WalletSigner,
        session: &Session,
    ) -> Result<String, GatewayError> {
        if let Some(token) = session.token().await?
            && token_is_valid(&token)
        {
            log::debug!("reusing saved session token");
            return Ok(token);
        }

        let nonce = self.request_nonce(signer.address()).await?;
        let token = self.sign_and_exchange(signer, &nonce).await?;
        session.set_token(&token).await?;
        log::info!("logged in as {}", signer.address());
        Ok(token)
    }

    /// Clear the local session, then ask the gateway to invalidate it.
    /// The remote call is best-effort; local state is dropped regardless.
    pub async fn logout(&self, session: &Session) -> Result<(), GatewayError> {
        session.clear().await?;

        let result: Result<(), GatewayError> = async {
            let req = Request::builder()
                .method(Method::POST)
                .uri(self.config.endpoint("auth/logout")?.as_str())
                .body(Vec::new())?;
            call_outbound(req).await?;
            Ok(())
        }
        .await;
        if let Err(e) = result {
            log::warn!("remote logout failed (session already cleared locally): {e}");
        }
        Ok(())
    }
}

/// Check the token's expiry claim against the current time.
///
/// The payload is decoded without verifying the signature; the gateway is
/// the verifier, this only keeps an obviously stale token from being sent.
/// Returns `false` iff `exp` is strictly in the past, or the token is
/// malformed.
pub fn token_is_valid(token: &str) -> bool {
    expiry_claim(token).is_some_and(|exp| exp >= Utc::now().timestamp())
}

fn expiry_claim(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_i64()
}

/// Resolves the bearer token at request time, supporting refresh.
///
/// Two-phase by design: [`resolve()`](TokenResolver::resolve) is async and
/// re-reads the backing store; [`current()`](TokenResolver::current) is the
/// cheap sync read used while building the request. Callers must call
/// `resolve()` before relying on `current()`.
pub trait TokenResolver: Send + Sync + std::fmt::Debug {
    /// Refresh the cached token from the backing store.
    fn resolve(&self) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>>;

    /// Return the most recently resolved token, if any.
    fn current(&self) -> Option<String>;
}

/// A resolver backed by the session store; picks up token refreshes
/// without any client rebuild.
pub struct SessionTokenResolver {
    session: Session,
    current: Mutex<Option<String>>,
}

impl SessionTokenResolver {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            current: Mutex::new(None),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned lock only means a panic elsewhere; the value is a
        // plain Option and stays usable.
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for SessionTokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't leak the token in debug output
        f.debug_struct("SessionTokenResolver")
            .field("current", &"<redacted>")
            .finish()
    }
}

impl TokenResolver for SessionTokenResolver {
    fn resolve(&self) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>> {
        Box::pin(async {
            let token = self.session.token().await?;
            *self.lock() = token;
            Ok(())
        })
    }

    fn current(&self) -> Option<String> {
        self.lock().clone()
    }
}

/// A resolver that always returns the same fixed token. Test use mostly.
#[derive(Clone)]
pub struct StaticTokenResolver(String);

impl StaticTokenResolver {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticTokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenResolver")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TokenResolver for StaticTokenResolver {
    fn resolve(&self) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn current(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
