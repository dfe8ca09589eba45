use thiserror::Error;

use crate::session::SessionStoreError;

/// Error types that can occur when interacting with the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Nonce retrieval, token exchange or credential rejection.
    #[error("Auth Error: {0}")]
    AuthError(String),

    /// The user declined the wallet signature request.
    #[error("signature request rejected by the wallet")]
    SignatureRejected,

    /// Deployment creation or status polling failure. Terminal per attempt.
    #[error("Deploy Error: {0}")]
    DeployError(String),

    /// Errors reported by the GraphQL endpoint that are not credential
    /// failures.
    #[error("GraphQL Error: {0}")]
    Graphql(String),

    /// A per-address policy delete failed. Deletes run sequentially, so
    /// addresses before `address` were already removed on the server.
    #[error("policy delete failed for {address}: {message}")]
    PolicyDelete { address: String, message: String },

    /// Errors from the local session store.
    #[error("Session Store Error: {0}")]
    Session(#[from] SessionStoreError),

    /// Errors related to malformed response bodies.
    #[error("Response Format Error: {message}. Raw response: '{raw_response}'")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },

    #[error("HTTP Error: {0}")]
    HttpError(String),

    /// Handles JSON serialization and deserialization errors.
    #[error("JSON Error")]
    JsonError(#[from] serde_json::Error),

    /// Handles errors from parsing URLs.
    #[error("Invalid URL")]
    InvalidUrl(#[from] url::ParseError),

    /// Handles standard I/O errors.
    #[error("I/O Error")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::HttpError(err.to_string())
    }
}

impl From<http::Error> for GatewayError {
    fn from(err: http::Error) -> Self {
        GatewayError::HttpError(err.to_string())
    }
}
