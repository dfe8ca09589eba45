//! Client SDK for a smart-contract database gateway.
//!
//! # Overview
//! This crate provides the pieces a front-end needs to operate against a
//! per-user, contract-backed database deployment:
//!
//! - Wallet-address login (nonce, signature, bearer-token exchange)
//! - Deployment provisioning with status polling and push updates
//! - A deployment-scoped GraphQL client with dispatch-time token lookup
//! - Access-mode and per-address access-policy management
//! - Durable local session storage behind a trait
//!
//! The wallet itself is an external collaborator behind [`WalletSigner`];
//! this crate never touches key material.

/// Access-mode and per-address access-policy operations
pub mod access;

/// Nonce/signature/token login flow and bearer-token resolution
pub mod auth;

/// Gateway endpoint configuration
pub mod config;

/// Deployment provisioning and status orchestration
pub mod deploy;

/// Error types and handling
pub mod error;

/// Deployment-scoped GraphQL request pipeline
pub mod graphql;

pub mod outbound;

/// Durable local session storage
pub mod session;

pub use access::{
    AccessClient, AccessMode, AccessPolicy, AccessPolicyType, AccessRule, AddressPolicy, FieldRule,
};
pub use auth::{
    AuthClient, SessionTokenResolver, StaticTokenResolver, TokenResolver, WalletSigner,
    token_is_valid,
};
pub use config::GatewayConfig;
pub use deploy::{CreateDeploymentResponse, DeployClient, DeployStatus, StatusUpdate};
pub use error::GatewayError;
pub use graphql::{AuthFailureHook, GraphqlClient};
pub use session::{
    DeploymentRecord, InMemorySessionStore, JsonFileSessionStore, Session, SessionStore,
    SessionStoreError,
};
