//! Durable local session state.
//!
//! [`Session`] is the explicit context object shared by every client in
//! this crate. It wraps a [`SessionStore`] and owns the key layout: a
//! bearer token, the active deployment record, and the client-side
//! registry of addresses that have a saved access policy (the gateway has
//! no enumeration endpoint, so the client must track membership itself).

mod in_memory;
mod json_file;
mod store;

pub use in_memory::InMemorySessionStore;
pub use json_file::JsonFileSessionStore;
pub use store::{SessionStore, SessionStoreError};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GatewayError;

/// Store keys, wire-compatible with the original browser client.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const DEPLOYMENT_ID: &str = "deploymentId";
    pub const CONTRACT_ADDRESS: &str = "contractAddress";
    pub const DEPLOYED: &str = "deployed";
    pub const POLICY_ADDRESSES: &str = "policyAddresses";
}

/// The persisted outcome of a deployment, as needed to resume a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployment_id: String,
    /// Present once the deployment reached READY.
    pub contract_address: Option<String>,
    pub deployed: bool,
}

/// Session context handed to each component that needs shared state.
///
/// Created on login, refreshed on token/deployment change, destroyed on
/// logout. All writes are last-writer-wins.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn token(&self) -> Result<Option<String>, GatewayError> {
        Ok(self.store.get(keys::TOKEN).await?)
    }

    pub async fn set_token(&self, token: &str) -> Result<(), GatewayError> {
        Ok(self.store.set(keys::TOKEN, token).await?)
    }

    /// Reads the persisted deployment record, if a deployment id is saved.
    pub async fn deployment(&self) -> Result<Option<DeploymentRecord>, GatewayError> {
        let Some(deployment_id) = self.store.get(keys::DEPLOYMENT_ID).await? else {
            return Ok(None);
        };
        let contract_address = self.store.get(keys::CONTRACT_ADDRESS).await?;
        let deployed = self
            .store
            .get(keys::DEPLOYED)
            .await?
            .is_some_and(|v| v == "true");
        Ok(Some(DeploymentRecord {
            deployment_id,
            contract_address,
            deployed,
        }))
    }

    pub async fn set_deployment(&self, record: &DeploymentRecord) -> Result<(), GatewayError> {
        self.store
            .set(keys::DEPLOYMENT_ID, &record.deployment_id)
            .await?;
        if let Some(address) = &record.contract_address {
            self.store.set(keys::CONTRACT_ADDRESS, address).await?;
        } else {
            self.store.remove(keys::CONTRACT_ADDRESS).await?;
        }
        self.store
            .set(keys::DEPLOYED, if record.deployed { "true" } else { "false" })
            .await?;
        Ok(())
    }

    pub async fn clear_deployment(&self) -> Result<(), GatewayError> {
        self.store.remove(keys::DEPLOYMENT_ID).await?;
        self.store.remove(keys::CONTRACT_ADDRESS).await?;
        self.store.remove(keys::DEPLOYED).await?;
        Ok(())
    }

    /// The client-side registry of addresses with a saved access policy,
    /// JSON-encoded as an address -> bool map.
    pub async fn policy_addresses(&self) -> Result<HashMap<String, bool>, GatewayError> {
        match self.store.get(keys::POLICY_ADDRESSES).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(HashMap::new()),
        }
    }

    pub async fn merge_policy_addresses(&self, addresses: &[String]) -> Result<(), GatewayError> {
        let mut registry = self.policy_addresses().await?;
        for address in addresses {
            registry.insert(address.clone(), true);
        }
        self.write_policy_addresses(&registry).await
    }

    pub async fn remove_policy_address(&self, address: &str) -> Result<(), GatewayError> {
        let mut registry = self.policy_addresses().await?;
        registry.remove(address);
        self.write_policy_addresses(&registry).await
    }

    async fn write_policy_addresses(
        &self,
        registry: &HashMap<String, bool>,
    ) -> Result<(), GatewayError> {
        let json = serde_json::to_string(registry)?;
        Ok(self.store.set(keys::POLICY_ADDRESSES, &json).await?)
    }

    /// Drops the token and deployment keys. The policy-address registry is
    /// deployment bookkeeping and survives logout, as in the original.
    pub async fn clear(&self) -> Result<(), GatewayError> {
        self.store.remove(keys::TOKEN).await?;
        self.clear_deployment().await
    }
}
