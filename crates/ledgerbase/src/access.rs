//! Access-mode and per-address access-policy operations.
//!
//! The gateway has no endpoint enumerating which addresses hold a policy,
//! so the set of known addresses lives in the local session registry and
//! must be kept consistent with every create/update/delete call. Reads
//! fan out one lookup per registered address and fail fast; deletes run
//! sequentially so a partial failure names the exact address that broke.

use std::sync::Arc;

use http::{Method, Request, StatusCode, header::AUTHORIZATION, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::auth::TokenResolver;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::outbound::call_outbound;
use crate::session::Session;

/// Deployment-wide default visibility preset, independent of per-address
/// policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMode {
    Public,
    PublicRead,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessPolicyType {
    AllowFullAccess,
    FieldBased,
}

/// Read/write permission for one field of an object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    pub field_name: String,
    pub read: bool,
    pub write: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRule {
    pub object_type_name: String,
    pub fields: Vec<FieldRule>,
}

/// A visibility policy for one address. `access_rules` is only populated
/// for [`AccessPolicyType::FieldBased`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
    pub policy_type: AccessPolicyType,
    #[serde(default)]
    pub access_rules: Vec<AccessRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPolicy {
    pub address: String,
    pub policy: AccessPolicy,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessModeEnvelope {
    access_mode: AccessMode,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetPoliciesRequest<'a> {
    policies: &'a [AddressPolicy],
}

/// Client for the gateway's access-control endpoints. All calls carry the
/// session bearer token.
pub struct AccessClient {
    config: GatewayConfig,
    token: Arc<dyn TokenResolver>,
}

impl AccessClient {
    pub fn new(config: GatewayConfig, token: Arc<dyn TokenResolver>) -> Self {
        Self { config, token }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<http::Response<Vec<u8>>, GatewayError> {
        self.token.resolve().await?;
        let bearer = self
            .token
            .current()
            .ok_or_else(|| GatewayError::AuthError("no session token available".to_string()))?;

        let mut builder = Request::builder()
            .method(method)
            .uri(self.config.endpoint(path)?.as_str())
            .header(AUTHORIZATION, format!("Bearer {bearer}"));
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder.body(body.unwrap_or_default())?;
        let resp = call_outbound(req).await?;

        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
            return Err(GatewayError::AuthError(format!(
                "credentials rejected with status {}",
                resp.status()
            )));
        }
        if !resp.status().is_success() {
            return Err(GatewayError::HttpError(format!(
                "access-control call failed with status {}",
                resp.status()
            )));
        }
        Ok(resp)
    }

    fn decode<T: serde::de::DeserializeOwned>(
        resp: &http::Response<Vec<u8>>,
    ) -> Result<T, GatewayError> {
        serde_json::from_slice(resp.body()).map_err(|e| GatewayError::ResponseFormatError {
            message: format!("invalid access-control response: {e}"),
            raw_response: String::from_utf8_lossy(resp.body()).into_owned(),
        })
    }

    pub async fn get_access_mode(&self, deployment_id: &str) -> Result<AccessMode, GatewayError> {
        let resp = self
            .send(
                Method::GET,
                &format!("deployments/{deployment_id}/access-mode"),
                None,
            )
            .await?;
        let envelope: AccessModeEnvelope = Self::decode(&resp)?;
        Ok(envelope.access_mode)
    }

    pub async fn set_access_mode(
        &self,
        deployment_id: &str,
        access_mode: AccessMode,
    ) -> Result<(), GatewayError> {
        let body = serde_json::to_vec(&AccessModeEnvelope { access_mode })?;
        self.send(
            Method::PUT,
            &format!("deployments/{deployment_id}/access-mode"),
            Some(body),
        )
        .await?;
        Ok(())
    }

    /// Look up the saved policy for a single address.
    pub async fn get_policy(
        &self,
        deployment_id: &str,
        address: &str,
    ) -> Result<AccessPolicy, GatewayError> {
        let resp = self
            .send(
                Method::GET,
                &format!("deployments/{deployment_id}/policies/{address}"),
                None,
            )
            .await?;
        Self::decode(&resp)
    }

    /// Read the policies for every address in the local registry.
    ///
    /// Lookups are fanned out concurrently; any failure fails the whole
    /// read with no partial results.
    pub async fn get_policies(
        &self,
        session: &Session,
        deployment_id: &str,
    ) -> Result<Vec<AddressPolicy>, GatewayError> {
        let registry = session.policy_addresses().await?;
        let mut addresses: Vec<String> =
            registry.into_keys().filter(|a| !a.is_empty()).collect();
        addresses.sort();

        let lookups = addresses
            .iter()
            .map(|address| self.get_policy(deployment_id, address));
        let policies = futures::future::try_join_all(lookups).await?;

        Ok(addresses
            .into_iter()
            .zip(policies)
            .map(|(address, policy)| AddressPolicy { address, policy })
            .collect())
    }

    /// Submit the full desired policy set and merge its addresses into the
    /// local registry.
    pub async fn set_policies(
        &self,
        session: &Session,
        deployment_id: &str,
        policies: &[AddressPolicy],
    ) -> Result<(), GatewayError> {
        let body = serde_json::to_vec(&SetPoliciesRequest { policies })?;
        self.send(
            Method::PUT,
            &format!("deployments/{deployment_id}/policies"),
            Some(body),
        )
        .await?;

        let addresses: Vec<String> = policies.iter().map(|p| p.address.clone()).collect();
        session.merge_policy_addresses(&addresses).await?;
        log::debug!("saved policies for {} address(es)", addresses.len());
        Ok(())
    }

    /// Delete the policy for each address, sequentially.
    ///
    /// The first failure aborts the remaining deletes and names the
    /// failing address; earlier deletes are not rolled back. Each
    /// successful delete immediately drops its address from the registry
    /// so local bookkeeping never trails the server.
    pub async fn delete_policies(
        &self,
        session: &Session,
        deployment_id: &str,
        addresses: &[String],
    ) -> Result<(), GatewayError> {
        for address in addresses {
            self.send(
                Method::DELETE,
                &format!("deployments/{deployment_id}/policies/{address}"),
                None,
            )
            .await
            .map_err(|e| GatewayError::PolicyDelete {
                address: address.clone(),
                message: e.to_string(),
            })?;
            session.remove_policy_address(address).await?;
            log::debug!("deleted policy for {address}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_serde_matches_wire_shape() {
        let policy = AddressPolicy {
            address: "0xaa".into(),
            policy: AccessPolicy {
                policy_type: AccessPolicyType::FieldBased,
                access_rules: vec![AccessRule {
                    object_type_name: "Todo".into(),
                    fields: vec![FieldRule {
                        field_name: "title".into(),
                        read: true,
                        write: false,
                    }],
                }],
            },
        };
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["policy"]["policyType"], "FIELD_BASED");
        assert_eq!(
            json["policy"]["accessRules"][0]["objectTypeName"],
            "Todo"
        );
        assert_eq!(
            json["policy"]["accessRules"][0]["fields"][0]["fieldName"],
            "title"
        );
    }

    #[test]
    fn full_access_policy_defaults_to_no_rules() {
        let policy: AccessPolicy =
            serde_json::from_str(r#"{"policyType":"ALLOW_FULL_ACCESS"}"#).unwrap();
        assert_eq!(policy.policy_type, AccessPolicyType::AllowFullAccess);
        assert!(policy.access_rules.is_empty());
    }

    #[test]
    fn access_mode_serde_uses_screaming_case() {
        assert_eq!(
            serde_json::to_string(&AccessMode::PublicRead).unwrap(),
            "\"PUBLIC_READ\""
        );
        assert_eq!(
            serde_json::from_str::<AccessMode>("\"PRIVATE\"").unwrap(),
            AccessMode::Private
        );
    }
}
