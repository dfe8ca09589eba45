use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::GatewayError;

/// Environment variable naming the gateway base URL.
pub const ENV_BASE_URL: &str = "GATEWAY_BASE_URL";
/// Environment variable overriding the target network identifier.
pub const ENV_NETWORK: &str = "GATEWAY_NETWORK";

fn default_network() -> String {
    "polygon:mumbai".to_string()
}

/// Gateway endpoint configuration shared by every client in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway, e.g. `https://gateway.example.com/api`.
    pub base_url: Url,
    /// Chain/network identifier deployments are created on.
    #[serde(default = "default_network")]
    pub network: String,
}

impl GatewayConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            network: default_network(),
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Build a configuration from `GATEWAY_BASE_URL` and `GATEWAY_NETWORK`.
    pub fn from_env() -> Result<Self, GatewayError> {
        let raw = std::env::var(ENV_BASE_URL)
            .map_err(|_| GatewayError::HttpError(format!("{ENV_BASE_URL} is not set")))?;
        let mut config = Self::new(Url::parse(&raw)?);
        if let Ok(network) = std::env::var(ENV_NETWORK) {
            config.network = network;
        }
        Ok(config)
    }

    /// Resolve `path` against the base URL. `path` must not start with `/`.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = GatewayConfig::new(Url::parse("https://gw.example.com/api/").unwrap());
        let url = config.endpoint("deploy").unwrap();
        assert_eq!(url.as_str(), "https://gw.example.com/api/deploy");
    }

    #[test]
    fn network_defaults_to_mumbai() {
        let config = GatewayConfig::new(Url::parse("https://gw.example.com").unwrap());
        assert_eq!(config.network, "polygon:mumbai");
    }
}
