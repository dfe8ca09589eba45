//! Deployment provisioning and status orchestration.
//!
//! A deployment transitions to READY or FAILED exactly once. The wait is a
//! single cancellable operation: push updates are preferred when a channel
//! is supplied, with bounded-interval polling as the guaranteed fallback.
//! Cancellation is dropping the future; a superseded wait can therefore
//! never mutate state after the fact.

use std::time::Duration;

use http::{Method, Request, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use url::Url;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::outbound::call_outbound;
use crate::session::{DeploymentRecord, Session};

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployStatus {
    Pending,
    Ready,
    Failed,
}

impl DeployStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeployStatus::Ready | DeployStatus::Failed)
    }
}

/// Payload of the per-deployment `DEPLOYMENT_STATUS_UPDATE` push event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub deployment_id: String,
    pub status: DeployStatus,
}

#[derive(Serialize)]
struct DeployRequest<'a> {
    email: &'a str,
    schema: &'a str,
    schema_owner: &'a str,
    network: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeploymentResponse {
    pub deployment_id: String,
    pub contract_address: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: DeployStatus,
}

/// Client for the gateway's deployment endpoints.
pub struct DeployClient {
    config: GatewayConfig,
    poll_interval: Duration,
}

impl DeployClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Request a new deployment for `schema` owned by `owner`.
    pub async fn create_deployment(
        &self,
        owner: &str,
        schema: &str,
    ) -> Result<CreateDeploymentResponse, GatewayError> {
        let body = serde_json::to_vec(&DeployRequest {
            email: "example.com",
            schema,
            schema_owner: owner,
            network: &self.config.network,
        })?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.config.endpoint("deploy")?.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body)?;
        let resp = call_outbound(req).await?;
        if !resp.status().is_success() {
            return Err(GatewayError::DeployError(format!(
                "deploy request rejected with status {}",
                resp.status()
            )));
        }
        let parsed: CreateDeploymentResponse =
            serde_json::from_slice(resp.body()).map_err(|e| GatewayError::ResponseFormatError {
                message: format!("invalid deploy response: {e}"),
                raw_response: String::from_utf8_lossy(resp.body()).into_owned(),
            })?;
        log::info!(
            "deployment {} requested on {}",
            parsed.deployment_id,
            self.config.network
        );
        Ok(parsed)
    }

    /// Poll the current status of `deployment_id` once.
    pub async fn deployment_status(
        &self,
        deployment_id: &str,
    ) -> Result<DeployStatus, GatewayError> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(self.config.endpoint(&format!("deploy/{deployment_id}"))?.as_str())
            .body(Vec::new())?;
        let resp = call_outbound(req).await?;
        if !resp.status().is_success() {
            return Err(GatewayError::DeployError(format!(
                "status poll for {deployment_id} failed with status {}",
                resp.status()
            )));
        }
        let parsed: StatusResponse =
            serde_json::from_slice(resp.body()).map_err(|e| GatewayError::ResponseFormatError {
                message: format!("invalid status response: {e}"),
                raw_response: String::from_utf8_lossy(resp.body()).into_owned(),
            })?;
        Ok(parsed.status)
    }

    /// Wait until `deployment_id` reaches a terminal status.
    ///
    /// Push updates win when they arrive first; updates for any other
    /// deployment id are discarded, and a closed channel silently degrades
    /// the wait to pure polling.
    pub async fn await_ready(
        &self,
        deployment_id: &str,
        mut push: Option<mpsc::Receiver<StatusUpdate>>,
    ) -> Result<DeployStatus, GatewayError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick resolves immediately; spend it so a push update
        // gets a full interval to beat the first poll
        ticker.tick().await;

        loop {
            let next_update = async {
                match push.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            };
            let event = tokio::select! {
                update = next_update => Some(update),
                _ = ticker.tick() => None,
            };
            match event {
                Some(Some(update)) if update.deployment_id == deployment_id => {
                    log::debug!("push status for {deployment_id}: {:?}", update.status);
                    if update.status.is_terminal() {
                        return Ok(update.status);
                    }
                }
                Some(Some(update)) => {
                    log::debug!(
                        "discarding status update for superseded deployment {}",
                        update.deployment_id
                    );
                }
                Some(None) => {
                    log::warn!("status channel closed; falling back to polling");
                    push = None;
                }
                None => {
                    let status = self.deployment_status(deployment_id).await?;
                    log::debug!("polled status for {deployment_id}: {status:?}");
                    if status.is_terminal() {
                        return Ok(status);
                    }
                }
            }
        }
    }

    /// Resume the persisted deployment or create a new one and wait for it.
    ///
    /// Re-entering with a saved READY deployment never issues a create
    /// call. A FAILED outcome clears any partial record so a retry starts
    /// from scratch with a brand-new deployment id.
    pub async fn ensure_deployment(
        &self,
        session: &Session,
        owner: &str,
        schema: &str,
        push: Option<mpsc::Receiver<StatusUpdate>>,
    ) -> Result<DeploymentRecord, GatewayError> {
        if let Some(record) = session.deployment().await?
            && record.deployed
            && record.contract_address.is_some()
        {
            log::info!("resuming deployment {}", record.deployment_id);
            return Ok(record);
        }

        let created = self.create_deployment(owner, schema).await?;
        match self.await_ready(&created.deployment_id, push).await? {
            DeployStatus::Ready => {
                let record = DeploymentRecord {
                    deployment_id: created.deployment_id,
                    contract_address: Some(created.contract_address),
                    deployed: true,
                };
                session.set_deployment(&record).await?;
                log::info!("deployment {} is ready", record.deployment_id);
                Ok(record)
            }
            DeployStatus::Failed => {
                session.clear_deployment().await?;
                Err(GatewayError::DeployError(format!(
                    "deployment {} failed",
                    created.deployment_id
                )))
            }
            DeployStatus::Pending => Err(GatewayError::DeployError(format!(
                "wait for deployment {} ended before a terminal status",
                created.deployment_id
            ))),
        }
    }

    /// The GraphQL endpoint for a deployment.
    pub fn graphql_url(&self, deployment_id: &str) -> Result<Url, GatewayError> {
        self.config
            .endpoint(&format!("deployments/{deployment_id}/graphql"))
    }
}
