//! Application lifecycle: connect, deploy, ready, recover.
//!
//! One controller owns the whole session: it drives login, makes sure a
//! deployment exists, and hands out the board and access clients once the
//! deployment is usable. Credential failures reported by the GraphQL
//! layer are latched into a flag here and resolved by a full local
//! logout, returning the app to the disconnected phase.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ledgerbase::deploy::StatusUpdate;
use ledgerbase::{
    AccessClient, AuthClient, DeployClient, GatewayConfig, GraphqlClient, Session,
    SessionStore, SessionTokenResolver, TokenResolver, WalletSigner,
};
use tokio::sync::mpsc;

use crate::AppError;
use crate::board::BoardController;
use crate::queries::TodoQueries;
use crate::todo::TODO_SCHEMA;

/// Where the app is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppPhase {
    #[default]
    Disconnected,
    /// Waiting on the nonce/signature/token exchange.
    Authenticating,
    /// A deployment is being created or resumed.
    Deploying,
    /// Deployment READY; board and access clients are live.
    Ready,
    /// The deployment reached FAILED; a retry starts from scratch.
    DeployFailed,
}

pub struct AppController {
    config: GatewayConfig,
    session: Session,
    auth: AuthClient,
    deploy: DeployClient,
    token: Arc<SessionTokenResolver>,
    auth_failed: Arc<AtomicBool>,
    phase: AppPhase,
    board: Option<BoardController>,
    access: Option<AccessClient>,
    /// Deployment id the GraphQL client was last built for.
    built_for: Option<String>,
}

impl AppController {
    pub fn new(config: GatewayConfig, store: Arc<dyn SessionStore>) -> Self {
        let session = Session::new(store);
        Self {
            auth: AuthClient::new(config.clone()),
            deploy: DeployClient::new(config.clone()),
            token: Arc::new(SessionTokenResolver::new(session.clone())),
            auth_failed: Arc::new(AtomicBool::new(false)),
            phase: AppPhase::default(),
            board: None,
            access: None,
            built_for: None,
            session,
            config,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.deploy = self.deploy.with_poll_interval(interval);
        self
    }

    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn board_mut(&mut self) -> Option<&mut BoardController> {
        self.board.as_mut()
    }

    pub fn access(&self) -> Option<&AccessClient> {
        self.access.as_ref()
    }

    /// Walk from disconnected to ready: log in, then resume or create the
    /// deployment, then build the deployment-scoped clients.
    ///
    /// An error during the deployment wait parks the app in
    /// [`AppPhase::DeployFailed`]; any earlier error returns it to
    /// [`AppPhase::Disconnected`].
    pub async fn connect(
        &mut self,
        signer: &dyn WalletSigner,
        push: Option<mpsc::Receiver<StatusUpdate>>,
    ) -> Result<(), AppError> {
        self.phase = AppPhase::Authenticating;
        if let Err(e) = self.auth.login(signer, &self.session).await {
            self.phase = AppPhase::Disconnected;
            return Err(e.into());
        }

        self.phase = AppPhase::Deploying;
        let staged = self
            .deploy
            .ensure_deployment(&self.session, signer.address(), TODO_SCHEMA, push)
            .await
            .map_err(AppError::Gateway);
        let staged = staged.and_then(|record| {
            self.ensure_clients(&record.deployment_id)?;
            Ok(record)
        });
        match staged {
            Ok(record) => {
                self.phase = AppPhase::Ready;
                log::info!("connected on deployment {}", record.deployment_id);
                Ok(())
            }
            Err(e) => {
                self.phase = AppPhase::DeployFailed;
                Err(e)
            }
        }
    }

    /// Discard any partial deployment record and run the connect walk
    /// again with a brand-new deployment.
    pub async fn retry_deploy(
        &mut self,
        signer: &dyn WalletSigner,
        push: Option<mpsc::Receiver<StatusUpdate>>,
    ) -> Result<(), AppError> {
        self.session.clear_deployment().await.map_err(AppError::Gateway)?;
        self.built_for = None;
        self.board = None;
        self.access = None;
        self.connect(signer, push).await
    }

    /// Log out and return to the disconnected phase. Local state is
    /// dropped even when the remote logout fails.
    pub async fn disconnect(&mut self) -> Result<(), AppError> {
        self.auth.logout(&self.session).await?;
        self.reset_to_disconnected();
        Ok(())
    }

    /// Whether a GraphQL operation has reported a credential failure
    /// since the last [`handle_auth_failure`](Self::handle_auth_failure).
    pub fn auth_failure_pending(&self) -> bool {
        self.auth_failed.load(Ordering::SeqCst)
    }

    /// Resolve a latched credential failure by logging out locally.
    /// Returns `true` when a failure was pending and the session was torn
    /// down; idempotent otherwise.
    pub async fn handle_auth_failure(&mut self) -> Result<bool, AppError> {
        if !self.auth_failed.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        log::warn!("session credentials rejected; logging out");
        self.auth.logout(&self.session).await?;
        self.reset_to_disconnected();
        Ok(true)
    }

    fn reset_to_disconnected(&mut self) {
        self.board = None;
        self.access = None;
        self.built_for = None;
        self.phase = AppPhase::Disconnected;
    }

    /// Build the deployment-scoped clients, memoized on the deployment
    /// id. Token refreshes flow through the shared resolver, so a rebuilt
    /// client is only needed when the deployment itself changes.
    fn ensure_clients(&mut self, deployment_id: &str) -> Result<(), AppError> {
        if self.built_for.as_deref() == Some(deployment_id) {
            return Ok(());
        }

        let resolver: Arc<dyn TokenResolver> = self.token.clone();
        let flag = self.auth_failed.clone();
        let graphql = GraphqlClient::build(
            &self.config,
            deployment_id,
            resolver.clone(),
            Arc::new(move || {
                flag.store(true, Ordering::SeqCst);
            }),
        )
        .map_err(AppError::Gateway)?;

        self.board = Some(BoardController::new(
            TodoQueries::new(Arc::new(graphql)),
            self.config.network.clone(),
        ));
        self.access = Some(AccessClient::new(self.config.clone(), resolver));
        self.built_for = Some(deployment_id.to_string());
        Ok(())
    }
}
