//! Full lifecycle walks against a mock gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ledgerbase::{
    DeploymentRecord, GatewayConfig, GatewayError, InMemorySessionStore, SessionStore,
    WalletSigner,
};
use ledgerlist::{AppController, AppPhase};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OWNER: &str = "0x335cbdd25276f29f5d85db13390253a8f201ac48";

struct MockSigner;

#[async_trait]
impl WalletSigner for MockSigner {
    fn address(&self) -> &str {
        OWNER
    }

    async fn sign_message(&self, message: &str) -> Result<String, GatewayError> {
        Ok(format!("0xsig[{}]", message.len()))
    }
}

fn app_for(server: &MockServer, store: Arc<dyn SessionStore>) -> AppController {
    let config = GatewayConfig::new(Url::parse(&server.uri()).unwrap());
    AppController::new(config, store).with_poll_interval(Duration::from_millis(20))
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nonce": "n-1" })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "jwt-1" })))
        .mount(server)
        .await;
}

async fn mount_deploy(server: &MockServer, status: &str) {
    Mock::given(method("POST"))
        .and(path("/deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deployment_id": "d1",
            "contract_address": "0xABC"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deploy/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn connect_walks_to_ready() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_deploy(&server, "READY").await;

    let mut app = app_for(&server, Arc::new(InMemorySessionStore::new()));
    app.connect(&MockSigner, None).await.unwrap();

    assert_eq!(app.phase(), AppPhase::Ready);
    assert!(app.board_mut().is_some());
    assert!(app.access().is_some());
    assert_eq!(
        app.session().deployment().await.unwrap(),
        Some(DeploymentRecord {
            deployment_id: "d1".into(),
            contract_address: Some("0xABC".into()),
            deployed: true,
        })
    );
}

#[tokio::test]
async fn saved_session_resumes_without_auth_or_deploy_calls() {
    // no /auth or /deploy mocks: any network call would 404 and fail
    let server = MockServer::start().await;

    let store = Arc::new(InMemorySessionStore::new());
    let session = ledgerbase::Session::new(store.clone());
    session
        .set_token(&make_jwt(chrono::Utc::now().timestamp() + 3600))
        .await
        .unwrap();
    session
        .set_deployment(&DeploymentRecord {
            deployment_id: "d1".into(),
            contract_address: Some("0xABC".into()),
            deployed: true,
        })
        .await
        .unwrap();

    let mut app = app_for(&server, store);
    app.connect(&MockSigner, None).await.unwrap();
    assert_eq!(app.phase(), AppPhase::Ready);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_deployment_parks_in_deploy_failed() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_deploy(&server, "FAILED").await;

    let mut app = app_for(&server, Arc::new(InMemorySessionStore::new()));
    assert!(app.connect(&MockSigner, None).await.is_err());

    assert_eq!(app.phase(), AppPhase::DeployFailed);
    // the partial record is gone so a retry starts from scratch
    assert!(app.session().deployment().await.unwrap().is_none());
}

#[tokio::test]
async fn retry_after_failure_issues_a_fresh_deployment() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    // first create attempt hands out d1, which fails
    Mock::given(method("POST"))
        .and(path("/deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deployment_id": "d1",
            "contract_address": "0xABC"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deploy/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "FAILED" })))
        .mount(&server)
        .await;
    // the retry must create again and get a brand-new id
    Mock::given(method("POST"))
        .and(path("/deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deployment_id": "d2",
            "contract_address": "0xDEF"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/deploy/d2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "READY" })))
        .mount(&server)
        .await;

    let mut app = app_for(&server, Arc::new(InMemorySessionStore::new()));
    assert!(app.connect(&MockSigner, None).await.is_err());
    assert_eq!(app.phase(), AppPhase::DeployFailed);

    app.retry_deploy(&MockSigner, None).await.unwrap();
    assert_eq!(app.phase(), AppPhase::Ready);
    assert!(app.board_mut().is_some());
    // the failed id is discarded, never reused
    assert_eq!(
        app.session().deployment().await.unwrap(),
        Some(DeploymentRecord {
            deployment_id: "d2".into(),
            contract_address: Some("0xDEF".into()),
            deployed: true,
        })
    );
}

#[tokio::test]
async fn graphql_credential_failure_latches_and_logs_out() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_deploy(&server, "READY").await;
    Mock::given(method("POST"))
        .and(path("/deployments/d1/graphql"))
        .and(body_string_contains("GetTodos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{
                "message": "token expired",
                "extensions": { "code": "UNAUTHENTICATED" }
            }]
        })))
        .mount(&server)
        .await;

    let mut app = app_for(&server, Arc::new(InMemorySessionStore::new()));
    app.connect(&MockSigner, None).await.unwrap();
    assert!(!app.auth_failure_pending());

    assert!(app.board_mut().unwrap().refresh().await.is_err());
    assert!(app.auth_failure_pending());

    assert!(app.handle_auth_failure().await.unwrap());
    assert_eq!(app.phase(), AppPhase::Disconnected);
    assert!(app.board_mut().is_none());
    assert!(app.session().token().await.unwrap().is_none());

    // idempotent once resolved
    assert!(!app.handle_auth_failure().await.unwrap());
}

fn make_jwt(exp: i64) -> String {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string().as_bytes());
    format!("{header}.{payload}.signature")
}
