//! Policy-form reconciliation against a mock gateway.

use std::sync::Arc;

use ledgerbase::{
    AccessClient, AccessPolicy, AccessPolicyType, AddressPolicy, GatewayConfig,
    InMemorySessionStore, Session, StaticTokenResolver,
};
use ledgerlist::policy_form::{FormPolicy, apply_policy_form};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDR_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const ADDR_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

fn saved(address: &str) -> AddressPolicy {
    AddressPolicy {
        address: address.to_string(),
        policy: AccessPolicy {
            policy_type: AccessPolicyType::AllowFullAccess,
            access_rules: Vec::new(),
        },
    }
}

fn row(address: &str) -> FormPolicy {
    FormPolicy {
        address: address.to_string(),
        policy_type: AccessPolicyType::AllowFullAccess,
        access_rules: Vec::new(),
    }
}

fn access_for(server: &MockServer) -> AccessClient {
    AccessClient::new(
        GatewayConfig::new(Url::parse(&server.uri()).unwrap()),
        Arc::new(StaticTokenResolver::new("t1")),
    )
}

async fn session_with(addresses: &[&str]) -> Session {
    let session = Session::new(Arc::new(InMemorySessionStore::new()));
    let addresses: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
    session.merge_policy_addresses(&addresses).await.unwrap();
    session
}

#[tokio::test]
async fn removed_addresses_are_deleted_before_the_update() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("/deployments/d1/policies/{ADDR_B}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/deployments/d1/policies"))
        .and(body_partial_json(json!({
            "policies": [{ "address": ADDR_A }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with(&[ADDR_A, ADDR_B]).await;
    let access = access_for(&server);
    let previous = vec![saved(ADDR_A), saved(ADDR_B)];

    apply_policy_form(&access, &session, "d1", &previous, vec![row(ADDR_A)], |removed| {
        assert_eq!(removed, [ADDR_B]);
        true
    })
    .await
    .unwrap();

    // delete first, then the update
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method.as_str(), "DELETE");
    assert_eq!(requests[1].method.as_str(), "PUT");

    let registry = session.policy_addresses().await.unwrap();
    assert!(registry.contains_key(ADDR_A));
    assert!(!registry.contains_key(ADDR_B));
}

#[tokio::test]
async fn declined_confirmation_skips_deletes_but_still_updates() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("/deployments/d1/policies/{ADDR_B}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/deployments/d1/policies"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with(&[ADDR_A, ADDR_B]).await;
    let access = access_for(&server);
    let previous = vec![saved(ADDR_A), saved(ADDR_B)];

    apply_policy_form(&access, &session, "d1", &previous, vec![row(ADDR_A)], |_| false)
        .await
        .unwrap();

    // the declined address keeps its registry entry
    assert!(
        session
            .policy_addresses()
            .await
            .unwrap()
            .contains_key(ADDR_B)
    );
}

#[tokio::test]
async fn invalid_address_fails_before_any_network_call() {
    let server = MockServer::start().await;
    let session = session_with(&[]).await;
    let access = access_for(&server);

    let err = apply_policy_form(&access, &session, "d1", &[], vec![row("0xbad")], |_| true)
        .await
        .unwrap_err();
    assert!(matches!(err, ledgerlist::AppError::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn no_removals_means_no_confirmation_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/deployments/d1/policies"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_with(&[ADDR_A]).await;
    let access = access_for(&server);

    apply_policy_form(
        &access,
        &session,
        "d1",
        &[saved(ADDR_A)],
        vec![row(ADDR_A), row(ADDR_B)],
        |_| panic!("confirm must not be called without removals"),
    )
    .await
    .unwrap();

    let registry = session.policy_addresses().await.unwrap();
    assert!(registry.contains_key(ADDR_A) && registry.contains_key(ADDR_B));
}
