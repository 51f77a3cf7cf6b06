//! Group membership provisioning tests.

mod common;

use common::*;
use std::collections::BTreeSet;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};
use xavyo_connector::error::ConnectorError;
use xavyo_connector::pagination::PageToken;
use xavyo_connector::traits::{GrantProvisioner, ResourceSyncer};
use xavyo_connector_keycloak::UserIdentity;

async fn mock_add(mock: &MockKeycloakServer, user_id: &str, group_id: &str, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("{ADMIN_PREFIX}/users/{user_id}/groups/{group_id}")))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(&mock.server)
        .await;
}

/// A username principal is resolved to its Keycloak id before the add.
#[tokio::test]
async fn test_grant_resolves_username() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;
    mock.mock_paged(
        "users",
        vec![
            create_test_user("u0", "bob"),
            create_test_user("u1", "alice"),
        ],
        300,
    )
    .await;
    mock_add(&mock, "u1", "g1", 204).await;

    let connector = mock.connector(300, UserIdentity::Username);
    let grants = connector
        .grant(&user_principal("alice"), &membership("g1"))
        .await
        .unwrap();

    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].id, "grant:g1:u1");
    assert_eq!(grants[0].entitlement.id, "group:g1:membership");
    assert_eq!(grants[0].principal.id.resource, "alice");
}

#[tokio::test]
async fn test_grant_with_provider_id_skips_resolution() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;
    mock_add(&mock, "u1", "g1", 204).await;

    let connector = mock.connector(300, UserIdentity::ProviderId);
    let grants = connector
        .grant(&user_principal("u1"), &membership("g1"))
        .await
        .unwrap();

    assert_eq!(grants[0].id, "grant:g1:u1");
}

/// Username matching is exact and case-sensitive.
#[tokio::test]
async fn test_grant_unknown_username() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;
    mock.mock_paged("users", vec![create_test_user("u1", "alice")], 300)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock.server)
        .await;

    let connector = mock.connector(300, UserIdentity::Username);
    let result = connector
        .grant(&user_principal("Alice"), &membership("g1"))
        .await;

    assert!(matches!(
        result,
        Err(ConnectorError::UserNotFound { identifier }) if identifier == "Alice"
    ));
}

/// Resolution keeps paging until the username shows up.
#[tokio::test]
async fn test_grant_resolves_username_on_later_page() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;
    let mut users = create_numbered_users(0, 4);
    users.push(create_test_user("u-alice", "alice"));
    mock.mock_paged("users", users, 2).await;
    mock_add(&mock, "u-alice", "g1", 204).await;

    let connector = mock.connector(2, UserIdentity::Username);
    let grants = connector
        .grant(&user_principal("alice"), &membership("g1"))
        .await
        .unwrap();

    assert_eq!(grants[0].id, "grant:g1:u-alice");
}

/// A malformed entitlement id fails before any request is made.
#[tokio::test]
async fn test_grant_malformed_entitlement() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint_expecting(0).await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock.server)
        .await;

    let connector = mock.connector(300, UserIdentity::ProviderId);
    let mut entitlement = membership("g1");
    entitlement.id = "g1:membership".to_string();

    let result = connector.grant(&user_principal("u1"), &entitlement).await;

    assert!(matches!(
        result,
        Err(ConnectorError::InvalidEntitlementFormat { entitlement_id })
            if entitlement_id == "g1:membership"
    ));
}

#[tokio::test]
async fn test_grant_to_group_principal_rejected() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint_expecting(0).await;

    let connector = mock.connector(300, UserIdentity::ProviderId);
    let result = connector
        .grant(&group_resource("g2", "nested"), &membership("g1"))
        .await;

    assert!(matches!(
        result,
        Err(ConnectorError::InvalidPrincipal { resource_type, .. }) if resource_type == "group"
    ));
}

/// Adding an existing member is not an error.
#[tokio::test]
async fn test_grant_existing_member() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;
    mock_add(&mock, "u1", "g1", 409).await;

    let connector = mock.connector(300, UserIdentity::ProviderId);
    let grants = connector
        .grant(&user_principal("u1"), &membership("g1"))
        .await
        .unwrap();

    assert_eq!(grants[0].id, "grant:g1:u1");
}

#[tokio::test]
async fn test_grant_missing_group() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("PUT"))
        .and(path(format!("{ADMIN_PREFIX}/users/u1/groups/gone")))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"error": "Could not find group by id"})),
        )
        .mount(&mock.server)
        .await;

    let connector = mock.connector(300, UserIdentity::ProviderId);
    let result = connector
        .grant(&user_principal("u1"), &membership("gone"))
        .await;

    assert!(matches!(
        result,
        Err(ConnectorError::GroupNotFound { identifier }) if identifier == "gone"
    ));
}

#[tokio::test]
async fn test_grant_missing_user() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;

    Mock::given(method("PUT"))
        .and(path(format!("{ADMIN_PREFIX}/users/ghost/groups/g1")))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"error": "User not found"})),
        )
        .mount(&mock.server)
        .await;

    let connector = mock.connector(300, UserIdentity::ProviderId);
    let result = connector
        .grant(&user_principal("ghost"), &membership("g1"))
        .await;

    assert!(matches!(
        result,
        Err(ConnectorError::UserNotFound { identifier }) if identifier == "ghost"
    ));
}

/// Server errors during the add are not reported as a grant.
#[tokio::test]
async fn test_grant_server_error() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;
    mock_add(&mock, "u1", "g1", 500).await;

    let connector = mock.connector(300, UserIdentity::ProviderId);
    let result = connector
        .grant(&user_principal("u1"), &membership("g1"))
        .await;

    match result {
        Err(e @ ConnectorError::Transport { .. }) => assert!(e.is_transient()),
        other => panic!("expected transport error, got {other:?}"),
    }
}

/// Grant followed by revoke leaves membership as it was.
#[tokio::test]
async fn test_grant_then_revoke_restores_membership() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;
    let state = mock
        .mock_membership_state(vec![
            create_test_user("u1", "alice"),
            create_test_user("u2", "bob"),
        ])
        .await;
    state.add("g1", "u2");
    let before = state.memberships();

    let connector = mock.connector(300, UserIdentity::ProviderId);
    let admins = group_resource("g1", "admins");
    let syncer = connector.group_syncer();

    let grants = connector
        .grant(&user_principal("u1"), &membership("g1"))
        .await
        .unwrap();
    assert_eq!(state.memberships().len(), 2);

    let synced = syncer.grants(&admins, &PageToken::start()).await.unwrap();
    let ids: BTreeSet<_> = synced.items.iter().map(|g| g.id.clone()).collect();
    assert!(ids.contains("grant:g1:u1"));
    assert!(ids.contains("grant:g1:u2"));

    connector.revoke(&grants[0]).await.unwrap();
    assert_eq!(state.memberships(), before);

    let synced = syncer.grants(&admins, &PageToken::start()).await.unwrap();
    let ids: Vec<_> = synced.items.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["grant:g1:u2"]);
}

/// Revoking a synced grant works from the grant alone.
#[tokio::test]
async fn test_revoke_synced_grant_by_username() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint().await;
    let alice = create_test_user("u1", "alice");
    mock.mock_paged("users", vec![alice.clone()], 300).await;
    let state = mock.mock_membership_state(vec![alice]).await;
    state.add("g1", "u1");

    let connector = mock.connector(300, UserIdentity::Username);
    let synced = connector
        .group_syncer()
        .grants(&group_resource("g1", "admins"), &PageToken::start())
        .await
        .unwrap();
    assert_eq!(synced.items[0].principal.id.resource, "alice");

    connector.revoke(&synced.items[0]).await.unwrap();
    assert!(state.memberships().is_empty());
}

#[tokio::test]
async fn test_revoke_malformed_grant() {
    let mock = MockKeycloakServer::new().await;
    mock.mock_token_endpoint_expecting(0).await;

    let connector = mock.connector(300, UserIdentity::ProviderId);
    let mut entitlement = membership("g1");
    entitlement.id = "user:u1:group:g1".to_string();
    let grant = xavyo_connector::types::Grant {
        id: "grant:g1:u1".to_string(),
        entitlement,
        principal: user_principal("u1"),
    };

    let result = connector.revoke(&grant).await;
    assert!(matches!(
        result,
        Err(ConnectorError::InvalidEntitlementFormat { .. })
    ));
}
