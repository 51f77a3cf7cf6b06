//! Common test utilities for xavyo-connector-keycloak integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use xavyo_connector::ids::ResourceId;
use xavyo_connector::types::{
    Entitlement, GroupTrait, Resource, ResourceTraits, UserTrait,
};
use xavyo_connector_keycloak::{
    membership_entitlement, KeycloakConfig, KeycloakConnector, KeycloakCredentials, UserIdentity,
};

pub const REALM: &str = "test";
pub const ADMIN_PREFIX: &str = "/admin/realms/test";
pub const TOKEN_PATH: &str = "/realms/test/protocol/openid-connect/token";

/// Test data factory for Keycloak users.
pub fn create_test_user(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "createdTimestamp": 1_699_318_915_000_i64,
        "username": username,
        "enabled": true,
        "emailVerified": true,
        "firstName": "Test",
        "lastName": "User",
        "email": format!("{username}@example.com"),
    })
}

/// Test data factory for disabled Keycloak users.
pub fn create_disabled_user(id: &str, username: &str) -> Value {
    let mut user = create_test_user(id, username);
    user["enabled"] = json!(false);
    user
}

/// `count` users with ids `user-<n>` and usernames `user<n>`, numbered from `start`.
pub fn create_numbered_users(start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|i| create_test_user(&format!("user-{i}"), &format!("user{i}")))
        .collect()
}

/// Test data factory for Keycloak groups.
pub fn create_test_group(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "path": format!("/{name}"),
        "attributes": {"description": [format!("Test group: {name}")]},
        "subGroupCount": 0,
        "subGroups": []
    })
}

/// Creates a mock token response.
pub fn create_token_response(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "expires_in": expires_in,
        "refresh_expires_in": 0,
        "token_type": "Bearer",
        "not-before-policy": 0,
        "scope": "profile email"
    })
}

/// User principal resource with the given id.
pub fn user_principal(id: &str) -> Resource {
    Resource {
        id: ResourceId::new("user", id),
        display_name: id.to_string(),
        parent_resource_id: None,
        traits: ResourceTraits::User(UserTrait {
            login: id.to_string(),
            ..UserTrait::default()
        }),
    }
}

/// Group resource with the given id and name.
pub fn group_resource(id: &str, name: &str) -> Resource {
    Resource {
        id: ResourceId::new("group", id),
        display_name: name.to_string(),
        parent_resource_id: None,
        traits: ResourceTraits::Group(GroupTrait::default()),
    }
}

/// Membership entitlement of the given group.
pub fn membership(group_id: &str) -> Entitlement {
    membership_entitlement(&group_resource(group_id, group_id))
}

/// Mock server wrapper with common setup helpers.
pub struct MockKeycloakServer {
    pub server: MockServer,
}

impl MockKeycloakServer {
    /// Creates a new mock Keycloak server.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Returns the mock server's base URL.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Configuration pointing at this server.
    pub fn config(&self, page_size: u32, user_identity: UserIdentity) -> KeycloakConfig {
        KeycloakConfig::builder()
            .server_url(self.url())
            .realm(REALM)
            .page_size(page_size)
            .request_timeout_secs(5)
            .user_identity(user_identity)
            .build()
            .unwrap()
    }

    /// Connector pointing at this server.
    pub fn connector(&self, page_size: u32, user_identity: UserIdentity) -> KeycloakConnector {
        let credentials = KeycloakCredentials::new("xavyo-sync", "test-secret").unwrap();
        KeycloakConnector::new(self.config(page_size, user_identity), credentials).unwrap()
    }

    /// Sets up the token endpoint.
    pub async fn mock_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_token_response("mock-access-token", 300)),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up a token endpoint that must be called exactly `times` times.
    pub async fn mock_token_endpoint_expecting(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_token_response("mock-access-token", 300)),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answers the one-record listing `validate` performs.
    pub async fn mock_probe(&self) {
        Mock::given(method("GET"))
            .and(path(format!("{ADMIN_PREFIX}/users")))
            .and(query_param("max", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&self.server)
            .await;
    }

    /// Serves `items` from `resource` (e.g. "users") in pages of `page_size`,
    /// including a trailing empty page when the last page is full.
    pub async fn mock_paged(&self, resource: &str, items: Vec<Value>, page_size: usize) {
        let mut first = 0;
        loop {
            let end = std::cmp::min(first + page_size, items.len());
            let page = items[first.min(items.len())..end].to_vec();
            let returned = page.len();

            Mock::given(method("GET"))
                .and(path(format!("{ADMIN_PREFIX}/{resource}")))
                .and(query_param("first", first.to_string()))
                .and(query_param("max", page_size.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(page)))
                .expect(1)
                .mount(&self.server)
                .await;

            if returned < page_size {
                return;
            }
            first += page_size;
        }
    }

    /// Sets up the member listing of a group.
    pub async fn mock_group_members(&self, group_id: &str, members: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(format!("{ADMIN_PREFIX}/groups/{group_id}/members")))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(members)))
            .mount(&self.server)
            .await;
    }

    /// Serves membership changes and member listings from a shared state.
    pub async fn mock_membership_state(&self, users: Vec<Value>) -> MembershipState {
        let state = MembershipState {
            users,
            members: Arc::new(Mutex::new(BTreeSet::new())),
        };

        Mock::given(method("PUT"))
            .and(path_regex(format!("^{ADMIN_PREFIX}/users/[^/]+/groups/[^/]+$")))
            .respond_with(state.clone())
            .mount(&self.server)
            .await;
        Mock::given(method("DELETE"))
            .and(path_regex(format!("^{ADMIN_PREFIX}/users/[^/]+/groups/[^/]+$")))
            .respond_with(state.clone())
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(format!("^{ADMIN_PREFIX}/groups/[^/]+/members$")))
            .respond_with(state.clone())
            .mount(&self.server)
            .await;

        state
    }
}

/// In-memory group membership for a fake Keycloak realm.
#[derive(Clone)]
pub struct MembershipState {
    users: Vec<Value>,
    members: Arc<Mutex<BTreeSet<(String, String)>>>,
}

impl MembershipState {
    /// Current (group id, user id) pairs.
    pub fn memberships(&self) -> BTreeSet<(String, String)> {
        self.members.lock().unwrap().clone()
    }

    pub fn add(&self, group_id: &str, user_id: &str) {
        self.members
            .lock()
            .unwrap()
            .insert((group_id.to_string(), user_id.to_string()));
    }
}

impl Respond for MembershipState {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let segments: Vec<&str> = request
            .url
            .path()
            .trim_start_matches(ADMIN_PREFIX)
            .trim_start_matches('/')
            .split('/')
            .collect();
        let mut members = self.members.lock().unwrap();

        match (request.method.as_str(), segments.as_slice()) {
            ("PUT", ["users", user_id, "groups", group_id]) => {
                members.insert((group_id.to_string(), user_id.to_string()));
                ResponseTemplate::new(204)
            }
            ("DELETE", ["users", user_id, "groups", group_id]) => {
                members.remove(&(group_id.to_string(), user_id.to_string()));
                ResponseTemplate::new(204)
            }
            ("GET", ["groups", group_id, "members"]) => {
                let listed: Vec<Value> = self
                    .users
                    .iter()
                    .filter(|u| {
                        let user_id = u["id"].as_str().unwrap_or_default();
                        members.contains(&(group_id.to_string(), user_id.to_string()))
                    })
                    .cloned()
                    .collect();
                ResponseTemplate::new(200).set_body_json(Value::Array(listed))
            }
            _ => ResponseTemplate::new(405),
        }
    }
}
