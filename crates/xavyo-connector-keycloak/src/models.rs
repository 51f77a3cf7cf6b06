//! Keycloak admin API representations.
//!
//! Only `id` is required; everything else may be absent depending on the
//! Keycloak version and the service account's permissions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Capability flags the admin API reports for the calling account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccess {
    pub manage: Option<bool>,
    pub view: Option<bool>,
    pub impersonate: Option<bool>,
    pub map_roles: Option<bool>,
    pub manage_group_membership: Option<bool>,
}

/// `UserRepresentation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub created_timestamp: Option<i64>,
    #[serde(default)]
    pub access: Option<UserAccess>,
}

/// `GroupRepresentation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakGroup {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub attributes: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub sub_group_count: Option<i64>,
    #[serde(default)]
    pub sub_groups: Vec<KeycloakGroup>,
}

impl KeycloakGroup {
    /// First value of the `description` attribute, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.attributes
            .as_ref()?
            .get("description")?
            .first()
            .map(String::as_str)
    }
}
