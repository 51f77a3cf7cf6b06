//! Entitlement and grant id formats.
//!
//! Provisioning receives these ids back from the platform and parses them,
//! so the formats are part of the connector's contract:
//!
//! - entitlement: `group:<groupID>:membership`
//! - grant: `grant:<groupID>:<principalID>`

use std::fmt;
use std::str::FromStr;

use crate::schema::{GROUP_RESOURCE_TYPE, MEMBERSHIP_SLUG};
use crate::KeycloakError;

/// Id of the membership entitlement of one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MembershipEntitlementId {
    group_id: String,
}

impl MembershipEntitlementId {
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
        }
    }

    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Parses `group:<groupID>:membership`.
    pub fn parse(id: &str) -> Result<Self, KeycloakError> {
        let parts: Vec<&str> = id.split(':').collect();
        match parts.as_slice() {
            [GROUP_RESOURCE_TYPE, group_id, MEMBERSHIP_SLUG] if !group_id.is_empty() => {
                Ok(Self::new(*group_id))
            }
            _ => Err(KeycloakError::InvalidEntitlementFormat(id.to_string())),
        }
    }
}

impl fmt::Display for MembershipEntitlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{GROUP_RESOURCE_TYPE}:{}:{MEMBERSHIP_SLUG}",
            self.group_id
        )
    }
}

impl FromStr for MembershipEntitlementId {
    type Err = KeycloakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Formats the id of the grant of a group membership to a principal.
#[must_use]
pub fn grant_id(group_id: &str, principal_id: &str) -> String {
    format!("grant:{group_id}:{principal_id}")
}
