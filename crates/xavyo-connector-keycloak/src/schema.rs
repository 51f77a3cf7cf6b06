//! Resource types reported by the Keycloak connector.

use xavyo_connector::types::{ResourceType, TraitKind};

/// Resource type tag for users.
pub const USER_RESOURCE_TYPE: &str = "user";

/// Resource type tag for groups.
pub const GROUP_RESOURCE_TYPE: &str = "group";

/// Slug of the single entitlement groups carry.
pub const MEMBERSHIP_SLUG: &str = "membership";

#[must_use]
pub fn user_resource_type() -> ResourceType {
    ResourceType::new(USER_RESOURCE_TYPE, "User", vec![TraitKind::User])
}

#[must_use]
pub fn group_resource_type() -> ResourceType {
    ResourceType::new(GROUP_RESOURCE_TYPE, "Group", vec![TraitKind::Group])
}
