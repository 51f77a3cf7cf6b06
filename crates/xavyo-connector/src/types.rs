//! Connector Framework type definitions
//!
//! The normalized resource, entitlement and grant model reported to the
//! access-governance platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::ids::ResourceId;

/// Capability a resource type advertises to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitKind {
    /// Resources of this type are people or accounts.
    User,
    /// Resources of this type are collections of principals.
    Group,
}

/// A kind of resource a connector syncs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    /// Type tag used in every [`ResourceId`] of this type.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Capabilities of this resource type.
    pub traits: Vec<TraitKind>,
}

impl ResourceType {
    /// Create a new resource type.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        traits: Vec<TraitKind>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            traits,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Account status carried in a user trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// The account can sign in.
    #[default]
    Enabled,
    /// The account is disabled in the source system.
    Disabled,
}

impl UserStatus {
    /// Map a source-system enabled flag; an unknown flag means enabled.
    #[must_use]
    pub fn from_enabled(enabled: Option<bool>) -> Self {
        match enabled {
            Some(false) => UserStatus::Disabled,
            _ => UserStatus::Enabled,
        }
    }
}

/// Trait payload for user resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTrait {
    /// Free-form profile attributes.
    pub profile: Map<String, Value>,
    /// Login name.
    pub login: String,
    /// Primary email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Account status.
    pub status: UserStatus,
    /// Account creation time in the source system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Trait payload for group resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTrait {
    /// Free-form profile attributes.
    pub profile: Map<String, Value>,
}

/// Typed trait payload attached to a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceTraits {
    User(UserTrait),
    Group(GroupTrait),
}

/// A normalized resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Type tag and stable id.
    pub id: ResourceId,
    /// Human-readable name.
    pub display_name: String,
    /// Parent resource for hierarchical placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_resource_id: Option<ResourceId>,
    /// Typed trait payload.
    pub traits: ResourceTraits,
}

impl Resource {
    /// Returns the resource type tag.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.id.resource_type
    }

    /// Returns the user trait, if this is a user resource.
    #[must_use]
    pub fn user_trait(&self) -> Option<&UserTrait> {
        match &self.traits {
            ResourceTraits::User(t) => Some(t),
            ResourceTraits::Group(_) => None,
        }
    }

    /// Returns the group trait, if this is a group resource.
    #[must_use]
    pub fn group_trait(&self) -> Option<&GroupTrait> {
        match &self.traits {
            ResourceTraits::Group(t) => Some(t),
            ResourceTraits::User(_) => None,
        }
    }
}

/// A grantable capability attached to a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Connector-defined id; connectors must be able to parse it back.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Longer description.
    pub description: String,
    /// The resource this entitlement is attached to.
    pub resource: Resource,
    /// Resource types that may hold this entitlement.
    pub grantable_to: Vec<ResourceType>,
    /// Short machine name (e.g. "membership").
    pub slug: String,
}

impl Entitlement {
    /// Returns true if principals of the given resource type may hold this
    /// entitlement.
    #[must_use]
    pub fn is_grantable_to(&self, resource_type: &str) -> bool {
        self.grantable_to.iter().any(|rt| rt.id == resource_type)
    }
}

/// An entitlement held by a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    /// Connector-defined id.
    pub id: String,
    /// The entitlement this grant instantiates.
    pub entitlement: Entitlement,
    /// The resource holding the entitlement.
    pub principal: Resource,
}

/// Static description of a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorMetadata {
    /// Display name.
    pub display_name: String,
    /// Description.
    pub description: String,
}
