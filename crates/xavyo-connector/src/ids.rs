//! Connector Framework ID types
//!
//! Identifiers for resources reported to the sync engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a resource by its type tag and its connector-stable id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Resource type tag (e.g. "user", "group").
    pub resource_type: String,
    /// Stable id of the resource within its type.
    pub resource: String,
}

impl ResourceId {
    /// Create a new resource id.
    pub fn new(resource_type: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource: resource.into(),
        }
    }

    /// Returns true if this id belongs to the given resource type.
    #[must_use]
    pub fn is_type(&self, resource_type: &str) -> bool {
        self.resource_type == resource_type
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.resource)
    }
}
