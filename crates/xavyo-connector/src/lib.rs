//! # Connector Framework
//!
//! Core abstractions for syncing identity data from external identity
//! systems into the access-governance model, and for provisioning grants
//! back into those systems.
//!
//! ## Architecture
//!
//! - [`traits::Connector`] - Base trait all connectors implement
//! - [`traits::ResourceSyncer`] - Paged listing of one resource type, its
//!   entitlements and its grants
//! - [`traits::GrantProvisioner`] - Grant and revoke entitlements
//!
//! ## Model
//!
//! A [`types::Resource`] is a user or group with a typed trait payload. An
//! [`types::Entitlement`] is a grantable capability attached to a resource,
//! and a [`types::Grant`] is an entitlement held by a principal. Grants are
//! derived from the source system on every sync; nothing is persisted here.
//!
//! ## Crate Organization
//!
//! - [`ids`] - Resource identifiers
//! - [`types`] - Resource, entitlement and grant model
//! - [`pagination`] - Page tokens and pages
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Connector capability traits

pub mod error;
pub mod ids;
pub mod pagination;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```
/// use xavyo_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::ids::ResourceId;
    pub use crate::pagination::{Page, PageToken};
    pub use crate::traits::{list_all, Connector, GrantProvisioner, ResourceSyncer};
    pub use crate::types::{
        ConnectorMetadata, Entitlement, Grant, GroupTrait, Resource, ResourceTraits,
        ResourceType, TraitKind, UserStatus, UserTrait,
    };
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
