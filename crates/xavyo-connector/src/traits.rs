//! Connector Framework traits
//!
//! Capability-based trait definitions for sync and provisioning.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ConnectorError, ConnectorResult};
use crate::ids::ResourceId;
use crate::pagination::{Page, PageToken};
use crate::types::{ConnectorMetadata, Entitlement, Grant, Resource, ResourceType};

/// Base trait for all connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Static description of this connector.
    fn metadata(&self) -> ConnectorMetadata;

    /// Exercise the configured credentials against the target system.
    ///
    /// Implementations must perform at least one authenticated call.
    async fn validate(&self) -> ConnectorResult<()>;

    /// Release the underlying client. Safe to call when not connected.
    async fn close(&self) -> ConnectorResult<()>;

    /// One syncer per resource type this connector reports.
    fn resource_syncers(&self) -> Vec<Arc<dyn ResourceSyncer>>;
}

/// Lists the resources of one resource type along with their entitlements
/// and grants.
///
/// Every call starts from the token supplied by the caller; syncers keep no
/// traversal position of their own.
#[async_trait]
pub trait ResourceSyncer: Send + Sync {
    /// The resource type this syncer reports.
    fn resource_type(&self) -> ResourceType;

    /// List one page of resources.
    async fn list(
        &self,
        parent: Option<&ResourceId>,
        token: &PageToken,
    ) -> ConnectorResult<Page<Resource>>;

    /// List one page of entitlements attached to a resource.
    async fn entitlements(
        &self,
        resource: &Resource,
        token: &PageToken,
    ) -> ConnectorResult<Page<Entitlement>>;

    /// List one page of grants of entitlements attached to a resource.
    async fn grants(&self, resource: &Resource, token: &PageToken)
        -> ConnectorResult<Page<Grant>>;
}

/// Capability for granting and revoking entitlements.
#[async_trait]
pub trait GrantProvisioner: Send + Sync {
    /// Give `principal` the entitlement. Returns the resulting grants.
    async fn grant(
        &self,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> ConnectorResult<Vec<Grant>>;

    /// Take the entitlement of a grant away from its principal.
    async fn revoke(&self, grant: &Grant) -> ConnectorResult<()>;
}

/// Drive `list` from a fresh token until the syncer reports the last page.
///
/// Fails if a syncer hands back the token it was just called with, which
/// would otherwise loop forever.
pub async fn list_all(
    syncer: &dyn ResourceSyncer,
    parent: Option<&ResourceId>,
) -> ConnectorResult<Vec<Resource>> {
    let mut token = PageToken::start();
    let mut resources = Vec::new();

    loop {
        let page = syncer.list(parent, &token).await?;
        debug!(
            resource_type = %syncer.resource_type(),
            token = %token,
            count = page.items.len(),
            "Listed page"
        );

        let next = page.next_token();
        let exhausted = page.items.is_empty();
        resources.extend(page.items);

        if next.is_start() || exhausted {
            return Ok(resources);
        }
        if next == token {
            return Err(ConnectorError::PaginationStalled {
                token: token.to_string(),
            });
        }
        token = next;
    }
}
