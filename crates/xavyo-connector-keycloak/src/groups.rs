//! Group sync and group-centric membership.
//!
//! Each group carries one membership entitlement. Grants are read from the
//! group's direct member listing, which is the only source of membership.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};
use xavyo_connector::error::{ConnectorError, ConnectorResult};
use xavyo_connector::ids::ResourceId;
use xavyo_connector::pagination::{Page, PageToken};
use xavyo_connector::traits::ResourceSyncer;
use xavyo_connector::types::{Entitlement, Grant, Resource, ResourceType};

use crate::connection::ClientHandle;
use crate::ids::grant_id;
use crate::mapper::{group_resource, membership_entitlement, user_resource};
use crate::schema::{group_resource_type, GROUP_RESOURCE_TYPE};
use crate::KeycloakError;

/// Lists Keycloak groups with their membership entitlement and grants.
#[derive(Debug, Clone)]
pub struct GroupSyncer {
    handle: Arc<ClientHandle>,
}

impl GroupSyncer {
    pub(crate) fn new(handle: Arc<ClientHandle>) -> Self {
        Self { handle }
    }
}

fn ensure_group(resource: &Resource) -> ConnectorResult<()> {
    if resource.id.is_type(GROUP_RESOURCE_TYPE) {
        return Ok(());
    }
    Err(ConnectorError::GroupNotFound {
        identifier: resource.id.to_string(),
    })
}

#[async_trait]
impl ResourceSyncer for GroupSyncer {
    fn resource_type(&self) -> ResourceType {
        group_resource_type()
    }

    #[instrument(skip(self, parent))]
    async fn list(
        &self,
        parent: Option<&ResourceId>,
        token: &PageToken,
    ) -> ConnectorResult<Page<Resource>> {
        let client = self.handle.client().await?;

        let page = client.list_groups(token).await?;
        debug!(
            count = page.items.len(),
            next = %page.next_page_token,
            "Listed groups"
        );

        Ok(page.map(|group| group_resource(&group, parent)))
    }

    async fn entitlements(
        &self,
        resource: &Resource,
        _token: &PageToken,
    ) -> ConnectorResult<Page<Entitlement>> {
        ensure_group(resource)?;
        Ok(Page::last(vec![membership_entitlement(resource)]))
    }

    #[instrument(skip(self, resource), fields(group_id = %resource.id.resource))]
    async fn grants(
        &self,
        resource: &Resource,
        _token: &PageToken,
    ) -> ConnectorResult<Page<Grant>> {
        ensure_group(resource)?;

        let client = self.handle.client().await?;
        let identity = self.handle.config().user_identity;
        let group_id = &resource.id.resource;

        let members = client
            .list_group_members(group_id)
            .await
            .map_err(|e| match e {
                e if e.is_not_found() => KeycloakError::GroupNotFound(group_id.clone()),
                e => e,
            })?;
        debug!(count = members.len(), "Listed group members");

        let entitlement = membership_entitlement(resource);
        let grants = members
            .iter()
            .map(|member| Grant {
                id: grant_id(group_id, &member.id),
                entitlement: entitlement.clone(),
                principal: user_resource(member, identity, None),
            })
            .collect();

        Ok(Page::last(grants))
    }
}
