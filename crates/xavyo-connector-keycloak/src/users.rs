//! User sync.
//!
//! Membership is derived group-side, so users carry no entitlements or
//! grants of their own.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};
use xavyo_connector::error::ConnectorResult;
use xavyo_connector::ids::ResourceId;
use xavyo_connector::pagination::{Page, PageToken};
use xavyo_connector::traits::ResourceSyncer;
use xavyo_connector::types::{Entitlement, Grant, Resource, ResourceType};

use crate::connection::ClientHandle;
use crate::mapper::user_resource;
use crate::schema::user_resource_type;

/// Lists Keycloak users.
#[derive(Debug, Clone)]
pub struct UserSyncer {
    handle: Arc<ClientHandle>,
}

impl UserSyncer {
    pub(crate) fn new(handle: Arc<ClientHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl ResourceSyncer for UserSyncer {
    fn resource_type(&self) -> ResourceType {
        user_resource_type()
    }

    #[instrument(skip(self, parent))]
    async fn list(
        &self,
        parent: Option<&ResourceId>,
        token: &PageToken,
    ) -> ConnectorResult<Page<Resource>> {
        let client = self.handle.client().await?;
        let identity = self.handle.config().user_identity;

        let page = client.list_users(token).await?;
        debug!(
            count = page.items.len(),
            next = %page.next_page_token,
            "Listed users"
        );

        Ok(page.map(|user| user_resource(&user, identity, parent)))
    }

    async fn entitlements(
        &self,
        _resource: &Resource,
        _token: &PageToken,
    ) -> ConnectorResult<Page<Entitlement>> {
        Ok(Page::empty())
    }

    async fn grants(
        &self,
        _resource: &Resource,
        _token: &PageToken,
    ) -> ConnectorResult<Page<Grant>> {
        Ok(Page::empty())
    }
}
