//! Group membership provisioning.
//!
//! Each grant or revoke runs `Requested -> Resolving -> Applying` and ends
//! in `Committed` or `Failed`. Nothing is reported as committed unless the
//! provider accepted the membership change.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use xavyo_connector::error::ConnectorResult;
use xavyo_connector::pagination::PageToken;
use xavyo_connector::traits::GrantProvisioner;
use xavyo_connector::types::{Entitlement, Grant, Resource};

use crate::connection::ClientHandle;
use crate::config::UserIdentity;
use crate::ids::{grant_id, MembershipEntitlementId};
use crate::schema::USER_RESOURCE_TYPE;
use crate::{AdminClient, KeycloakError, KeycloakResult};

/// Stage of a provisioning operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    Requested,
    Resolving,
    Applying,
    Committed,
    Failed,
}

impl ProvisioningState {
    /// Returns true for `Committed` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ProvisioningState::Committed | ProvisioningState::Failed)
    }

    fn can_advance_to(self, next: ProvisioningState) -> bool {
        use ProvisioningState::*;
        matches!(
            (self, next),
            (Requested, Resolving)
                | (Resolving, Applying)
                | (Applying, Committed)
                | (Requested | Resolving | Applying, Failed)
        )
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisioningState::Requested => "requested",
            ProvisioningState::Resolving => "resolving",
            ProvisioningState::Applying => "applying",
            ProvisioningState::Committed => "committed",
            ProvisioningState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Tracks one grant or revoke through its states.
#[derive(Debug)]
struct Operation<'a> {
    action: &'static str,
    entitlement_id: &'a str,
    principal_id: &'a str,
    state: ProvisioningState,
}

impl<'a> Operation<'a> {
    fn new(action: &'static str, entitlement_id: &'a str, principal_id: &'a str) -> Self {
        debug!(action, entitlement_id, principal_id, "Provisioning requested");
        Self {
            action,
            entitlement_id,
            principal_id,
            state: ProvisioningState::Requested,
        }
    }

    fn advance(&mut self, next: ProvisioningState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {} -> {next}",
            self.state
        );
        debug!(
            action = self.action,
            entitlement_id = self.entitlement_id,
            from = %self.state,
            to = %next,
            "Provisioning state change"
        );
        self.state = next;
    }

    fn finish<T>(mut self, result: KeycloakResult<T>) -> KeycloakResult<T> {
        match &result {
            Ok(_) => {
                self.advance(ProvisioningState::Committed);
                info!(
                    action = self.action,
                    entitlement_id = self.entitlement_id,
                    principal_id = self.principal_id,
                    "Provisioning committed"
                );
            }
            Err(e) => {
                let failed_in = self.state;
                self.advance(ProvisioningState::Failed);
                warn!(
                    action = self.action,
                    entitlement_id = self.entitlement_id,
                    principal_id = self.principal_id,
                    failed_in = %failed_in,
                    error = %e,
                    "Provisioning failed"
                );
            }
        }
        result
    }
}

/// Maps a 404 from a membership call onto the missing side.
fn not_found(err: KeycloakError, user_id: &str, group_id: &str) -> KeycloakError {
    let group_missing = match &err {
        KeycloakError::Api {
            status: 404,
            message,
            ..
        } => Some(message.to_lowercase().contains("group")),
        _ => None,
    };

    match group_missing {
        Some(true) => KeycloakError::GroupNotFound(group_id.to_string()),
        Some(false) => KeycloakError::UserNotFound(user_id.to_string()),
        None => err,
    }
}

/// Grants and revokes group membership.
#[derive(Debug, Clone)]
pub struct Provisioner {
    handle: Arc<ClientHandle>,
}

impl Provisioner {
    pub(crate) fn new(handle: Arc<ClientHandle>) -> Self {
        Self { handle }
    }

    /// Adds the principal to the group named by the entitlement.
    #[instrument(
        skip(self, principal, entitlement),
        fields(entitlement_id = %entitlement.id, principal = %principal.id)
    )]
    pub async fn grant_membership(
        &self,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> KeycloakResult<Grant> {
        let mut op = Operation::new("grant", &entitlement.id, &principal.id.resource);
        let result = self.apply_grant(&mut op, principal, entitlement).await;
        op.finish(result)
    }

    /// Removes the grant's principal from the grant's group.
    #[instrument(skip(self, grant), fields(grant_id = %grant.id))]
    pub async fn revoke_membership(&self, grant: &Grant) -> KeycloakResult<()> {
        let mut op = Operation::new(
            "revoke",
            &grant.entitlement.id,
            &grant.principal.id.resource,
        );
        let result = self.apply_revoke(&mut op, grant).await;
        op.finish(result)
    }

    async fn apply_grant(
        &self,
        op: &mut Operation<'_>,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> KeycloakResult<Grant> {
        let entitlement_id = MembershipEntitlementId::parse(&entitlement.id)?;
        check_principal(principal, &entitlement.id)?;
        let group_id = entitlement_id.group_id();

        op.advance(ProvisioningState::Resolving);
        let client = self.handle.client().await?;
        let user_id = self.resolve_user_id(&client, principal).await?;

        op.advance(ProvisioningState::Applying);
        match client.add_user_to_group(&user_id, group_id).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                debug!(user_id = %user_id, group_id, "User is already a member");
            }
            Err(e) => return Err(not_found(e, &user_id, group_id)),
        }

        Ok(Grant {
            id: grant_id(group_id, &user_id),
            entitlement: entitlement.clone(),
            principal: principal.clone(),
        })
    }

    async fn apply_revoke(&self, op: &mut Operation<'_>, grant: &Grant) -> KeycloakResult<()> {
        let entitlement_id = MembershipEntitlementId::parse(&grant.entitlement.id)?;
        check_principal(&grant.principal, &grant.entitlement.id)?;
        let group_id = entitlement_id.group_id();

        op.advance(ProvisioningState::Resolving);
        let client = self.handle.client().await?;
        let user_id = self.resolve_user_id(&client, &grant.principal).await?;

        op.advance(ProvisioningState::Applying);
        client
            .remove_user_from_group(&user_id, group_id)
            .await
            .map_err(|e| not_found(e, &user_id, group_id))
    }

    /// Resolves a principal to its Keycloak user id.
    async fn resolve_user_id(
        &self,
        client: &AdminClient,
        principal: &Resource,
    ) -> KeycloakResult<String> {
        let id = &principal.id.resource;
        match self.handle.config().user_identity {
            UserIdentity::ProviderId => Ok(id.clone()),
            UserIdentity::Username => find_user_id_by_username(client, id).await,
        }
    }
}

fn check_principal(principal: &Resource, entitlement_id: &str) -> KeycloakResult<()> {
    if principal.id.is_type(USER_RESOURCE_TYPE) {
        return Ok(());
    }
    Err(KeycloakError::InvalidPrincipal {
        resource_type: principal.id.resource_type.clone(),
        entitlement_id: entitlement_id.to_string(),
    })
}

/// Scans the user listing for an exact, case-sensitive username match.
async fn find_user_id_by_username(client: &AdminClient, username: &str) -> KeycloakResult<String> {
    let mut token = PageToken::start();
    loop {
        let page = client.list_users(&token).await?;
        if let Some(user) = page
            .items
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
        {
            debug!(username, user_id = %user.id, "Resolved username");
            return Ok(user.id.clone());
        }
        if page.items.is_empty() || !page.has_next() {
            return Err(KeycloakError::UserNotFound(username.to_string()));
        }
        token = page.next_token();
    }
}

#[async_trait]
impl GrantProvisioner for Provisioner {
    async fn grant(
        &self,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> ConnectorResult<Vec<Grant>> {
        Ok(vec![self.grant_membership(principal, entitlement).await?])
    }

    async fn revoke(&self, grant: &Grant) -> ConnectorResult<()> {
        Ok(self.revoke_membership(grant).await?)
    }
}
