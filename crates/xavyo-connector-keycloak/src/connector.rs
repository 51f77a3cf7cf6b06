//! Keycloak connector.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use xavyo_connector::error::ConnectorResult;
use xavyo_connector::traits::{Connector, GrantProvisioner, ResourceSyncer};
use xavyo_connector::types::{ConnectorMetadata, Entitlement, Grant, Resource};

use crate::connection::ClientHandle;
use crate::groups::GroupSyncer;
use crate::provisioning::Provisioner;
use crate::users::UserSyncer;
use crate::{KeycloakConfig, KeycloakCredentials, KeycloakResult};

const DISPLAY_NAME: &str = "Keycloak";
const DESCRIPTION: &str = "Syncs users, groups and group memberships from a Keycloak realm";

/// Connector for a single Keycloak realm.
///
/// The admin client is created and authenticated on first use; every
/// operation reconnects on demand after [`Connector::close`].
#[derive(Debug, Clone)]
pub struct KeycloakConnector {
    handle: Arc<ClientHandle>,
    provisioner: Provisioner,
}

impl KeycloakConnector {
    /// Creates a connector. No request is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or credentials are incomplete.
    pub fn new(config: KeycloakConfig, credentials: KeycloakCredentials) -> KeycloakResult<Self> {
        config.validate()?;
        credentials.validate()?;

        let handle = Arc::new(ClientHandle::new(config, credentials));
        Ok(Self {
            provisioner: Provisioner::new(Arc::clone(&handle)),
            handle,
        })
    }

    /// Creates a connector from `KEYCLOAK_*` environment variables.
    pub fn from_env() -> KeycloakResult<Self> {
        Self::new(KeycloakConfig::from_env()?, KeycloakCredentials::from_env()?)
    }

    #[must_use]
    pub fn config(&self) -> &KeycloakConfig {
        self.handle.config()
    }

    /// Returns true if an authenticated client exists.
    pub async fn is_connected(&self) -> bool {
        self.handle.is_connected().await
    }

    /// Drops the current client and authenticates a fresh one.
    #[instrument(skip(self))]
    pub async fn reconnect(&self) -> KeycloakResult<()> {
        self.handle.reconnect().await?;
        Ok(())
    }

    #[must_use]
    pub fn user_syncer(&self) -> UserSyncer {
        UserSyncer::new(Arc::clone(&self.handle))
    }

    #[must_use]
    pub fn group_syncer(&self) -> GroupSyncer {
        GroupSyncer::new(Arc::clone(&self.handle))
    }

    #[must_use]
    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }
}

#[async_trait]
impl Connector for KeycloakConnector {
    fn metadata(&self) -> ConnectorMetadata {
        ConnectorMetadata {
            display_name: DISPLAY_NAME.to_string(),
            description: DESCRIPTION.to_string(),
        }
    }

    #[instrument(skip(self), fields(realm = %self.config().realm))]
    async fn validate(&self) -> ConnectorResult<()> {
        let result = async {
            let client = self.handle.client().await?;
            client.probe().await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Keycloak credentials validated");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Keycloak validation failed");
                Err(e.into())
            }
        }
    }

    async fn close(&self) -> ConnectorResult<()> {
        self.handle.close().await;
        Ok(())
    }

    fn resource_syncers(&self) -> Vec<Arc<dyn ResourceSyncer>> {
        vec![
            Arc::new(self.user_syncer()),
            Arc::new(self.group_syncer()),
        ]
    }
}

#[async_trait]
impl GrantProvisioner for KeycloakConnector {
    async fn grant(
        &self,
        principal: &Resource,
        entitlement: &Entitlement,
    ) -> ConnectorResult<Vec<Grant>> {
        self.provisioner.grant(principal, entitlement).await
    }

    async fn revoke(&self, grant: &Grant) -> ConnectorResult<()> {
        self.provisioner.revoke(grant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xavyo_connector::error::ConnectorError;

    fn connector() -> KeycloakConnector {
        let config = KeycloakConfig::builder()
            .server_url("http://localhost:8080")
            .realm("master")
            .build()
            .unwrap();
        let credentials = KeycloakCredentials::new("xavyo-sync", "secret").unwrap();
        KeycloakConnector::new(config, credentials).unwrap()
    }

    #[test]
    fn test_metadata() {
        let metadata = connector().metadata();
        assert_eq!(metadata.display_name, "Keycloak");
        assert!(!metadata.description.is_empty());
    }

    #[test]
    fn test_resource_syncers() {
        let types: Vec<String> = connector()
            .resource_syncers()
            .iter()
            .map(|s| s.resource_type().id)
            .collect();
        assert_eq!(types, vec!["user", "group"]);
    }

    #[tokio::test]
    async fn test_close_without_client() {
        let connector = connector();
        assert!(!connector.is_connected().await);
        connector.close().await.unwrap();
        connector.close().await.unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = KeycloakConfig {
            realm: String::new(),
            ..connector().config().clone()
        };
        let credentials = KeycloakCredentials::new("xavyo-sync", "secret").unwrap();
        let err = KeycloakConnector::new(config, credentials).unwrap_err();
        assert!(matches!(
            ConnectorError::from(err),
            ConnectorError::InvalidConfiguration { .. }
        ));
    }
}
