//! Connect-on-demand handle to the admin client.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{AdminClient, KeycloakConfig, KeycloakCredentials, KeycloakResult};

/// Owns the lazily created [`AdminClient`].
///
/// Every operation goes through [`ClientHandle::client`], which builds and
/// connects the client the first time it is needed. The lock is held across
/// construction so concurrent first calls share a single connect.
#[derive(Debug)]
pub struct ClientHandle {
    config: KeycloakConfig,
    credentials: Arc<KeycloakCredentials>,
    client: Mutex<Option<Arc<AdminClient>>>,
}

impl ClientHandle {
    pub fn new(config: KeycloakConfig, credentials: KeycloakCredentials) -> Self {
        Self {
            config,
            credentials: Arc::new(credentials),
            client: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &KeycloakConfig {
        &self.config
    }

    /// Returns the connected client, creating and connecting it if needed.
    pub async fn client(&self) -> KeycloakResult<Arc<AdminClient>> {
        let mut slot = self.client.lock().await;

        if let Some(client) = slot.as_ref() {
            if client.is_connected().await {
                return Ok(Arc::clone(client));
            }
        }

        debug!(realm = %self.config.realm, "Connecting to Keycloak");
        let client = AdminClient::new(&self.config, Arc::clone(&self.credentials))?;
        client.connect().await?;
        info!(
            server_url = %self.config.base_url(),
            realm = %self.config.realm,
            "Connected to Keycloak"
        );

        let client = Arc::new(client);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Returns true if a connected client exists.
    pub async fn is_connected(&self) -> bool {
        match self.client.lock().await.as_ref() {
            Some(client) => client.is_connected().await,
            None => false,
        }
    }

    /// Releases the client. No-op when none exists.
    pub async fn close(&self) {
        if let Some(client) = self.client.lock().await.take() {
            client.close().await;
            info!(realm = %self.config.realm, "Keycloak client closed");
        }
    }

    /// Drops the current client and connects a fresh one.
    pub async fn reconnect(&self) -> KeycloakResult<Arc<AdminClient>> {
        self.close().await;
        self.client().await
    }
}
