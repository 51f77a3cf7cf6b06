//! Keycloak Connector for xavyo
//!
//! This crate implements the xavyo-connector traits for Keycloak, syncing a
//! realm's users, groups and group memberships through the admin REST API and
//! provisioning group membership back into it.
//!
//! # Features
//!
//! - `OAuth2` client credentials authentication with a cached, expiring token
//! - Offset-paged user and group listing
//! - Group-centric membership: one `membership` entitlement per group, one
//!   grant per direct member
//! - Grant and revoke of group membership
//!
//! # Example
//!
//! ```no_run
//! use xavyo_connector::traits::{list_all, Connector};
//! use xavyo_connector_keycloak::{KeycloakConfig, KeycloakConnector, KeycloakCredentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = KeycloakConfig::builder()
//!     .server_url("https://sso.example.com")
//!     .realm("corp")
//!     .build()?;
//!
//! let credentials = KeycloakCredentials::new("xavyo-sync", "client-secret")?;
//!
//! let connector = KeycloakConnector::new(config, credentials)?;
//! connector.validate().await?;
//!
//! for syncer in connector.resource_syncers() {
//!     let resources = list_all(syncer.as_ref(), None).await?;
//!     println!("{}: {}", syncer.resource_type(), resources.len());
//! }
//! # Ok(())
//! # }
//! ```

mod admin_client;
mod auth;
mod config;
mod connection;
mod connector;
mod error;
mod groups;
mod ids;
mod mapper;
mod models;
mod provisioning;
mod schema;
mod users;

// Re-exports
pub use admin_client::AdminClient;
pub use auth::TokenCache;
pub use config::{KeycloakConfig, KeycloakConfigBuilder, KeycloakCredentials, UserIdentity};
pub use connector::KeycloakConnector;
pub use error::{KeycloakError, KeycloakResult};
pub use groups::GroupSyncer;
pub use ids::{grant_id, MembershipEntitlementId};
pub use mapper::{group_resource, membership_entitlement, user_resource, user_resource_id};
pub use models::{KeycloakGroup, KeycloakUser, UserAccess};
pub use provisioning::{Provisioner, ProvisioningState};
pub use schema::{
    group_resource_type, user_resource_type, GROUP_RESOURCE_TYPE, MEMBERSHIP_SLUG,
    USER_RESOURCE_TYPE,
};
pub use users::UserSyncer;
