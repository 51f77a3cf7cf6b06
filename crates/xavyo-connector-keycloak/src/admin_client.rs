//! Keycloak admin REST API client with offset pagination.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use xavyo_connector::pagination::{Page, PageToken};

use crate::models::{KeycloakGroup, KeycloakUser};
use crate::{KeycloakConfig, KeycloakCredentials, KeycloakError, KeycloakResult, TokenCache};

/// Error body returned by the admin API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

/// Extracts the human-readable message from an admin API error body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            error_message: Some(message),
            ..
        })
        | Ok(ApiErrorBody {
            error: Some(message),
            ..
        }) => message,
        _ => body.to_string(),
    }
}

/// Parses a page token into the `first` offset it encodes.
pub(crate) fn parse_offset(token: &PageToken) -> KeycloakResult<u32> {
    if token.is_start() {
        return Ok(0);
    }
    token
        .as_str()
        .parse::<u32>()
        .map_err(|_| KeycloakError::InvalidPageToken(token.to_string()))
}

/// Token for the page after one starting at `first` that returned `returned`
/// records. Empty once a page comes back empty or short.
pub(crate) fn next_offset_token(first: u32, returned: usize, page_size: u32) -> String {
    if returned == 0 || returned < page_size as usize {
        return String::new();
    }
    first.saturating_add(page_size).to_string()
}

/// Keycloak admin API client.
///
/// Every request carries a bearer token from the [`TokenCache`]. A 401 is
/// answered with one token refresh and one retry.
#[derive(Debug)]
pub struct AdminClient {
    http_client: reqwest::Client,
    tokens: TokenCache,
    admin_url: String,
    page_size: u32,
}

impl AdminClient {
    /// Creates a client that is not yet connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        config: &KeycloakConfig,
        credentials: Arc<KeycloakCredentials>,
    ) -> KeycloakResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| KeycloakError::Config(format!("Failed to create HTTP client: {e}")))?;

        let tokens = TokenCache::new(config, credentials, http_client.clone());

        Ok(Self {
            http_client,
            tokens,
            admin_url: config.admin_url(),
            page_size: config.page_size,
        })
    }

    /// Authenticates with the client credentials grant.
    pub async fn connect(&self) -> KeycloakResult<()> {
        self.tokens.connect().await
    }

    /// Drops the access token.
    pub async fn close(&self) {
        self.tokens.disconnect().await;
    }

    /// Returns true if a token has been acquired.
    pub async fn is_connected(&self) -> bool {
        self.tokens.is_connected().await
    }

    /// Records requested per page.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Lists one page of users starting at the offset in `token`.
    #[instrument(skip(self))]
    pub async fn list_users(&self, token: &PageToken) -> KeycloakResult<Page<KeycloakUser>> {
        let first = parse_offset(token)?;
        let url = format!("{}/users", self.admin_url);
        let context = format!("list users (first={first})");

        let users: Vec<KeycloakUser> = self
            .get_json(&context, &url, &self.page_query(first, self.page_size, false))
            .await?;

        debug!("Fetched {} users", users.len());
        let next = next_offset_token(first, users.len(), self.page_size);
        Ok(Page::new(users, next))
    }

    /// Lists one page of top-level groups starting at the offset in `token`.
    #[instrument(skip(self))]
    pub async fn list_groups(&self, token: &PageToken) -> KeycloakResult<Page<KeycloakGroup>> {
        let first = parse_offset(token)?;
        let url = format!("{}/groups", self.admin_url);
        let context = format!("list groups (first={first})");

        let groups: Vec<KeycloakGroup> = self
            .get_json(&context, &url, &self.page_query(first, self.page_size, false))
            .await?;

        debug!("Fetched {} groups", groups.len());
        let next = next_offset_token(first, groups.len(), self.page_size);
        Ok(Page::new(groups, next))
    }

    /// Lists all direct members of a group.
    #[instrument(skip(self))]
    pub async fn list_group_members(&self, group_id: &str) -> KeycloakResult<Vec<KeycloakUser>> {
        let url = format!(
            "{}/groups/{}/members",
            self.admin_url,
            urlencoding::encode(group_id)
        );
        self.get_all(&format!("list members of group {group_id}"), &url)
            .await
    }

    /// Lists all groups a user directly belongs to.
    #[instrument(skip(self))]
    pub async fn list_user_groups(&self, user_id: &str) -> KeycloakResult<Vec<KeycloakGroup>> {
        let url = format!(
            "{}/users/{}/groups",
            self.admin_url,
            urlencoding::encode(user_id)
        );
        self.get_all(&format!("list groups of user {user_id}"), &url)
            .await
    }

    /// Adds a user to a group.
    #[instrument(skip(self))]
    pub async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> KeycloakResult<()> {
        let url = self.membership_url(user_id, group_id);
        let context = format!("add user {user_id} to group {group_id}");
        self.send(&context, |token| self.http_client.put(&url).bearer_auth(token))
            .await?;
        Ok(())
    }

    /// Removes a user from a group.
    #[instrument(skip(self))]
    pub async fn remove_user_from_group(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> KeycloakResult<()> {
        let url = self.membership_url(user_id, group_id);
        let context = format!("remove user {user_id} from group {group_id}");
        self.send(&context, |token| self.http_client.delete(&url).bearer_auth(token))
            .await?;
        Ok(())
    }

    /// Performs a minimal authenticated listing.
    #[instrument(skip(self))]
    pub async fn probe(&self) -> KeycloakResult<()> {
        let url = format!("{}/users", self.admin_url);
        let _: Vec<serde_json::Value> = self
            .get_json("probe users", &url, &self.page_query(0, 1, true))
            .await?;
        Ok(())
    }

    fn membership_url(&self, user_id: &str, group_id: &str) -> String {
        format!(
            "{}/users/{}/groups/{}",
            self.admin_url,
            urlencoding::encode(user_id),
            urlencoding::encode(group_id)
        )
    }

    fn page_query(&self, first: u32, max: u32, brief: bool) -> Vec<(&'static str, String)> {
        vec![
            ("first", first.to_string()),
            ("max", max.to_string()),
            ("briefRepresentation", brief.to_string()),
        ]
    }

    /// Fetches every page of an offset-paged collection.
    async fn get_all<T: DeserializeOwned>(
        &self,
        context: &str,
        url: &str,
    ) -> KeycloakResult<Vec<T>> {
        let mut first = 0u32;
        let mut all = Vec::new();

        loop {
            let page: Vec<T> = self
                .get_json(context, url, &self.page_query(first, self.page_size, false))
                .await?;
            let returned = page.len();
            all.extend(page);

            let next = next_offset_token(first, returned, self.page_size);
            if next.is_empty() {
                return Ok(all);
            }
            first = first.saturating_add(self.page_size);
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        context: &str,
        url: &str,
        query: &[(&'static str, String)],
    ) -> KeycloakResult<T> {
        let response = self
            .send(context, |token| {
                self.http_client.get(url).bearer_auth(token).query(query)
            })
            .await?;

        let body = response
            .text()
            .await
            .map_err(|e| KeycloakError::transport(context, e))?;

        serde_json::from_str(&body).map_err(|e| KeycloakError::decode(context, e))
    }

    /// Sends a request built by `build` with the current token.
    async fn send<F>(&self, context: &str, build: F) -> KeycloakResult<reqwest::Response>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let token = self.tokens.get_token().await?;
        let mut response = build(&token)
            .send()
            .await
            .map_err(|e| KeycloakError::transport(context, e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Access token rejected during {}, re-authenticating", context);
            let token = self.tokens.refresh(&token).await?;
            response = build(&token)
                .send()
                .await
                .map_err(|e| KeycloakError::transport(context, e))?;

            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(KeycloakError::Auth(format!(
                    "{context} rejected after token refresh"
                )));
            }
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(KeycloakError::Api {
            context: context.to_string(),
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}
