//! Keycloak admin API client
//!
//! Implements the Keycloak admin REST client for group operations.
//! Based on the admin API structure: /admin/realms/{realm}/groups and
//! /admin/realms/{realm}/users/{id}/groups/{groupId}

use crate::error::KeycloakError;
use crate::keycloak_trait::KeycloakClientTrait;
use crate::models::*;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Realm holding the `admin-cli` client used for authentication
const ADMIN_REALM: &str = "master";

/// Client used for the admin password grant
const ADMIN_CLIENT_ID: &str = "admin-cli";

/// Keycloak admin API client
///
/// Holds an access token obtained once by [`KeycloakClient::connect`]. A client is meant
/// to live for the duration of one hook event, well within the token lifetime.
pub struct KeycloakClient {
    client: Client,
    base_url: String,
    realm: String,
    token: String,
}

impl KeycloakClient {
    /// Authenticate against Keycloak and create a client targeting `realm`
    ///
    /// # Arguments
    /// * `base_url` - Keycloak base URL (e.g., "https://keycloak.example.com")
    /// * `realm` - Realm whose groups are managed
    /// * `username` / `password` - Admin credentials for the `admin-cli` password grant
    pub async fn connect(
        base_url: &str,
        realm: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, KeycloakError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let token = Self::authenticate(&client, &base_url, username, password).await?;

        Ok(Self {
            client,
            base_url,
            realm: realm.to_string(),
            token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run the password grant and return the access token
    async fn authenticate(
        client: &Client,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, KeycloakError> {
        let url = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            base_url, ADMIN_REALM
        );
        debug!("Requesting Keycloak admin token for {}", username);

        let response = client
            .post(&url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", ADMIN_CLIENT_ID),
                ("username", username),
                ("password", password),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(KeycloakError::Authentication(format!(
                "Token request rejected: {} - {}",
                status, body
            )));
        }
        let response = Self::check(response, "request admin token").await?;

        let token: TokenResponse = response.json().await?;
        debug!("Keycloak admin token obtained (expires in {}s)", token.expires_in);
        Ok(token.access_token)
    }

    /// Build an admin URL for the configured realm
    fn admin_url(&self, path: &str) -> String {
        format!("{}/admin/realms/{}{}", self.base_url, self.realm, path)
    }

    /// Map a non-success response to the matching error variant
    async fn check(response: Response, action: &str) -> Result<Response, KeycloakError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("Failed to {}: {} - {}", action, status, body);
        Err(match status {
            StatusCode::NOT_FOUND => KeycloakError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                KeycloakError::Authentication(message)
            }
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                KeycloakError::InvalidRequest(message)
            }
            _ => KeycloakError::Api(message),
        })
    }

    /// Direct children of a group (Keycloak 23+ endpoint)
    async fn get_children(&self, id: &str) -> Result<Vec<Group>, KeycloakError> {
        let url = self.admin_url(&format!(
            "/groups/{}/children?briefRepresentation=false&first=0&max=1000",
            id
        ));
        debug!("GET {}", url);

        let response = self.client.get(&url).bearer_auth(&self.token).send().await?;
        let response = Self::check(response, "list child groups").await?;
        Ok(response.json().await?)
    }
}

/// Extract the ID of a created resource from its `Location` header
pub(crate) fn id_from_location(location: &str) -> Option<&str> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
}

#[async_trait::async_trait]
impl KeycloakClientTrait for KeycloakClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn find_groups_by_name(&self, name: &str) -> Result<Vec<Group>, KeycloakError> {
        let url = self.admin_url(&format!(
            "/groups?search={}&briefRepresentation=false",
            urlencoding::encode(name)
        ));
        debug!("GET {}", url);

        let response = self.client.get(&url).bearer_auth(&self.token).send().await?;
        let response = Self::check(response, "search groups").await?;
        Ok(response.json().await?)
    }

    async fn get_group(&self, id: &str) -> Result<Group, KeycloakError> {
        let url = self.admin_url(&format!("/groups/{}", id));
        debug!("GET {}", url);

        let response = self.client.get(&url).bearer_auth(&self.token).send().await?;
        let response = Self::check(response, "get group").await?;
        let mut group: Group = response.json().await?;

        // Keycloak 23+ only reports the count, children live behind a separate endpoint
        if group.sub_groups.is_empty() && group.sub_group_count.unwrap_or(0) > 0 {
            group.sub_groups = self.get_children(id).await?;
        }

        Ok(group)
    }

    async fn create_child_group(&self, parent_id: &str, name: &str) -> Result<Group, KeycloakError> {
        let url = self.admin_url(&format!("/groups/{}/children", parent_id));
        debug!("Creating group {} under {} in Keycloak", name, parent_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&NewGroup { name: name.to_string() })
            .send()
            .await?;
        let response = Self::check(response, "create child group").await?;

        let location_id = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(id_from_location)
            .map(str::to_string);

        let group = match location_id {
            Some(id) => Group {
                id,
                name: name.to_string(),
                ..Default::default()
            },
            // Older releases answer with the representation instead of a Location header
            None => {
                let body = response.text().await?;
                serde_json::from_str(&body).map_err(|e| {
                    KeycloakError::Api(format!(
                        "Created group {} but could not read its ID: {} - Response (first 500 chars): {}",
                        name,
                        e,
                        body.chars().take(500).collect::<String>()
                    ))
                })?
            }
        };

        debug!("Created group {} (ID: {})", name, group.id);
        Ok(group)
    }

    async fn delete_group(&self, id: &str) -> Result<(), KeycloakError> {
        let url = self.admin_url(&format!("/groups/{}", id));
        debug!("DELETE {}", url);

        let response = self.client.delete(&url).bearer_auth(&self.token).send().await?;
        Self::check(response, "delete group").await?;
        Ok(())
    }

    async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<(), KeycloakError> {
        let url = self.admin_url(&format!("/users/{}/groups/{}", user_id, group_id));
        debug!("PUT {}", url);

        let response = self.client.put(&url).bearer_auth(&self.token).send().await?;
        Self::check(response, "add user to group").await?;
        Ok(())
    }

    async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> Result<(), KeycloakError> {
        let url = self.admin_url(&format!("/users/{}/groups/{}", user_id, group_id));
        debug!("DELETE {}", url);

        let response = self.client.delete(&url).bearer_auth(&self.token).send().await?;
        Self::check(response, "remove user from group").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_location() {
        assert_eq!(
            id_from_location("https://kc/admin/realms/dso/groups/3f6c-11ee"),
            Some("3f6c-11ee")
        );
        assert_eq!(
            id_from_location("https://kc/admin/realms/dso/groups/3f6c-11ee/"),
            Some("3f6c-11ee")
        );
        assert_eq!(id_from_location(""), None);
    }
}
