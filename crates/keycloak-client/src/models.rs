//! Keycloak API models
//!
//! These models match the Keycloak admin REST representations.
//! See: https://www.keycloak.org/docs-api/latest/rest-api/#GroupRepresentation

use serde::{Deserialize, Serialize};

/// Group model matching Keycloak GroupRepresentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Full path, e.g. `/acme-shop/grafana/prod-RW`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Direct children; Keycloak 23+ leaves this empty unless fetched explicitly
    #[serde(default)]
    pub sub_groups: Vec<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_group_count: Option<u64>,
}

impl Group {
    /// Direct child with exactly this name
    pub fn find_sub_group(&self, name: &str) -> Option<&Group> {
        self.sub_groups.iter().find(|group| group.name == name)
    }
}

/// Token endpoint response of the OpenID Connect password grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
}

/// Body of a group creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
}
