//! Keycloak client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Keycloak admin API
#[derive(Debug, Error)]
pub enum KeycloakError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keycloak API returned an error
    #[error("Keycloak API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (bad admin credentials, expired token, missing role)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., duplicate group name)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl KeycloakError {
    /// Whether the error means the addressed resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, KeycloakError::NotFound(_))
    }
}
