//! KeycloakClient trait for mocking
//!
//! This trait abstracts the KeycloakClient to enable mocking in unit tests.
//! The concrete KeycloakClient implements this trait, and tests can use mock implementations.

use crate::error::KeycloakError;
use crate::models::Group;

/// Trait for Keycloak admin API operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait KeycloakClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Top-level groups whose name contains `name` (Keycloak search semantics, not exact)
    async fn find_groups_by_name(&self, name: &str) -> Result<Vec<Group>, KeycloakError>;

    /// Group by ID with its direct subgroups populated
    async fn get_group(&self, id: &str) -> Result<Group, KeycloakError>;

    /// Create a child group under `parent_id`
    async fn create_child_group(&self, parent_id: &str, name: &str) -> Result<Group, KeycloakError>;

    /// Delete a group and its whole subtree
    async fn delete_group(&self, id: &str) -> Result<(), KeycloakError>;

    /// Add a user to a group (no-op when already a member)
    async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<(), KeycloakError>;

    /// Remove a user from a group (no-op when not a member)
    async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> Result<(), KeycloakError>;
}
