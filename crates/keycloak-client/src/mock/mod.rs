//! Mock KeycloakClient for unit testing
//!
//! This module provides a mock implementation of KeycloakClientTrait that can be used
//! in unit tests without requiring a running Keycloak instance.
//!
//! - `groups.rs` - group tree and membership operations

mod groups;

use crate::error::KeycloakError;
use crate::keycloak_trait::KeycloakClientTrait;
use crate::models::Group;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Group node of the in-memory tree
#[derive(Debug, Clone)]
pub(crate) struct MockGroup {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
}

/// Mock KeycloakClient for testing
///
/// Stores a group tree and memberships in memory. Individual operations can be forced
/// to fail with [`MockKeycloakClient::fail_on`] to exercise error paths.
#[derive(Clone)]
pub struct MockKeycloakClient {
    pub(crate) base_url: String,
    // group ID -> node
    pub(crate) groups: Arc<Mutex<BTreeMap<String, MockGroup>>>,
    // group ID -> member user IDs
    pub(crate) members: Arc<Mutex<BTreeMap<String, BTreeSet<String>>>>,
    // trait method names forced to fail
    pub(crate) failures: Arc<Mutex<HashSet<String>>>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

/// Lock a mutex, recovering the data when a panicking test poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockKeycloakClient {
    /// Create a new, empty mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            groups: Arc::new(Mutex::new(BTreeMap::new())),
            members: Arc::new(Mutex::new(BTreeMap::new())),
            failures: Arc::new(Mutex::new(HashSet::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a top-level group (for test setup), returns its ID
    pub fn add_group(&self, name: &str) -> String {
        groups::insert(self, name, None)
    }

    /// Add a child group (for test setup), returns its ID
    pub fn add_child_group(&self, parent_id: &str, name: &str) -> String {
        groups::insert(self, name, Some(parent_id.to_string()))
    }

    /// Add a membership directly (for test setup)
    pub fn add_member(&self, group_id: &str, user_id: &str) {
        lock(&self.members)
            .entry(group_id.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    /// Make every call of the named trait method fail with an API error
    pub fn fail_on(&self, operation: &str) {
        lock(&self.failures).insert(operation.to_string());
    }

    /// Group at `path` (e.g. `/acme-shop/grafana/prod-RW`), with subgroups
    pub fn group_by_path(&self, path: &str) -> Option<Group> {
        let id = groups::id_by_path(self, path)?;
        groups::representation(self, &id)
    }

    /// Member user IDs of the group at `path`, empty when the group does not exist
    pub fn members_by_path(&self, path: &str) -> Vec<String> {
        groups::id_by_path(self, path)
            .and_then(|id| lock(&self.members).get(&id).cloned())
            .map(|users| users.into_iter().collect())
            .unwrap_or_default()
    }

    /// Whether `user_id` is a member of the group at `path`
    pub fn is_member(&self, user_id: &str, path: &str) -> bool {
        self.members_by_path(path).iter().any(|user| user == user_id)
    }

    /// Number of groups currently stored
    pub fn group_count(&self) -> usize {
        lock(&self.groups).len()
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> String {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        format!("group-{}", current)
    }

    /// Fail when the operation was configured to
    pub(crate) fn check_failure(&self, operation: &str) -> Result<(), KeycloakError> {
        if lock(&self.failures).contains(operation) {
            return Err(KeycloakError::Api(format!("injected failure: {}", operation)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl KeycloakClientTrait for MockKeycloakClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn find_groups_by_name(&self, name: &str) -> Result<Vec<Group>, KeycloakError> {
        groups::find_groups_by_name(self, name).await
    }

    async fn get_group(&self, id: &str) -> Result<Group, KeycloakError> {
        groups::get_group(self, id).await
    }

    async fn create_child_group(&self, parent_id: &str, name: &str) -> Result<Group, KeycloakError> {
        groups::create_child_group(self, parent_id, name).await
    }

    async fn delete_group(&self, id: &str) -> Result<(), KeycloakError> {
        groups::delete_group(self, id).await
    }

    async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<(), KeycloakError> {
        groups::add_user_to_group(self, user_id, group_id).await
    }

    async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> Result<(), KeycloakError> {
        groups::remove_user_from_group(self, user_id, group_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_child_group_builds_paths() {
        let mock = MockKeycloakClient::new("http://test-keycloak");
        let root = mock.add_group("acme-shop");

        let grafana = mock.create_child_group(&root, "grafana").await.unwrap();
        mock.create_child_group(&grafana.id, "prod-RW").await.unwrap();

        let leaf = mock.group_by_path("/acme-shop/grafana/prod-RW").unwrap();
        assert_eq!(leaf.path.as_deref(), Some("/acme-shop/grafana/prod-RW"));
        let root_group = mock.get_group(&root).await.unwrap();
        assert_eq!(root_group.sub_groups.len(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_sibling_is_rejected() {
        let mock = MockKeycloakClient::new("http://test-keycloak");
        let root = mock.add_group("acme-shop");
        mock.create_child_group(&root, "grafana").await.unwrap();

        let result = mock.create_child_group(&root, "grafana").await;
        assert!(matches!(result, Err(KeycloakError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_search_is_substring_and_top_level() {
        let mock = MockKeycloakClient::new("http://test-keycloak");
        let root = mock.add_group("acme-shop");
        mock.add_group("acme-shop-legacy");
        mock.add_child_group(&root, "acme-shop");

        let found = mock.find_groups_by_name("acme-shop").await.unwrap();
        let names: Vec<_> = found.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["acme-shop", "acme-shop-legacy"]);
    }

    #[tokio::test]
    async fn test_delete_group_removes_subtree_and_memberships() {
        let mock = MockKeycloakClient::new("http://test-keycloak");
        let root = mock.add_group("acme-shop");
        let grafana = mock.add_child_group(&root, "grafana");
        let leaf = mock.add_child_group(&grafana, "prod-RO");
        mock.add_member(&leaf, "alice");

        mock.delete_group(&grafana).await.unwrap();

        assert_eq!(mock.group_count(), 1);
        assert!(mock.members_by_path("/acme-shop/grafana/prod-RO").is_empty());
        assert!(mock.get_group(&leaf).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_membership_is_idempotent() {
        let mock = MockKeycloakClient::new("http://test-keycloak");
        let root = mock.add_group("acme-shop");

        mock.add_user_to_group("alice", &root).await.unwrap();
        mock.add_user_to_group("alice", &root).await.unwrap();
        assert_eq!(mock.members_by_path("/acme-shop"), vec!["alice".to_string()]);

        mock.remove_user_from_group("alice", &root).await.unwrap();
        mock.remove_user_from_group("alice", &root).await.unwrap();
        assert!(!mock.is_member("alice", "/acme-shop"));
    }

    #[tokio::test]
    async fn test_fail_on_injects_errors() {
        let mock = MockKeycloakClient::new("http://test-keycloak");
        let root = mock.add_group("acme-shop");
        mock.fail_on("add_user_to_group");

        let result = mock.add_user_to_group("alice", &root).await;
        assert!(matches!(result, Err(KeycloakError::Api(_))));
    }
}
