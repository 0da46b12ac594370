//! Plugin error types.
//!
//! This module defines the errors raised inside the Grafana projects plugin. They never
//! leave a lifecycle hook: the orchestrator turns every one of them into a KO result.

use keycloak_client::KeycloakError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur while reconciling a project.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Keycloak API error
    #[error("Keycloak error: {0}")]
    Keycloak(#[from] KeycloakError),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or missing configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A group the hierarchy depends on does not exist
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Cluster object store failure not coming from the kube client
    #[error("Cluster error: {0}")]
    Cluster(String),

    /// Several independent operations failed
    #[error("{} operation(s) failed: {}", .0.len(), .0.join("; "))]
    Aggregate(Vec<String>),

    /// A hook handler panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl PluginError {
    /// Collapse the outcome of independent operations, keeping every failure
    ///
    /// Nested aggregates are flattened so the final message lists leaf failures only.
    pub fn collect<T>(results: impl IntoIterator<Item = Result<T, PluginError>>) -> Result<Vec<T>, PluginError> {
        let mut values = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(value) => values.push(value),
                Err(PluginError::Aggregate(nested)) => failures.extend(nested),
                Err(e) => failures.push(e.to_string()),
            }
        }

        if failures.is_empty() {
            Ok(values)
        } else {
            Err(PluginError::Aggregate(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_keeps_all_failures() {
        let results = vec![
            Ok(1),
            Err(PluginError::Cluster("delete a failed".to_string())),
            Ok(2),
            Err(PluginError::GroupNotFound("/acme-shop".to_string())),
        ];

        let err = PluginError::collect(results).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("2 operation(s) failed"));
        assert!(message.contains("delete a failed"));
        assert!(message.contains("/acme-shop"));
    }

    #[test]
    fn test_collect_flattens_nested_aggregates() {
        let results: Vec<Result<(), PluginError>> = vec![
            Err(PluginError::Aggregate(vec!["a".to_string(), "b".to_string()])),
            Err(PluginError::Cluster("c".to_string())),
        ];

        match PluginError::collect(results) {
            Err(PluginError::Aggregate(failures)) => assert_eq!(failures.len(), 3),
            other => panic!("expected aggregate, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_success() {
        let results: Vec<Result<u8, PluginError>> = vec![Ok(1), Ok(2)];
        assert_eq!(PluginError::collect(results).unwrap(), vec![1, 2]);
    }
}
