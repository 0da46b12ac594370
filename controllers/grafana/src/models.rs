//! Hook payloads and results.
//!
//! These types mirror the JSON exchanged with the platform orchestrator. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Console user, only the ID matters here
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
}

/// Read/write flags of a permission; independent, a user may hold both, either or neither
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Permissions {
    #[serde(default)]
    pub ro: bool,
    #[serde(default)]
    pub rw: bool,
}

/// Permission granted to a user on one environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub user_id: String,
    #[serde(default)]
    pub ro: bool,
    #[serde(default)]
    pub rw: bool,
}

/// Project environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Older payloads call this field `environment`
    #[serde(alias = "environment")]
    pub name: String,
    pub stage: String,
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
}

/// Project as sent on upsert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub environments: Vec<Environment>,
}

/// `upsertProject` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProjectArgs {
    pub organization: String,
    pub project: Project,
    pub owner: User,
}

/// `deleteProject` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProjectArgs {
    pub organization: String,
    pub project: String,
}

/// `initializeEnvironment` / `deleteEnvironment` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentArgs {
    pub organization: String,
    pub project: String,
    #[serde(default)]
    pub environments: Vec<Environment>,
    pub owner: User,
    /// Stage of the environment the event is about
    pub stage: String,
    /// Name of the environment the event is about
    #[serde(default)]
    pub environment: Option<String>,
}

/// `setEnvPermission` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionArgs {
    pub organization: String,
    pub project: String,
    pub user: User,
    pub permissions: Permissions,
    pub stage: String,
}

/// Envelope the orchestrator sends: the event arguments plus fields we do not use
#[derive(Debug, Clone, Deserialize)]
pub struct HookPayload<A> {
    pub args: A,
}

/// Outcome of a hook
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "KO")]
    Ko,
}

/// `status` part of a hook result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookStatus {
    pub result: Outcome,
    pub message: String,
}

/// Uniform result of every lifecycle hook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookResult {
    pub status: HookStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookResult {
    /// Successful result
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: HookStatus {
                result: Outcome::Ok,
                message: message.into(),
            },
            error: None,
        }
    }

    /// Failed result carrying the error detail
    pub fn ko(message: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            status: HookStatus {
                result: Outcome::Ko,
                message: message.into(),
            },
            error: Some(error.to_string()),
        }
    }

    /// Whether the hook succeeded
    pub fn is_ok(&self) -> bool {
        self.status.result == Outcome::Ok
    }
}
