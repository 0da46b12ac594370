//! Grafana projects plugin
//!
//! Provisions per-project Grafana instances and datasources (grafana-operator custom
//! resources) and the Keycloak groups granting access to them. Projects are split in two
//! stages, production and everything else, each with its own instance.
//!
//! - `stage`: classification of environments into stages
//! - `labels`: resource names and label selectors
//! - `builder`: `Grafana` / `GrafanaDatasource` bodies and the role mapping
//! - `reconciler`: convergence of the custom resources of a stage
//! - `groups`: Keycloak group hierarchy and memberships
//! - `lifecycle`: the hooks the orchestrator calls

pub mod builder;
pub mod cluster;
pub mod config;
pub mod error;
pub mod groups;
pub mod infos;
pub mod labels;
pub mod lifecycle;
pub mod models;
pub mod reconciler;
pub mod stage;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::PluginConfig;
pub use error::PluginError;
pub use lifecycle::Plugin;
pub use models::HookResult;
