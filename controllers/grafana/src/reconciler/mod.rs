//! Convergence of Grafana custom resources.
//!
//! Objects are found by label selector, never by name alone, so renamed or duplicated
//! objects are picked up and healed:
//! - `instance`: the `Grafana` instance of a stage
//! - `datasource`: the Prometheus and Alertmanager `GrafanaDatasource`s of a stage

mod datasource;
mod instance;
#[cfg(test)]
mod reconciler_test;

use crate::builder::build_role_attribute_path;
use crate::cluster::ObjectStore;
use crate::config::PluginConfig;
use crate::error::PluginError;
use crate::labels::{BaseParams, DatasourceKind};
use crds::{Grafana, GrafanaDatasource};
use futures::future::join_all;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What [`Reconciler::converge`] did to reach the desired object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Created,
    Patched,
    /// Stale or duplicate objects were deleted before creating the desired one
    Recreated { deleted: usize },
}

/// Reconciles the Grafana resources of a project stage.
pub struct Reconciler {
    pub(crate) config: Arc<PluginConfig>,
    pub(crate) instances: Box<dyn ObjectStore<Grafana>>,
    pub(crate) datasources: Box<dyn ObjectStore<GrafanaDatasource>>,
}

impl Reconciler {
    /// Reconciler writing through the given stores
    pub fn new(
        config: Arc<PluginConfig>,
        instances: Box<dyn ObjectStore<Grafana>>,
        datasources: Box<dyn ObjectStore<GrafanaDatasource>>,
    ) -> Self {
        Self {
            config,
            instances,
            datasources,
        }
    }

    /// Bring the stage to its desired state: instance first, then both datasources
    pub async fn ensure_stage(&self, params: &BaseParams) -> Result<(), PluginError> {
        let role_attribute_path = build_role_attribute_path(&params.group_root(), params.stage);
        self.ensure_grafana_instance(params, &role_attribute_path).await?;

        let results = join_all(
            DatasourceKind::ALL
                .into_iter()
                .map(|kind| self.ensure_datasource(params, kind)),
        )
        .await;
        PluginError::collect(results)?;

        info!("Grafana resources of {} are up to date", params);
        Ok(())
    }

    /// Remove every Grafana resource of the stage; both deletions are always attempted
    pub async fn delete_stage(&self, params: &BaseParams) -> Result<(), PluginError> {
        let (datasources, instance) = futures::join!(
            self.delete_all_datasources(params),
            self.delete_grafana_instance(params)
        );
        PluginError::collect([datasources, instance])?;

        info!("Grafana resources of {} are deleted", params);
        Ok(())
    }

    /// Converge the objects selected by `selector` to exactly `desired`
    ///
    /// - one object with the desired name: merge-patch its labels and spec
    /// - none: create
    /// - anything else: delete every match, then create
    pub(crate) async fn converge<K>(
        store: &dyn ObjectStore<K>,
        selector: &str,
        desired: &K,
    ) -> Result<Convergence, PluginError>
    where
        K: Resource + Serialize + Send + Sync + 'static,
    {
        let name = desired.name_any();
        let existing = store.list(selector).await?;

        match existing.as_slice() {
            [] => {
                store.create(desired).await?;
                info!("Created {}", name);
                Ok(Convergence::Created)
            }
            [current] if current.name_any() == name => {
                store.patch(&name, &merge_body(desired)?).await?;
                debug!("Patched {}", name);
                Ok(Convergence::Patched)
            }
            stale => {
                let names: Vec<String> = stale.iter().map(|object| object.name_any()).collect();
                warn!(
                    "Found {} object(s) for {} instead of one named {}: {:?}, recreating",
                    names.len(),
                    selector,
                    name,
                    names
                );
                Self::delete_named(store, &names).await?;
                store.create(desired).await?;
                info!("Created {}", name);
                Ok(Convergence::Recreated { deleted: names.len() })
            }
        }
    }

    /// Delete every object matching `selector`, returning how many were found
    pub(crate) async fn delete_matching<K>(store: &dyn ObjectStore<K>, selector: &str) -> Result<usize, PluginError>
    where
        K: Resource + Send + Sync + 'static,
    {
        let names: Vec<String> = store
            .list(selector)
            .await?
            .iter()
            .map(|object| object.name_any())
            .collect();
        if names.is_empty() {
            debug!("Nothing to delete for {}", selector);
            return Ok(0);
        }

        Self::delete_named(store, &names).await?;
        Ok(names.len())
    }

    async fn delete_named<K>(store: &dyn ObjectStore<K>, names: &[String]) -> Result<(), PluginError>
    where
        K: Send + Sync + 'static,
    {
        let results = join_all(names.iter().map(|name| async move {
            store.delete(name).await?;
            info!("Deleted {}", name);
            Ok::<(), PluginError>(())
        }))
        .await;
        PluginError::collect(results).map(|_| ())
    }
}

/// Merge-patch body carrying the labels and spec of `desired`
fn merge_body<K: Resource + Serialize>(desired: &K) -> Result<serde_json::Value, PluginError> {
    let body = serde_json::to_value(desired)?;
    Ok(serde_json::json!({
        "metadata": { "labels": desired.meta().labels },
        "spec": body.get("spec").cloned().unwrap_or_else(|| serde_json::json!({})),
    }))
}
