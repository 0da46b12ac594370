//! Grafana instance reconciliation

use super::{Convergence, Reconciler};
use crate::builder::build_grafana_instance;
use crate::error::PluginError;
use crate::labels::{BaseParams, ResourceLabels};
use tracing::info;

impl Reconciler {
    /// Ensure exactly one correctly named Grafana instance exists for `params`
    pub async fn ensure_grafana_instance(
        &self,
        params: &BaseParams,
        role_attribute_path: &str,
    ) -> Result<Convergence, PluginError> {
        let desired = build_grafana_instance(&self.config, params, role_attribute_path);
        let selector = ResourceLabels::instance(params).selector();
        Self::converge(self.instances.as_ref(), &selector, &desired).await
    }

    /// Delete every Grafana instance of `params`
    pub async fn delete_grafana_instance(&self, params: &BaseParams) -> Result<(), PluginError> {
        let selector = ResourceLabels::instance(params).selector();
        let deleted = Self::delete_matching(self.instances.as_ref(), &selector).await?;
        if deleted > 0 {
            info!("Deleted {} Grafana instance(s) of {}", deleted, params);
        }
        Ok(())
    }
}
