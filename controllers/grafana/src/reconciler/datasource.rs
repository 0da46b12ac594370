//! GrafanaDatasource reconciliation

use super::{Convergence, Reconciler};
use crate::builder::build_datasource;
use crate::error::PluginError;
use crate::labels::{BaseParams, DatasourceKind, ResourceLabels};
use tracing::info;

impl Reconciler {
    /// Ensure exactly one correctly named `kind` datasource exists for `params`
    pub async fn ensure_datasource(&self, params: &BaseParams, kind: DatasourceKind) -> Result<Convergence, PluginError> {
        let desired = build_datasource(&self.config, params, kind, &params.datasource_name(kind));
        let selector = ResourceLabels::datasource(params, kind).selector();
        Self::converge(self.datasources.as_ref(), &selector, &desired).await
    }

    /// Delete the datasources of every kind for `params`
    pub async fn delete_all_datasources(&self, params: &BaseParams) -> Result<(), PluginError> {
        // The instance label set has no `source` label, so it selects both kinds
        let selector = ResourceLabels::instance(params).selector();
        let deleted = Self::delete_matching(self.datasources.as_ref(), &selector).await?;
        if deleted > 0 {
            info!("Deleted {} datasource(s) of {}", deleted, params);
        }
        Ok(())
    }
}
