//! Resource identity: names and labels.
//!
//! `BaseParams` is the deterministic key of every object the plugin owns. The label set
//! is fixed and enumerated by `ResourceLabels`, so a selector can never silently miss a
//! label.

use crate::stage::Stage;
use std::collections::BTreeMap;
use std::fmt;

/// Owner label of every managed object
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY: &str = "dso-console";
/// Organization name
pub const ORGANIZATION_LABEL: &str = "dso.organization";
/// Project name
pub const PROJECT_LABEL: &str = "dso.project";
/// Short stage label, `prod` or `hprod`
pub const STAGE_LABEL: &str = "dso.stage";
/// Datasource kind, only on datasources
pub const SOURCE_LABEL: &str = "dso.source";
/// Label datasources use to select their Grafana instance
pub const APP_LABEL: &str = "app";
/// Dashboard set label of Grafana instances
pub const DASHBOARDS_LABEL: &str = "dashboards";

/// Project coordinates shared by both stages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    /// Organization name
    pub organization: String,
    /// Project name
    pub project: String,
}

impl ProjectRef {
    /// Reference to `project` of `organization`
    pub fn new(organization: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
        }
    }

    /// Name of the project root group in Keycloak
    pub fn group_root(&self) -> String {
        format!("{}-{}", self.organization, self.project)
    }

    /// Resource key of this project on `stage`
    pub fn stage(&self, stage: Stage) -> BaseParams {
        BaseParams::new(self.organization.clone(), self.project.clone(), stage)
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.project)
    }
}

/// (organization, project, stage) key of a set of Grafana resources
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseParams {
    /// Organization name
    pub organization: String,
    /// Project name
    pub project: String,
    /// Stage the resources serve
    pub stage: Stage,
}

impl BaseParams {
    /// Key of the `stage` resources of a project
    pub fn new(organization: impl Into<String>, project: impl Into<String>, stage: Stage) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            stage,
        }
    }

    /// Name of the Grafana instance, also its route path and `app` label
    pub fn instance_name(&self) -> String {
        format!("{}-{}-{}", self.organization, self.project, self.stage)
    }

    pub fn group_root(&self) -> String {
        self.project_ref().group_root()
    }

    pub fn project_ref(&self) -> ProjectRef {
        ProjectRef::new(self.organization.clone(), self.project.clone())
    }

    pub fn datasource_name(&self, kind: DatasourceKind) -> String {
        format!("datasource-{}-{}", kind.name_prefix(), self.instance_name())
    }

    /// Tenant ID the metrics backend scopes queries with
    pub fn tenant(&self) -> String {
        format!("{}-{}", self.stage, self.project)
    }
}

impl fmt::Display for BaseParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.organization, self.project, self.stage)
    }
}

/// Datasource flavours attached to every instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasourceKind {
    /// Mimir Prometheus API
    Prometheus,
    /// Mimir Alertmanager API
    AlertManager,
}

impl DatasourceKind {
    /// Both kinds, Prometheus first
    pub const ALL: [DatasourceKind; 2] = [DatasourceKind::Prometheus, DatasourceKind::AlertManager];

    /// Value of the `source` label
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasourceKind::Prometheus => "prometheus",
            DatasourceKind::AlertManager => "alert-manager",
        }
    }

    fn name_prefix(&self) -> &'static str {
        match self {
            DatasourceKind::Prometheus => "prom",
            DatasourceKind::AlertManager => "am",
        }
    }
}

impl fmt::Display for DatasourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifying labels of an owned object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLabels {
    organization: String,
    project: String,
    stage: Stage,
    source: Option<DatasourceKind>,
}

impl ResourceLabels {
    /// Labels of the Grafana instance of `params`
    pub fn instance(params: &BaseParams) -> Self {
        Self {
            organization: params.organization.clone(),
            project: params.project.clone(),
            stage: params.stage,
            source: None,
        }
    }

    /// Labels of the `kind` datasource of `params`
    pub fn datasource(params: &BaseParams, kind: DatasourceKind) -> Self {
        Self {
            source: Some(kind),
            ..Self::instance(params)
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string()),
            (ORGANIZATION_LABEL.to_string(), self.organization.clone()),
            (PROJECT_LABEL.to_string(), self.project.clone()),
            (STAGE_LABEL.to_string(), self.stage.to_string()),
        ]);
        if let Some(source) = self.source {
            labels.insert(SOURCE_LABEL.to_string(), source.to_string());
        }
        labels
    }

    /// Equality-based label selector (`k=v,k=v`)
    pub fn selector(&self) -> String {
        self.to_map()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Whether an object carrying `labels` is selected
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.to_map()
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}
