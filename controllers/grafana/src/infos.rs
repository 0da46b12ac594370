//! Service description advertised to the console.

use crate::labels::ProjectRef;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// Service name shown by the console
pub const SERVICE_NAME: &str = "grafana";

/// Link to one project instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceLink {
    /// Target URL
    pub to: String,
    /// Link label
    pub title: String,
}

/// Service card of a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInfos {
    /// Service identifier
    pub name: String,
    /// Display title
    pub title: String,
    /// One line description
    pub description: String,
    /// Links to the project instances
    pub links: Vec<ServiceLink>,
}

impl ServiceInfos {
    /// Service description with one link per stage of `project`
    pub fn for_project(grafana_url: &str, project: &ProjectRef) -> Self {
        let links = Stage::ALL
            .into_iter()
            .map(|stage| ServiceLink {
                to: format!("{}/{}", grafana_url, project.stage(stage).instance_name()),
                title: match stage {
                    Stage::Prod => "Metrics prod".to_string(),
                    Stage::HorsProd => "Metrics hors prod".to_string(),
                },
            })
            .collect();

        Self {
            name: SERVICE_NAME.to_string(),
            title: "Metrics".to_string(),
            description: "Per-project Grafana dashboards".to_string(),
            links,
        }
    }
}
