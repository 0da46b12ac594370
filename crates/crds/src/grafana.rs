//! Grafana Custom Resource
//!
//! Typed view of the `grafana.integreatly.org/v1beta1` `Grafana` kind owned by the
//! grafana-operator. Only the fields this workspace writes are modelled; anything else
//! present on a live object is ignored on read and left untouched by merge patches.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GrafanaSpec defines the desired state of a Grafana instance
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "grafana.integreatly.org",
    version = "v1beta1",
    kind = "Grafana",
    plural = "grafanas",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaSpec {
    /// `grafana.ini` content, keyed by section (`server`, `auth.generic_oauth`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, BTreeMap<String, String>>,

    /// Overrides merged into the operator-managed Deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<GrafanaDeployment>,

    /// OpenShift Route exposing the instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<GrafanaRoute>,
}

/// Deployment override (`spec.deployment`)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaDeployment {
    pub spec: DeploymentSpec,
}

/// `spec.deployment.spec`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    pub template: PodTemplate,
}

/// `spec.deployment.spec.template`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplate {
    pub spec: PodSpec,
}

/// `spec.deployment.spec.template.spec`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
}

/// Container override; matched by name against the operator's container
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
}

/// Plain name/value environment variable
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Route override (`spec.route`)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaRoute {
    /// Always serialized, the operator expects an object here even when empty
    #[serde(default)]
    pub metadata: RouteMetadata,

    pub spec: RouteSpec,
}

/// `spec.route.metadata`, the labels and annotations the operator copies onto the Route
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct RouteMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// `spec.route.spec`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub host: String,
    pub path: String,
    pub port: RoutePort,
    pub tls: RouteTls,
    pub to: RouteTarget,
    pub wildcard_policy: String,
}

/// Target port of the route
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    pub target_port: i32,
}

/// TLS settings of the route
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTls {
    pub termination: String,
}

/// Backend service of the route
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTarget {
    pub kind: String,
    pub name: String,
    pub weight: i32,
}
