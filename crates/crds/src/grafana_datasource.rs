//! GrafanaDatasource Custom Resource
//!
//! Typed view of the `grafana.integreatly.org/v1beta1` `GrafanaDatasource` kind.
//! A datasource is attached to one or more Grafana instances through `instanceSelector`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GrafanaDatasourceSpec defines a datasource provisioned into matching Grafana instances
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "grafana.integreatly.org",
    version = "v1beta1",
    kind = "GrafanaDatasource",
    plural = "grafanadatasources",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaDatasourceSpec {
    /// Datasource definition as sent to the Grafana API
    pub datasource: DatasourceDefinition,

    /// Selects the Grafana instances receiving this datasource
    pub instance_selector: InstanceSelector,

    /// Values injected from secrets/configmaps into `datasource` at provisioning time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values_from: Vec<ValueFrom>,
}

/// Grafana datasource model
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceDefinition {
    pub access: String,
    pub basic_auth: bool,
    pub basic_auth_user: String,
    pub is_default: bool,

    #[serde(default)]
    pub json_data: BTreeMap<String, String>,

    pub name: String,

    /// Never holds literal credentials, only `${VAR}` placeholders resolved by `valuesFrom`
    #[serde(default)]
    pub secure_json_data: BTreeMap<String, String>,

    #[serde(rename = "type")]
    pub type_: String,

    pub uid: String,
    pub url: String,
}

/// Label selector over Grafana instances
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

/// Injects one value into the datasource definition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValueFrom {
    /// Dotted path inside `datasource` (e.g. `secureJsonData.basicAuthPassword`)
    pub target_path: String,
    pub value_from: ValueSource,
}

/// Source of an injected value
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValueSource {
    pub secret_key_ref: SecretKeyRef,
}

/// Reference to one key of a Secret in the datasource namespace
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct SecretKeyRef {
    pub key: String,
    pub name: String,
}
