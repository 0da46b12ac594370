//! Grafana resource builder.
//!
//! Pure functions turning a [`BaseParams`] into the exact `Grafana` and
//! `GrafanaDatasource` bodies the grafana-operator consumes. Nothing here talks to a
//! cluster; the reconciler decides whether a body is created or merged into an existing
//! object.

use crate::config::PluginConfig;
use crate::labels::{BaseParams, DatasourceKind, ResourceLabels, APP_LABEL, DASHBOARDS_LABEL};
use crate::stage::Stage;
use crds::{
    Container, DatasourceDefinition, DeploymentSpec, EnvVar, Grafana, GrafanaDatasource,
    GrafanaDatasourceSpec, GrafanaDeployment, GrafanaRoute, GrafanaSpec, InstanceSelector, PodSpec,
    PodTemplate, RouteMetadata, RoutePort, RouteSpec, RouteTarget, RouteTls, SecretKeyRef, ValueFrom, ValueSource,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Port the grafana container listens on
pub const GRAFANA_PORT: i32 = 3000;

/// Name of the service subgroup under the project root group
pub const GRAFANA_GROUP: &str = "grafana";

const USERNAME_KEY: &str = "PROMETHEUS_USERNAME";
const PASSWORD_KEY: &str = "PROMETHEUS_PASSWORD";
const TENANT_HEADER: &str = "X-Scope-OrgID";

/// Grafana organization role granted through group membership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrafanaRole {
    /// Read write access
    Editor,
    /// Read only access
    Viewer,
}

impl GrafanaRole {
    /// Role name as Grafana spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            GrafanaRole::Editor => "Editor",
            GrafanaRole::Viewer => "Viewer",
        }
    }
}

/// Group membership to role mapping of one instance
///
/// Grafana evaluates [`RoleMapping::expression`] (JMESPath) against the `group` claim.
/// [`RoleMapping::resolve`] applies the same rule locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMapping {
    rw_group: String,
    ro_group: String,
}

impl RoleMapping {
    /// Mapping of the `stage` instance of the project rooted at `group_root`
    pub fn new(group_root: &str, stage: Stage) -> Self {
        Self {
            rw_group: leaf_group_path(group_root, stage, Access::ReadWrite),
            ro_group: leaf_group_path(group_root, stage, Access::ReadOnly),
        }
    }

    /// JMESPath expression for `role_attribute_path`
    pub fn expression(&self) -> String {
        format!(
            "contains(groups[*], '{}') && '{}' || contains(groups[*], '{}') && '{}'",
            self.rw_group,
            GrafanaRole::Editor.as_str(),
            self.ro_group,
            GrafanaRole::Viewer.as_str()
        )
    }

    /// Role of a user holding `groups`; `None` means login is denied
    pub fn resolve<S: AsRef<str>>(&self, groups: &[S]) -> Option<GrafanaRole> {
        let member_of = |path: &str| groups.iter().any(|group| group.as_ref() == path);
        if member_of(&self.rw_group) {
            Some(GrafanaRole::Editor)
        } else if member_of(&self.ro_group) {
            Some(GrafanaRole::Viewer)
        } else {
            None
        }
    }
}

/// Access level of a leaf group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Editor access
    ReadWrite,
    /// Viewer access
    ReadOnly,
}

impl Access {
    /// Both levels, read write first
    pub const ALL: [Access; 2] = [Access::ReadWrite, Access::ReadOnly];

    /// Group name suffix
    pub fn suffix(&self) -> &'static str {
        match self {
            Access::ReadWrite => "RW",
            Access::ReadOnly => "RO",
        }
    }
}

/// Leaf group name, e.g. `prod-RW`
pub fn leaf_group_name(stage: Stage, access: Access) -> String {
    format!("{}-{}", stage, access.suffix())
}

/// Full path of a leaf group, e.g. `/acme-shop/grafana/prod-RW`
pub fn leaf_group_path(group_root: &str, stage: Stage, access: Access) -> String {
    format!("/{}/{}/{}", group_root, GRAFANA_GROUP, leaf_group_name(stage, access))
}

/// Role expression of the `stage` instance
pub fn build_role_attribute_path(group_root: &str, stage: Stage) -> String {
    RoleMapping::new(group_root, stage).expression()
}

fn section(entries: &[(&str, String)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn grafana_ini(config: &PluginConfig, instance: &str, role_attribute_path: &str) -> BTreeMap<String, BTreeMap<String, String>> {
    let enabled = || "true".to_string();

    BTreeMap::from([
        (
            "auth".to_string(),
            section(&[("oauth_allow_insecure_email_lookup", enabled())]),
        ),
        (
            "auth.generic_oauth".to_string(),
            section(&[
                ("api_url", config.oidc_endpoint("userinfo")),
                ("auth_url", config.oidc_endpoint("auth")),
                ("token_url", config.oidc_endpoint("token")),
                ("client_id", config.oauth_client_id.clone()),
                ("client_secret", config.keycloak_client_secret.clone()),
                ("email_attribute_path", "email".to_string()),
                ("groups_attribute_path", "group".to_string()),
                ("enabled", enabled()),
                ("role_attribute_path", role_attribute_path.to_string()),
                ("role_attribute_strict", enabled()),
                ("scopes", "profile, group, email, openid".to_string()),
                ("tls_skip_verify_insecure", enabled()),
            ]),
        ),
        (
            "server".to_string(),
            section(&[
                ("root_url", format!("{}/{}/", config.grafana_url, instance)),
                ("serve_from_sub_path", enabled()),
            ]),
        ),
    ])
}

fn proxy_env(config: &PluginConfig) -> Option<Vec<EnvVar>> {
    config.proxy.as_ref().map(|proxy| {
        [
            ("HTTP_PROXY", &proxy.http_proxy),
            ("HTTPS_PROXY", &proxy.https_proxy),
            ("NO_PROXY", &proxy.no_proxy),
        ]
        .into_iter()
        .map(|(name, value)| EnvVar {
            name: name.to_string(),
            value: value.clone(),
        })
        .collect()
    })
}

/// Build the Grafana instance of `params`
pub fn build_grafana_instance(config: &PluginConfig, params: &BaseParams, role_attribute_path: &str) -> Grafana {
    let instance = params.instance_name();

    let mut labels = ResourceLabels::instance(params).to_map();
    labels.insert(APP_LABEL.to_string(), instance.clone());
    labels.insert(DASHBOARDS_LABEL.to_string(), "default".to_string());

    Grafana {
        metadata: ObjectMeta {
            name: Some(instance.clone()),
            namespace: Some(config.namespace.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: GrafanaSpec {
            config: grafana_ini(config, &instance, role_attribute_path),
            deployment: Some(GrafanaDeployment {
                spec: DeploymentSpec {
                    template: PodTemplate {
                        spec: PodSpec {
                            containers: vec![Container {
                                name: "grafana".to_string(),
                                image: Some(config.grafana_image.clone()),
                                env: proxy_env(config),
                            }],
                        },
                    },
                },
            }),
            route: Some(GrafanaRoute {
                metadata: RouteMetadata::default(),
                spec: RouteSpec {
                    host: config.grafana_host.clone(),
                    path: format!("/{}", instance),
                    port: RoutePort {
                        target_port: GRAFANA_PORT,
                    },
                    tls: RouteTls {
                        termination: "edge".to_string(),
                    },
                    to: RouteTarget {
                        kind: "Service".to_string(),
                        name: format!("{}-service", instance),
                        weight: 100,
                    },
                    wildcard_policy: "None".to_string(),
                },
            }),
        },
    }
}

fn secret_value(target_path: &str, secret: &str, key: &str) -> ValueFrom {
    ValueFrom {
        target_path: target_path.to_string(),
        value_from: ValueSource {
            secret_key_ref: SecretKeyRef {
                key: key.to_string(),
                name: secret.to_string(),
            },
        },
    }
}

/// Build the `kind` datasource of `params`, named `resource_name`
pub fn build_datasource(
    config: &PluginConfig,
    params: &BaseParams,
    kind: DatasourceKind,
    resource_name: &str,
) -> GrafanaDatasource {
    let (name, type_, url, is_default) = match kind {
        DatasourceKind::Prometheus => ("Prometheus", "prometheus", format!("{}/prometheus", config.metrics_url), true),
        DatasourceKind::AlertManager => ("Alertmanager", "alertmanager", config.metrics_url.clone(), false),
    };

    GrafanaDatasource {
        metadata: ObjectMeta {
            name: Some(resource_name.to_string()),
            namespace: Some(config.namespace.clone()),
            labels: Some(ResourceLabels::datasource(params, kind).to_map()),
            ..Default::default()
        },
        spec: GrafanaDatasourceSpec {
            datasource: DatasourceDefinition {
                access: "proxy".to_string(),
                basic_auth: true,
                basic_auth_user: format!("${{{}}}", USERNAME_KEY),
                is_default,
                json_data: BTreeMap::from([("httpHeaderName1".to_string(), TENANT_HEADER.to_string())]),
                name: name.to_string(),
                secure_json_data: BTreeMap::from([
                    ("basicAuthPassword".to_string(), format!("${{{}}}", PASSWORD_KEY)),
                    ("httpHeaderValue1".to_string(), params.tenant()),
                ]),
                type_: type_.to_string(),
                uid: type_.to_string(),
                url,
            },
            instance_selector: InstanceSelector {
                match_labels: BTreeMap::from([(APP_LABEL.to_string(), params.instance_name())]),
            },
            values_from: vec![
                secret_value("basicAuthUser", &config.datasource_secret, USERNAME_KEY),
                secret_value("secureJsonData.basicAuthPassword", &config.datasource_secret, PASSWORD_KEY),
            ],
        },
    }
}
