//! Plugin configuration.
//!
//! Loaded once at process start from environment variables, validated, and then shared
//! read-only (behind an `Arc`) with every component.

use crate::error::PluginError;

/// Namespace the grafana-operator watches when none is configured
pub const DEFAULT_NAMESPACE: &str = "infra-grafana";

/// Grafana image used when none is configured
pub const DEFAULT_GRAFANA_IMAGE: &str = "grafana/grafana:9.5.5";

/// OAuth client registered in Keycloak for the project Grafana instances
pub const DEFAULT_OAUTH_CLIENT_ID: &str = "grafana-projects";

/// Secret holding the metrics backend basic-auth credentials
pub const DEFAULT_DATASOURCE_SECRET: &str = "credentials";

/// Outbound proxy settings propagated to the Grafana container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub http_proxy: String,
    pub https_proxy: String,
    pub no_proxy: String,
}

/// Immutable plugin configuration
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Public Keycloak URL, used in the Grafana OAuth endpoints
    pub keycloak_url: String,
    /// Keycloak URL for admin API calls (may be an internal address)
    pub keycloak_admin_url: String,
    pub keycloak_realm: String,
    pub keycloak_admin_user: String,
    pub keycloak_admin_password: String,
    /// Secret of the OAuth client Grafana logs in with
    pub keycloak_client_secret: String,
    pub oauth_client_id: String,
    /// Host shared by every project instance route
    pub grafana_host: String,
    /// Public base URL, instances are served under `{grafana_url}/{instance}/`
    pub grafana_url: String,
    pub grafana_image: String,
    pub namespace: String,
    /// Mimir base URL
    pub metrics_url: String,
    pub datasource_secret: String,
    pub kubeconfig_path: Option<String>,
    pub kubeconfig_context: Option<String>,
    pub proxy: Option<ProxyConfig>,
}

impl PluginConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, PluginError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values count as missing. Every missing required key is reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PluginError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut missing = Vec::new();
        let mut required = |key: &str| {
            get(key).unwrap_or_else(|| {
                missing.push(key.to_string());
                String::new()
            })
        };

        let keycloak_url = required("KEYCLOAK_URL").trim_end_matches('/').to_string();
        let keycloak_realm = required("KEYCLOAK_REALM");
        let keycloak_admin_user = required("KEYCLOAK_ADMIN");
        let keycloak_admin_password = required("KEYCLOAK_ADMIN_PASSWORD");
        let keycloak_client_secret = required("KEYCLOAK_CLIENT_SECRET_GRAFANA");
        let grafana_host = required("GRAFANA_HOST");
        let grafana_url = required("GRAFANA_URL").trim_end_matches('/').to_string();
        let metrics_url = required("MIMIR_URL").trim_end_matches('/').to_string();

        if !missing.is_empty() {
            return Err(PluginError::InvalidConfig(format!(
                "missing required environment variable(s): {}",
                missing.join(", ")
            )));
        }

        let keycloak_admin_url = match (get("KEYCLOAK_PROTOCOL"), get("KEYCLOAK_DOMAIN")) {
            (Some(protocol), Some(domain)) => format!("{}://{}", protocol, domain),
            _ => keycloak_url.clone(),
        };

        let proxy = match (get("HTTP_PROXY"), get("HTTPS_PROXY")) {
            (Some(http_proxy), Some(https_proxy)) => Some(ProxyConfig {
                http_proxy,
                https_proxy,
                no_proxy: get("NO_PROXY").unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            keycloak_url,
            keycloak_admin_url,
            keycloak_realm,
            keycloak_admin_user,
            keycloak_admin_password,
            keycloak_client_secret,
            oauth_client_id: get("GRAFANA_OAUTH_CLIENT_ID")
                .unwrap_or_else(|| DEFAULT_OAUTH_CLIENT_ID.to_string()),
            grafana_host,
            grafana_url,
            grafana_image: get("GRAFANA_IMAGE").unwrap_or_else(|| DEFAULT_GRAFANA_IMAGE.to_string()),
            namespace: get("GRAFANA_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            metrics_url,
            datasource_secret: get("DATASOURCE_SECRET_NAME")
                .unwrap_or_else(|| DEFAULT_DATASOURCE_SECRET.to_string()),
            kubeconfig_path: get("KUBECONFIG_PATH"),
            kubeconfig_context: get("KUBECONFIG_CTX"),
            proxy,
        })
    }

    /// `GRAFANA_URL` alone, without the trailing slash
    ///
    /// Enough for the service links, which need neither Keycloak nor Mimir.
    pub fn grafana_url_from_lookup<F>(lookup: F) -> Result<String, PluginError>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("GRAFANA_URL")
            .filter(|value| !value.trim().is_empty())
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                PluginError::InvalidConfig("missing required environment variable(s): GRAFANA_URL".to_string())
            })
    }

    /// OpenID Connect endpoint of the configured realm (`auth`, `token`, `userinfo`)
    pub fn oidc_endpoint(&self, endpoint: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.keycloak_url, self.keycloak_realm, endpoint
        )
    }
}
