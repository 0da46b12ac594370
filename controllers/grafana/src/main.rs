//! Grafana projects plugin CLI
//!
//! The orchestrator runs one command per lifecycle event and writes the event payload
//! (`{"args": ...}`) to stdin. The hook result is printed to stdout as JSON; logs go to
//! stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crds::{Grafana, GrafanaDatasource};
use grafana_plugin::cluster::KubeStore;
use grafana_plugin::groups::GroupManager;
use grafana_plugin::infos::ServiceInfos;
use grafana_plugin::labels::ProjectRef;
use grafana_plugin::models::{DeleteProjectArgs, EnvironmentArgs, HookPayload, PermissionArgs, UpsertProjectArgs};
use grafana_plugin::reconciler::Reconciler;
use grafana_plugin::{HookResult, Plugin, PluginConfig};
use keycloak_client::KeycloakClient;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Grafana projects plugin
#[derive(Parser, Debug)]
#[command(name = "grafana-plugin", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project created or updated
    UpsertProject,
    /// Project deleted
    DeleteProject,
    /// Environment created
    InitializeEnvironment,
    /// Environment deleted
    DeleteEnvironment,
    /// User permission changed on an environment
    SetEnvPermission,
    /// Print the service description of a project; only `GRAFANA_URL` is read
    Infos {
        #[arg(long)]
        organization: String,
        #[arg(long)]
        project: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Failed to install rustls crypto provider: {:?}", e);
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result = match run(cli.command).await {
        Ok(Some(result)) => result,
        Ok(None) => return Ok(()),
        Err(e) => HookResult::ko("Plugin setup failed", format!("{:#}", e)),
    };

    println!("{}", serde_json::to_string(&result)?);
    if !result.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}

/// Run a command; `None` when it does not produce a hook result
async fn run(command: Command) -> anyhow::Result<Option<HookResult>> {
    if let Command::Infos { organization, project } = &command {
        let grafana_url = PluginConfig::grafana_url_from_lookup(|key| std::env::var(key).ok())?;
        let infos = ServiceInfos::for_project(&grafana_url, &ProjectRef::new(organization, project));
        println!("{}", serde_json::to_string(&infos)?);
        return Ok(None);
    }

    let config = Arc::new(PluginConfig::from_env()?);

    let mut payload = String::new();
    std::io::stdin()
        .read_to_string(&mut payload)
        .context("failed to read the event payload from stdin")?;

    let plugin = connect(config).await?;
    let result = match command {
        Command::UpsertProject => plugin.upsert_project(&parse::<UpsertProjectArgs>(&payload)?).await,
        Command::DeleteProject => plugin.delete_project(&parse::<DeleteProjectArgs>(&payload)?).await,
        Command::InitializeEnvironment => {
            plugin.initialize_environment(&parse::<EnvironmentArgs>(&payload)?).await
        }
        Command::DeleteEnvironment => plugin.delete_environment(&parse::<EnvironmentArgs>(&payload)?).await,
        Command::SetEnvPermission => plugin.set_env_permission(&parse::<PermissionArgs>(&payload)?).await,
        Command::Infos { .. } => return Ok(None),
    };
    Ok(Some(result))
}

fn parse<A: DeserializeOwned>(payload: &str) -> anyhow::Result<A> {
    let payload: HookPayload<A> = serde_json::from_str(payload).context("invalid event payload")?;
    Ok(payload.args)
}

/// Build the plugin against the live cluster and Keycloak
async fn connect(config: Arc<PluginConfig>) -> anyhow::Result<Plugin> {
    info!("Configuration:");
    info!("  Keycloak URL: {}", config.keycloak_admin_url);
    info!("  Keycloak realm: {}", config.keycloak_realm);
    info!("  Namespace: {}", config.namespace);

    let client = kube_client(&config).await?;
    let keycloak = KeycloakClient::connect(
        &config.keycloak_admin_url,
        &config.keycloak_realm,
        &config.keycloak_admin_user,
        &config.keycloak_admin_password,
    )
    .await
    .context("failed to authenticate against Keycloak")?;

    let reconciler = Reconciler::new(
        Arc::clone(&config),
        Box::new(KubeStore::<Grafana>::namespaced(client.clone(), &config.namespace)),
        Box::new(KubeStore::<GrafanaDatasource>::namespaced(client, &config.namespace)),
    );
    Ok(Plugin::new(GroupManager::new(Box::new(keycloak)), reconciler))
}

/// Cluster client from `KUBECONFIG_PATH` (and `KUBECONFIG_CTX`), or inferred
async fn kube_client(config: &PluginConfig) -> anyhow::Result<Client> {
    let kube_config = match &config.kubeconfig_path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).with_context(|| format!("failed to read {}", path))?;
            let options = KubeConfigOptions {
                context: config.kubeconfig_context.clone(),
                ..Default::default()
            };
            kube::Config::from_custom_kubeconfig(kubeconfig, &options).await?
        }
        None => kube::Config::infer().await?,
    };
    Ok(Client::try_from(kube_config)?)
}
