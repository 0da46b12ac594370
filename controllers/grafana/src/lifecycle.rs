//! Lifecycle hooks.
//!
//! Entry points the orchestrator calls. Each hook composes the group manager and the
//! reconciler, and always answers with a [`HookResult`]: any error, panics included,
//! becomes a KO result.

use crate::error::PluginError;
use crate::groups::GroupManager;
use crate::labels::ProjectRef;
use crate::models::{
    DeleteProjectArgs, Environment, EnvironmentArgs, HookResult, PermissionArgs, Permissions, UpsertProjectArgs,
};
use crate::reconciler::Reconciler;
use crate::stage::{Stage, StagePresence};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{error, info};

/// How much of a project an event converges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Permissions are synced and absent stages torn down
    Full,
    /// Present stages only
    PresentStages,
}

/// The Grafana projects plugin.
pub struct Plugin {
    groups: GroupManager,
    reconciler: Reconciler,
}

impl Plugin {
    /// Plugin from its two halves
    pub fn new(groups: GroupManager, reconciler: Reconciler) -> Self {
        Self { groups, reconciler }
    }

    /// Project created or updated
    pub async fn upsert_project(&self, args: &UpsertProjectArgs) -> HookResult {
        let project = ProjectRef::new(&args.organization, &args.project.name);
        run_hook(
            "upsert-project",
            "Created",
            "An error happened while creating Grafana instances",
            self.converge_project(&project, &args.project.environments, &args.owner.id, Scope::Full),
        )
        .await
    }

    /// Project deleted
    pub async fn delete_project(&self, args: &DeleteProjectArgs) -> HookResult {
        let project = ProjectRef::new(&args.organization, &args.project);
        run_hook(
            "delete-project",
            "Deleted",
            "An error happened while deleting Grafana instances",
            async {
                let (prod, hors_prod) = (project.stage(Stage::Prod), project.stage(Stage::HorsProd));
                let (prod, hors_prod, groups) = futures::join!(
                    self.reconciler.delete_stage(&prod),
                    self.reconciler.delete_stage(&hors_prod),
                    self.groups.delete_project_groups(&project)
                );
                PluginError::collect([prod, hors_prod, groups]).map(|_| ())
            },
        )
        .await
    }

    /// Environment created (legacy event): groups, then every present stage
    pub async fn initialize_environment(&self, args: &EnvironmentArgs) -> HookResult {
        let project = ProjectRef::new(&args.organization, &args.project);
        run_hook(
            "initialize-environment",
            "Created",
            "An error happened while creating Grafana instances",
            self.converge_project(&project, &args.environments, &args.owner.id, Scope::PresentStages),
        )
        .await
    }

    /// Environment deleted: tear the stage down once its last environment is gone
    pub async fn delete_environment(&self, args: &EnvironmentArgs) -> HookResult {
        let project = ProjectRef::new(&args.organization, &args.project);
        let stage = Stage::of(&args.stage);
        let remaining = remaining_environments(&args.environments, args.environment.as_deref());
        run_hook(
            "delete-environment",
            "Deleted",
            "An error happened while deleting Grafana instances",
            async {
                if StagePresence::of(&remaining).contains(stage) {
                    info!("{} still has {} environments, keeping its Grafana resources", project, stage);
                    return Ok(());
                }

                info!("Last {} environment of {} deleted", stage, project);
                let params = project.stage(stage);
                let (resources, groups) = futures::join!(
                    self.reconciler.delete_stage(&params),
                    self.groups.delete_groups(&project, stage)
                );
                PluginError::collect([resources, groups]).map(|_| ())
            },
        )
        .await
    }

    /// Permission of a user changed on an environment
    pub async fn set_env_permission(&self, args: &PermissionArgs) -> HookResult {
        let project = ProjectRef::new(&args.organization, &args.project);
        run_hook(
            "set-env-permission",
            &format!("Permission set for user {} on '{}'", args.user.id, project),
            "An error happened while setting user permission on Grafana instance",
            self.groups
                .apply_permission(&project, &args.user.id, args.permissions, Stage::of(&args.stage)),
        )
        .await
    }

    /// Groups first, then stages and permissions concurrently
    ///
    /// A present stage is ensured. An absent one is deleted in the `Full` scope.
    async fn converge_project(
        &self,
        project: &ProjectRef,
        environments: &[Environment],
        owner: &str,
        scope: Scope,
    ) -> Result<(), PluginError> {
        let presence = StagePresence::of(environments);
        self.groups.ensure_groups(project, owner).await?;

        let permissions = async {
            if scope != Scope::Full {
                return Ok(());
            }
            let grants = stage_grants(environments);
            let results = join_all(grants.iter().map(|((user_id, stage), permissions)| {
                self.groups.apply_permission(project, user_id, *permissions, *stage)
            }))
            .await;
            PluginError::collect(results).map(|_| ())
        };
        let stages = join_all(Stage::ALL.into_iter().map(|stage| async move {
            let params = project.stage(stage);
            match (presence.contains(stage), scope) {
                (true, _) => self.reconciler.ensure_stage(&params).await,
                (false, Scope::Full) => self.reconciler.delete_stage(&params).await,
                (false, Scope::PresentStages) => Ok(()),
            }
        }));

        let (permissions, stages) = futures::join!(permissions, stages);
        PluginError::collect(std::iter::once(permissions).chain(stages)).map(|_| ())
    }
}

/// Environments left once `deleted` is removed; without a name the list is kept as is
fn remaining_environments(environments: &[Environment], deleted: Option<&str>) -> Vec<Environment> {
    let mut remaining = environments.to_vec();
    if let Some(name) = deleted {
        if let Some(index) = remaining.iter().position(|env| env.name == name) {
            remaining.remove(index);
        }
    }
    remaining
}

/// Effective permission per (user, stage): a flag is held if any environment of the
/// stage grants it
pub(crate) fn stage_grants(environments: &[Environment]) -> BTreeMap<(String, Stage), Permissions> {
    let mut grants: BTreeMap<(String, Stage), Permissions> = BTreeMap::new();
    for env in environments {
        let stage = Stage::of(&env.stage);
        for grant in &env.permissions {
            let effective = grants.entry((grant.user_id.clone(), stage)).or_default();
            effective.ro |= grant.ro;
            effective.rw |= grant.rw;
        }
    }
    grants
}

/// Run a hook body, turning errors and panics into a KO result
async fn run_hook<F>(hook: &str, success: &str, failure: &str, work: F) -> HookResult
where
    F: Future<Output = Result<(), PluginError>>,
{
    info!("Running {} hook", hook);
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(Ok(())) => {
            info!("{} hook succeeded", hook);
            HookResult::ok(success)
        }
        Ok(Err(e)) => {
            error!("{} hook failed: {}", hook, e);
            HookResult::ko(failure, e)
        }
        Err(panic) => {
            let e = PluginError::Panicked(panic_message(panic.as_ref()));
            error!("{} hook failed: {}", hook, e);
            HookResult::ko(failure, e)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
