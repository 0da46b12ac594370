//! Keycloak group hierarchy.
//!
//! Every project owns this tree, below a root group the platform creates:
//!
//! ```text
//! /{organization}-{project}
//!     /grafana
//!         /prod-RW   /prod-RO   /hprod-RW   /hprod-RO
//! ```
//!
//! Membership of the leaf groups is what the Grafana role mapping evaluates.

use crate::builder::{leaf_group_name, leaf_group_path, Access, GRAFANA_GROUP};
use crate::error::PluginError;
use crate::labels::ProjectRef;
use crate::models::Permissions;
use crate::stage::Stage;
use futures::future::join_all;
use keycloak_client::{Group, KeycloakClientTrait, KeycloakError};
use tracing::{debug, info, warn};

/// Manages the Grafana access groups of projects.
pub struct GroupManager {
    client: Box<dyn KeycloakClientTrait>,
}

impl GroupManager {
    /// Manager over a Keycloak client
    pub fn new(client: Box<dyn KeycloakClientTrait>) -> Self {
        Self { client }
    }

    /// Project root group, matched by exact name among the search results
    async fn find_root(&self, project: &ProjectRef) -> Result<Option<Group>, PluginError> {
        let name = project.group_root();
        let root = self
            .client
            .find_groups_by_name(&name)
            .await?
            .into_iter()
            .find(|group| group.name == name);
        match root {
            Some(root) => Ok(Some(self.client.get_group(&root.id).await?)),
            None => Ok(None),
        }
    }

    /// The `grafana` group of the project with its leaves, `None` when the root or the
    /// `grafana` group itself is missing
    async fn find_grafana_group(&self, project: &ProjectRef) -> Result<Option<Group>, PluginError> {
        let Some(root) = self.find_root(project).await? else {
            return Ok(None);
        };
        match root.find_sub_group(GRAFANA_GROUP) {
            Some(group) => Ok(Some(self.client.get_group(&group.id).await?)),
            None => Ok(None),
        }
    }

    /// The project's `grafana` group with its leaves, created when missing
    ///
    /// Fails with `GroupNotFound` when the project root group is missing.
    async fn get_or_create_grafana_group(&self, project: &ProjectRef) -> Result<Group, PluginError> {
        let root = self
            .find_root(project)
            .await?
            .ok_or_else(|| PluginError::GroupNotFound(format!("/{}", project.group_root())))?;

        match root.find_sub_group(GRAFANA_GROUP) {
            Some(group) => Ok(self.client.get_group(&group.id).await?),
            None => {
                info!("Creating group /{}/{}", root.name, GRAFANA_GROUP);
                Ok(self.client.create_child_group(&root.id, GRAFANA_GROUP).await?)
            }
        }
    }

    /// Make sure the `grafana` group and the four leaves exist
    ///
    /// `owner` is added to every leaf this call creates. Fails with `GroupNotFound` when
    /// the project root group is missing.
    pub async fn ensure_groups(&self, project: &ProjectRef, owner: &str) -> Result<(), PluginError> {
        let grafana = self.get_or_create_grafana_group(project).await?;

        let missing: Vec<String> = Stage::ALL
            .into_iter()
            .flat_map(|stage| Access::ALL.into_iter().map(move |access| leaf_group_name(stage, access)))
            .filter(|name| grafana.find_sub_group(name).is_none())
            .collect();
        if missing.is_empty() {
            debug!("Groups of {} already exist", project);
            return Ok(());
        }

        let root = project.group_root();
        let (root, grafana) = (&root, &grafana);
        let results = join_all(missing.iter().map(|name| async move {
            let leaf = self.client.create_child_group(&grafana.id, name).await?;
            info!("Created group /{}/{}/{}", root, GRAFANA_GROUP, name);
            self.client.add_user_to_group(owner, &leaf.id).await?;
            debug!("Added owner {} to {}", owner, name);
            Ok::<(), PluginError>(())
        }))
        .await;
        PluginError::collect(results)?;
        Ok(())
    }

    /// Make the user's memberships of the stage's leaf groups match `permissions` exactly
    ///
    /// The `grafana` group and the stage's leaves are created when missing.
    pub async fn apply_permission(
        &self,
        project: &ProjectRef,
        user_id: &str,
        permissions: Permissions,
        stage: Stage,
    ) -> Result<(), PluginError> {
        let grafana = self.get_or_create_grafana_group(project).await?;

        let wanted = [
            (Access::ReadWrite, permissions.rw),
            (Access::ReadOnly, permissions.ro),
        ];
        let results = join_all(wanted.into_iter().map(|(access, member)| {
            let grafana = &grafana;
            async move {
                let path = leaf_group_path(&project.group_root(), stage, access);
                let name = leaf_group_name(stage, access);
                let leaf = match grafana.find_sub_group(&name) {
                    Some(leaf) => leaf.clone(),
                    None => {
                        info!("Creating group {}", path);
                        self.client.create_child_group(&grafana.id, &name).await?
                    }
                };
                if member {
                    self.client.add_user_to_group(user_id, &leaf.id).await?;
                    debug!("User {} is a member of {}", user_id, path);
                } else {
                    self.client.remove_user_from_group(user_id, &leaf.id).await?;
                    debug!("User {} is not a member of {}", user_id, path);
                }
                Ok::<(), PluginError>(())
            }
        }))
        .await;
        PluginError::collect(results)?;

        info!(
            "Applied permission ro={} rw={} for user {} on {} ({})",
            permissions.ro, permissions.rw, user_id, project, stage
        );
        Ok(())
    }

    /// Delete the RW and RO leaves of `stage`; absent groups count as deleted
    pub async fn delete_groups(&self, project: &ProjectRef, stage: Stage) -> Result<(), PluginError> {
        let Some(grafana) = self.find_grafana_group(project).await? else {
            warn!("No {} group for {}, nothing to delete", GRAFANA_GROUP, project);
            return Ok(());
        };

        let results = join_all(Access::ALL.into_iter().map(|access| {
            let grafana = &grafana;
            async move {
                let name = leaf_group_name(stage, access);
                match grafana.find_sub_group(&name) {
                    Some(leaf) => self.delete_group(&leaf.id, &name).await,
                    None => {
                        debug!("Group {} of {} already deleted", name, project);
                        Ok(())
                    }
                }
            }
        }))
        .await;
        PluginError::collect(results)?;
        Ok(())
    }

    /// Delete the project's `grafana` group and every leaf below it
    ///
    /// The root group belongs to the platform and is left in place.
    pub async fn delete_project_groups(&self, project: &ProjectRef) -> Result<(), PluginError> {
        match self.find_grafana_group(project).await? {
            Some(grafana) => self.delete_group(&grafana.id, GRAFANA_GROUP).await,
            None => {
                warn!("No {} group for {}, nothing to delete", GRAFANA_GROUP, project);
                Ok(())
            }
        }
    }

    async fn delete_group(&self, id: &str, name: &str) -> Result<(), PluginError> {
        match self.client.delete_group(id).await {
            Ok(()) => {
                info!("Deleted group {}", name);
                Ok(())
            }
            Err(KeycloakError::NotFound(_)) => {
                debug!("Group {} already deleted", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
