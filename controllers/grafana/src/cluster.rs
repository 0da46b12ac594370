//! Cluster object store.
//!
//! The reconciler only needs four verbs on a namespaced custom resource kind. They sit
//! behind [`ObjectStore`] so reconciliation can be tested against an in-memory store.

use crate::error::PluginError;
use async_trait::async_trait;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Namespaced store of one custom resource kind
#[async_trait]
pub trait ObjectStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Objects matching an equality-based label selector
    async fn list(&self, selector: &str) -> Result<Vec<K>, PluginError>;

    async fn create(&self, object: &K) -> Result<K, PluginError>;

    /// Apply a JSON merge patch to the named object
    async fn patch(&self, name: &str, patch: &serde_json::Value) -> Result<K, PluginError>;

    /// Delete the named object; an already absent object is not an error
    async fn delete(&self, name: &str) -> Result<(), PluginError>;
}

/// [`ObjectStore`] backed by the Kubernetes API
pub struct KubeStore<K> {
    api: Api<K>,
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    /// Store over `namespace`
    pub fn namespaced(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
    K::DynamicType: Default,
{
    async fn list(&self, selector: &str) -> Result<Vec<K>, PluginError> {
        let list = self.api.list(&ListParams::default().labels(selector)).await?;
        debug!("Listed {} object(s) matching {}", list.items.len(), selector);
        Ok(list.items)
    }

    async fn create(&self, object: &K) -> Result<K, PluginError> {
        Ok(self.api.create(&PostParams::default(), object).await?)
    }

    async fn patch(&self, name: &str, patch: &serde_json::Value) -> Result<K, PluginError> {
        Ok(self
            .api
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?)
    }

    async fn delete(&self, name: &str) -> Result<(), PluginError> {
        match self.api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!("{} already deleted", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
