//! Test utilities for unit testing the reconciler and the hooks
//!
//! Provides an in-memory `ObjectStore` with merge-patch semantics, and fixtures wiring
//! a `Plugin` to mocks.

use crate::cluster::ObjectStore;
use crate::config::PluginConfig;
use crate::error::PluginError;
use crate::groups::GroupManager;
use crate::lifecycle::Plugin;
use crate::models::{Environment, PermissionGrant};
use crate::reconciler::Reconciler;
use async_trait::async_trait;
use crds::{Grafana, GrafanaDatasource};
use keycloak_client::MockKeycloakClient;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Apply an RFC 7386 JSON merge patch to `target`
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(entries) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(fields) = target {
        for (key, value) in entries {
            if value.is_null() {
                fields.remove(key);
            } else {
                merge_patch(fields.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Number of calls per store verb
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub creates: usize,
    pub patches: usize,
    pub deletes: usize,
}

/// In-memory namespaced store of one kind, keyed by name
///
/// Clones share the same state, so a test can keep a handle on a store it boxed into a
/// `Reconciler`.
pub struct MockObjectStore<K> {
    objects: Arc<Mutex<BTreeMap<String, K>>>,
    calls: Arc<Mutex<StoreCalls>>,
    // "verb" or "verb:name"
    failures: Arc<Mutex<HashSet<String>>>,
}

impl<K> Clone for MockObjectStore<K> {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
            calls: Arc::clone(&self.calls),
            failures: Arc::clone(&self.failures),
        }
    }
}

impl<K> MockObjectStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned,
{
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            calls: Arc::new(Mutex::new(StoreCalls::default())),
            failures: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Store an object directly (for test setup)
    pub fn insert(&self, object: K) {
        lock(&self.objects).insert(object.name_any(), object);
    }

    pub fn get(&self, name: &str) -> Option<K> {
        lock(&self.objects).get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn calls(&self) -> StoreCalls {
        *lock(&self.calls)
    }

    /// Make every call of `verb` fail
    pub fn fail_on(&self, verb: &str) {
        lock(&self.failures).insert(verb.to_string());
    }

    /// Make `verb` fail for the object `name` only
    pub fn fail_on_object(&self, verb: &str, name: &str) {
        lock(&self.failures).insert(format!("{}:{}", verb, name));
    }

    fn check_failure(&self, verb: &str, name: Option<&str>) -> Result<(), PluginError> {
        let failures = lock(&self.failures);
        let targeted = name.is_some_and(|name| failures.contains(&format!("{}:{}", verb, name)));
        if failures.contains(verb) || targeted {
            return Err(PluginError::Cluster(format!(
                "injected {} failure{}",
                verb,
                name.map(|name| format!(" on {}", name)).unwrap_or_default()
            )));
        }
        Ok(())
    }
}

fn matches_selector(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key).map(String::as_str) == Some(value),
            None => false,
        })
}

#[async_trait]
impl<K> ObjectStore<K> for MockObjectStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn list(&self, selector: &str) -> Result<Vec<K>, PluginError> {
        self.check_failure("list", None)?;
        Ok(lock(&self.objects)
            .values()
            .filter(|object| matches_selector(object.labels(), selector))
            .cloned()
            .collect())
    }

    async fn create(&self, object: &K) -> Result<K, PluginError> {
        let name = object.name_any();
        self.check_failure("create", Some(&name))?;
        let mut objects = lock(&self.objects);
        if objects.contains_key(&name) {
            return Err(PluginError::Cluster(format!("{} already exists", name)));
        }
        objects.insert(name, object.clone());
        lock(&self.calls).creates += 1;
        Ok(object.clone())
    }

    async fn patch(&self, name: &str, patch: &Value) -> Result<K, PluginError> {
        self.check_failure("patch", Some(name))?;
        let mut objects = lock(&self.objects);
        let current = objects
            .get(name)
            .ok_or_else(|| PluginError::Cluster(format!("{} not found", name)))?;

        let mut merged = serde_json::to_value(current)?;
        merge_patch(&mut merged, patch);
        let patched: K = serde_json::from_value(merged)?;

        objects.insert(name.to_string(), patched.clone());
        lock(&self.calls).patches += 1;
        Ok(patched)
    }

    async fn delete(&self, name: &str) -> Result<(), PluginError> {
        self.check_failure("delete", Some(name))?;
        lock(&self.objects).remove(name);
        lock(&self.calls).deletes += 1;
        Ok(())
    }
}

/// Configuration with every required value set
pub fn test_config() -> PluginConfig {
    PluginConfig::from_lookup(|key| {
        let value = match key {
            "KEYCLOAK_URL" => "https://keycloak.example.com",
            "KEYCLOAK_REALM" => "dso",
            "KEYCLOAK_ADMIN" => "admin",
            "KEYCLOAK_ADMIN_PASSWORD" => "admin-password",
            "KEYCLOAK_CLIENT_SECRET_GRAFANA" => "oauth-secret",
            "GRAFANA_HOST" => "grafana.apps.example.com",
            "GRAFANA_URL" => "https://grafana.apps.example.com",
            "MIMIR_URL" => "http://mimir.monitoring:8080",
            _ => return None,
        };
        Some(value.to_string())
    })
    .unwrap()
}

pub fn env(name: &str, stage: &str) -> Environment {
    Environment {
        name: name.to_string(),
        stage: stage.to_string(),
        permissions: Vec::new(),
    }
}

pub fn grant(user_id: &str, ro: bool, rw: bool) -> PermissionGrant {
    PermissionGrant {
        user_id: user_id.to_string(),
        ro,
        rw,
    }
}

/// Plugin wired to mocks, with handles on the mocks
pub struct TestHarness {
    pub keycloak: MockKeycloakClient,
    pub instances: MockObjectStore<Grafana>,
    pub datasources: MockObjectStore<GrafanaDatasource>,
    pub plugin: Plugin,
}

impl TestHarness {
    /// Harness whose Keycloak already holds the root group of `acme`/`shop`
    pub fn new() -> Self {
        let keycloak = MockKeycloakClient::new("http://test-keycloak");
        keycloak.add_group("acme-shop");
        Self::with_keycloak(keycloak)
    }

    pub fn with_keycloak(keycloak: MockKeycloakClient) -> Self {
        let instances = MockObjectStore::new();
        let datasources = MockObjectStore::new();
        let plugin = Plugin::new(
            GroupManager::new(Box::new(keycloak.clone())),
            test_reconciler(&instances, &datasources),
        );
        Self {
            keycloak,
            instances,
            datasources,
            plugin,
        }
    }
}

pub fn test_reconciler(
    instances: &MockObjectStore<Grafana>,
    datasources: &MockObjectStore<GrafanaDatasource>,
) -> Reconciler {
    Reconciler::new(
        Arc::new(test_config()),
        Box::new(instances.clone()),
        Box::new(datasources.clone()),
    )
}
