//! Test utilities for unit testing the reconciler
//!
//! Provides resource builders and an in-memory [`ClusterStore`].

use crate::error::ControllerError;
use crate::store::{ClusterStore, PolicyEvent};
use crds::*;
use k8s_openapi::api::networking::v1::NetworkPolicy;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Helper to create a BotNetworkPolicy with a UID and an empty spec
pub fn create_test_policy(name: &str, namespace: &str) -> BotNetworkPolicy {
    BotNetworkPolicy {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(uuid::Uuid::new_v4().to_string()),
            generation: Some(1),
            ..Default::default()
        },
        spec: BotNetworkPolicySpec::default(),
        status: None,
    }
}

/// Helper to create a `configMap` provider declaration
pub fn config_map_provider(name: &str, key: &str) -> ProviderSpec {
    ProviderSpec {
        name: "configMap".to_string(),
        config_map: Some(ConfigMapProviderSpec {
            name: name.to_string(),
            namespace: None,
            key: key.to_string(),
        }),
        ..Default::default()
    }
}

fn key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`ClusterStore`] recording every write
#[derive(Clone, Default)]
pub struct InMemoryStore {
    policies: Arc<Mutex<HashMap<String, BotNetworkPolicy>>>,
    network_policies: Arc<Mutex<HashMap<String, NetworkPolicy>>>,
    statuses: Arc<Mutex<HashMap<String, BotNetworkPolicyStatus>>>,
    events: Arc<Mutex<Vec<PolicyEvent>>>,
    creates: Arc<Mutex<u32>>,
    replaces: Arc<Mutex<u32>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_policy(&self, policy: BotNetworkPolicy) {
        let k = key(
            policy.metadata.namespace.as_deref().unwrap_or_default(),
            policy.metadata.name.as_deref().unwrap_or_default(),
        );
        lock(&self.policies).insert(k, policy);
    }

    /// Seeds a NetworkPolicy without counting it as a write
    pub fn add_network_policy(&self, policy: NetworkPolicy) {
        let k = key(
            policy.metadata.namespace.as_deref().unwrap_or_default(),
            policy.metadata.name.as_deref().unwrap_or_default(),
        );
        lock(&self.network_policies).insert(k, policy);
    }

    pub fn network_policy(&self, namespace: &str, name: &str) -> Option<NetworkPolicy> {
        lock(&self.network_policies).get(&key(namespace, name)).cloned()
    }

    pub fn status(&self, namespace: &str, name: &str) -> Option<BotNetworkPolicyStatus> {
        lock(&self.statuses).get(&key(namespace, name)).cloned()
    }

    pub fn events(&self) -> Vec<PolicyEvent> {
        lock(&self.events).clone()
    }

    /// Events published with `reason`
    pub fn events_with_reason(&self, reason: &str) -> Vec<PolicyEvent> {
        lock(&self.events)
            .iter()
            .filter(|event| event.reason == reason)
            .cloned()
            .collect()
    }

    pub fn create_count(&self) -> u32 {
        *lock(&self.creates)
    }

    pub fn replace_count(&self) -> u32 {
        *lock(&self.replaces)
    }
}

#[async_trait::async_trait]
impl ClusterStore for InMemoryStore {
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<BotNetworkPolicy>, ControllerError> {
        Ok(lock(&self.policies).get(&key(namespace, name)).cloned())
    }

    async fn get_network_policy(&self, namespace: &str, name: &str) -> Result<Option<NetworkPolicy>, ControllerError> {
        Ok(self.network_policy(namespace, name))
    }

    async fn create_network_policy(&self, namespace: &str, policy: &NetworkPolicy) -> Result<NetworkPolicy, ControllerError> {
        let name = policy.metadata.name.as_deref().unwrap_or_default();
        *lock(&self.creates) += 1;
        lock(&self.network_policies).insert(key(namespace, name), policy.clone());
        Ok(policy.clone())
    }

    async fn replace_network_policy(&self, namespace: &str, policy: &NetworkPolicy) -> Result<NetworkPolicy, ControllerError> {
        let name = policy.metadata.name.as_deref().unwrap_or_default();
        *lock(&self.replaces) += 1;
        lock(&self.network_policies).insert(key(namespace, name), policy.clone());
        Ok(policy.clone())
    }

    async fn patch_policy_status(
        &self,
        namespace: &str,
        name: &str,
        status: &BotNetworkPolicyStatus,
    ) -> Result<(), ControllerError> {
        lock(&self.statuses).insert(key(namespace, name), status.clone());
        Ok(())
    }

    async fn publish_event(&self, _policy: &BotNetworkPolicy, event: PolicyEvent) -> Result<(), ControllerError> {
        lock(&self.events).push(event);
        Ok(())
    }
}
