//! Cluster access for the reconciler.
//!
//! The reconciler only talks to the cluster through [`ClusterStore`] so unit
//! tests can run it against an in-memory implementation.

use crate::error::ControllerError;
use crds::{BotNetworkPolicy, BotNetworkPolicyStatus};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use std::fmt;
use tracing::debug;

/// Event reasons published on BotNetworkPolicy resources
pub mod reasons {
    pub const INVALID_SPEC: &str = "InvalidSpec";
    pub const PROVIDER_WARNING: &str = "ProviderWarning";
    pub const NETWORK_POLICY_CREATED: &str = "NetworkPolicyCreated";
    pub const NETWORK_POLICY_UPDATED: &str = "NetworkPolicyUpdated";
}

/// Severity of a [`PolicyEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Normal,
    Warning,
}

/// Kubernetes event attached to a BotNetworkPolicy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEvent {
    pub kind: EventKind,
    pub reason: &'static str,
    pub note: String,
}

impl PolicyEvent {
    pub fn warning(reason: &'static str, note: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Warning,
            reason,
            note: note.into(),
        }
    }

    pub fn normal(reason: &'static str, note: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Normal,
            reason,
            note: note.into(),
        }
    }
}

/// Cluster operations needed by one reconciliation
///
/// Lookups return `Ok(None)` when the object does not exist.
#[async_trait::async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<BotNetworkPolicy>, ControllerError>;

    async fn get_network_policy(&self, namespace: &str, name: &str) -> Result<Option<NetworkPolicy>, ControllerError>;

    async fn create_network_policy(&self, namespace: &str, policy: &NetworkPolicy) -> Result<NetworkPolicy, ControllerError>;

    /// Full update; `policy` carries the resourceVersion it was read at
    async fn replace_network_policy(&self, namespace: &str, policy: &NetworkPolicy) -> Result<NetworkPolicy, ControllerError>;

    async fn patch_policy_status(
        &self,
        namespace: &str,
        name: &str,
        status: &BotNetworkPolicyStatus,
    ) -> Result<(), ControllerError>;

    async fn publish_event(&self, policy: &BotNetworkPolicy, event: PolicyEvent) -> Result<(), ControllerError>;
}

/// [`ClusterStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    recorder: Recorder,
}

impl KubeStore {
    pub fn new(client: Client, reporter: Reporter) -> Self {
        let recorder = Recorder::new(client.clone(), reporter);
        Self { client, recorder }
    }

    fn policies(&self, namespace: &str) -> Api<BotNetworkPolicy> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn network_policies(&self, namespace: &str) -> Api<NetworkPolicy> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ClusterStore for KubeStore {
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<BotNetworkPolicy>, ControllerError> {
        Ok(self.policies(namespace).get_opt(name).await?)
    }

    async fn get_network_policy(&self, namespace: &str, name: &str) -> Result<Option<NetworkPolicy>, ControllerError> {
        Ok(self.network_policies(namespace).get_opt(name).await?)
    }

    async fn create_network_policy(&self, namespace: &str, policy: &NetworkPolicy) -> Result<NetworkPolicy, ControllerError> {
        Ok(self
            .network_policies(namespace)
            .create(&PostParams::default(), policy)
            .await?)
    }

    async fn replace_network_policy(&self, namespace: &str, policy: &NetworkPolicy) -> Result<NetworkPolicy, ControllerError> {
        let name = policy.metadata.name.as_deref().unwrap_or_default();
        Ok(self
            .network_policies(namespace)
            .replace(name, &PostParams::default(), policy)
            .await?)
    }

    async fn patch_policy_status(
        &self,
        namespace: &str,
        name: &str,
        status: &BotNetworkPolicyStatus,
    ) -> Result<(), ControllerError> {
        debug!("Patching status of BotNetworkPolicy {}/{}", namespace, name);
        let patch = serde_json::json!({ "status": status });
        self.policies(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn publish_event(&self, policy: &BotNetworkPolicy, event: PolicyEvent) -> Result<(), ControllerError> {
        let type_ = match event.kind {
            EventKind::Normal => EventType::Normal,
            EventKind::Warning => EventType::Warning,
        };
        self.recorder
            .publish(
                &Event {
                    type_,
                    reason: event.reason.to_string(),
                    note: Some(event.note),
                    action: "Reconcile".to_string(),
                    secondary: None,
                },
                &policy.object_ref(&()),
            )
            .await?;
        Ok(())
    }
}
