//! BotNetworkPolicy reconciliation.
//!
//! One pass reads the resource, validates it, collects CIDRs from every
//! provider, renders the desired NetworkPolicy and applies it only when it
//! differs from what is in the cluster. Provider failures are tolerated and
//! reported as warning events; apply failures are returned to the caller.

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::policy::{build_network_policy, network_policies_equal};
use crate::store::{ClusterStore, PolicyEvent, reasons};
use cidr_providers::ProviderFactory;
use crds::{BotNetworkPolicy, BotNetworkPolicyStatus, ValidationError};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(1, 10), // 1 minute min, 10 minutes max
            error_count: 0,
        }
    }
}

/// What happened to the NetworkPolicy during apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The resource no longer exists
    Deleted,
    /// The resource failed validation; nothing was written
    InvalidSpec(ValidationError),
    Synced {
        applied: ApplyOutcome,
        cidr_count: usize,
        requeue_after: Duration,
    },
}

impl ReconcileOutcome {
    /// Invalid resources wait for their next change instead of being re-polled.
    pub fn action(&self) -> Action {
        match self {
            Self::Deleted | Self::InvalidSpec(_) => Action::await_change(),
            Self::Synced { requeue_after, .. } => Action::requeue(*requeue_after),
        }
    }
}

/// Merged provider output for one resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedCidrs {
    /// Deduplicated and sorted
    pub cidrs: Vec<String>,
    /// One entry per skipped provider
    pub warnings: Vec<String>,
    /// Providers that returned CIDRs
    pub provider_count: u32,
}

/// Reconciles BotNetworkPolicy resources.
pub struct Reconciler {
    store: Box<dyn ClusterStore>,
    factory: ProviderFactory,
    default_sync_period: Duration,
    fetch_timeout: Duration,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        store: impl ClusterStore + 'static,
        factory: ProviderFactory,
        default_sync_period: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store: Box::new(store),
            factory,
            default_sync_period,
            fetch_timeout,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs one pass for `namespace/name`.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<ReconcileOutcome, ControllerError> {
        let Some(policy) = self.store.get_policy(namespace, name).await? else {
            debug!("BotNetworkPolicy {}/{} not found, nothing to reconcile", namespace, name);
            self.reset_backoff(&format!("{}/{}", namespace, name));
            return Ok(ReconcileOutcome::Deleted);
        };

        let sync_period = match policy.validate().and_then(|()| policy.spec.sync_period()) {
            Ok(period) => period.unwrap_or(self.default_sync_period),
            Err(err) => {
                warn!("BotNetworkPolicy {}/{} has an invalid specification: {}", namespace, name, err);
                self.publish(&policy, PolicyEvent::warning(reasons::INVALID_SPEC, err.to_string()))
                    .await;
                return Ok(ReconcileOutcome::InvalidSpec(err));
            }
        };

        let collected = self.collect_cidrs(&policy).await;
        for warning in &collected.warnings {
            self.publish(&policy, PolicyEvent::warning(reasons::PROVIDER_WARNING, warning.clone()))
                .await;
        }
        info!(
            "Collected {} CIDRs for BotNetworkPolicy {}/{} from {} provider(s)",
            collected.cidrs.len(),
            namespace,
            name,
            collected.provider_count
        );

        let desired = build_network_policy(&policy, &collected.cidrs);
        let applied = self.ensure_network_policy(&policy, desired).await?;

        self.update_status(&policy, collected.provider_count).await;

        info!(
            "Reconciled BotNetworkPolicy {}/{} ({:?}), next sync in {:?}",
            namespace, name, applied, sync_period
        );
        Ok(ReconcileOutcome::Synced {
            applied,
            cidr_count: collected.cidrs.len(),
            requeue_after: sync_period,
        })
    }

    /// Fetches every declared provider and merges the results with `customCidrs`.
    ///
    /// Providers that cannot be built or fetched are skipped with a warning.
    pub async fn collect_cidrs(&self, policy: &BotNetworkPolicy) -> CollectedCidrs {
        let namespace = policy.namespace().unwrap_or_default();
        let mut merged = BTreeSet::new();
        let mut warnings = Vec::new();
        let mut provider_count = 0;

        for spec in &policy.spec.providers {
            let provider = match self.factory.from_spec(&namespace, spec) {
                Ok(provider) => provider,
                Err(err) => {
                    warn!("Provider {} skipped for {}/{}: {}", spec.name, namespace, policy.name_any(), err);
                    warnings.push(format!("provider {} skipped: {}", spec.name, err));
                    continue;
                }
            };

            match provider.fetch_with_timeout(self.fetch_timeout).await {
                Ok(cidrs) => {
                    debug!("Provider {} ({}) returned {} CIDRs", spec.name, provider.source(), cidrs.len());
                    provider_count += 1;
                    merged.extend(cidrs);
                }
                Err(err) => {
                    warn!("Provider {} ({}) fetch failed: {}", spec.name, provider.source(), err);
                    warnings.push(format!("provider {} fetch error: {}", spec.name, err));
                }
            }
        }

        merged.extend(
            policy
                .spec
                .custom_cidrs
                .iter()
                .map(|cidr| cidr.trim())
                .filter(|cidr| !cidr.is_empty())
                .map(str::to_string),
        );

        CollectedCidrs {
            cidrs: merged.into_iter().collect(),
            warnings,
            provider_count,
        }
    }

    /// Creates or updates the NetworkPolicy owned by `policy`.
    ///
    /// An existing NetworkPolicy of the same name that `policy` does not control
    /// is left untouched and reported as a conflict.
    pub async fn ensure_network_policy(
        &self,
        policy: &BotNetworkPolicy,
        mut desired: NetworkPolicy,
    ) -> Result<ApplyOutcome, ControllerError> {
        let namespace = policy
            .namespace()
            .ok_or_else(|| ControllerError::MissingMetadata(policy.name_any(), "namespace"))?;
        let name = desired.name_any();

        let Some(existing) = self.store.get_network_policy(&namespace, &name).await? else {
            let owner = policy
                .controller_owner_ref(&())
                .ok_or_else(|| ControllerError::MissingMetadata(policy.name_any(), "uid"))?;
            desired.metadata.owner_references = Some(vec![owner]);

            info!("Creating NetworkPolicy {}/{}", namespace, name);
            self.store.create_network_policy(&namespace, &desired).await?;
            self.publish(
                policy,
                PolicyEvent::normal(reasons::NETWORK_POLICY_CREATED, format!("Created NetworkPolicy {}", name)),
            )
            .await;
            return Ok(ApplyOutcome::Created);
        };

        if !is_controlled_by(&existing, policy) {
            return Err(ControllerError::OwnershipConflict { namespace, name });
        }

        if network_policies_equal(&existing, &desired) {
            debug!("NetworkPolicy {}/{} is up to date", namespace, name);
            return Ok(ApplyOutcome::Unchanged);
        }

        let mut updated = existing;
        updated.spec = desired.spec;
        updated.metadata.labels = desired.metadata.labels;
        updated.metadata.annotations = desired.metadata.annotations;

        info!("Updating NetworkPolicy {}/{}", namespace, name);
        self.store.replace_network_policy(&namespace, &updated).await?;
        self.publish(
            policy,
            PolicyEvent::normal(reasons::NETWORK_POLICY_UPDATED, format!("Updated NetworkPolicy {}", name)),
        )
        .await;
        Ok(ApplyOutcome::Updated)
    }

    async fn update_status(&self, policy: &BotNetworkPolicy, provider_count: u32) {
        let namespace = policy.namespace().unwrap_or_default();
        let name = policy.name_any();
        let status = BotNetworkPolicyStatus {
            last_sync_time: Some(chrono::Utc::now()),
            provider_count: Some(provider_count),
        };
        if let Err(e) = self.store.patch_policy_status(&namespace, &name, &status).await {
            warn!("Failed to update status of BotNetworkPolicy {}/{}: {}", namespace, name, e);
        }
    }

    async fn publish(&self, policy: &BotNetworkPolicy, event: PolicyEvent) {
        let reason = event.reason;
        if let Err(e) = self.store.publish_event(policy, event).await {
            warn!(
                "Failed to publish {} event for BotNetworkPolicy {}/{}: {}",
                reason,
                policy.namespace().unwrap_or_default(),
                policy.name_any(),
                e
            );
        }
    }

    /// Next retry delay for a failing resource and how many failures preceded it
    pub fn next_error_backoff(&self, resource_key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                state.error_count += 1;
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_secs(60), 0)
            }
        }
    }

    /// Forget the failure history of a resource (on success or once it is gone)
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }
}

/// Whether `policy` is the controller owner of `network_policy`, by UID
fn is_controlled_by(network_policy: &NetworkPolicy, policy: &BotNetworkPolicy) -> bool {
    let Some(uid) = policy.uid() else {
        return false;
    };
    network_policy
        .owner_references()
        .iter()
        .any(|owner| owner.controller == Some(true) && owner.uid == uid)
}
