//! Kubernetes resource watcher.
//!
//! Drives the reconciler with `kube_runtime::Controller`. BotNetworkPolicy
//! spec or annotation changes trigger a reconciliation, as do changes to
//! owned NetworkPolicies. Status-only updates are filtered out.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::{BotNetworkPolicy, OWNER_LABEL};
use futures::StreamExt;
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::{Api, Client, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig, Error as RuntimeError};
use kube_runtime::{Predicate, predicates};
use kube_runtime::{Controller, WatchStreamExt, reflector, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

fn resource_key(policy: &BotNetworkPolicy) -> String {
    format!("{}/{}", policy.namespace().unwrap_or_default(), policy.name_any())
}

/// Changes that warrant a reconciliation: the spec (via generation) and
/// annotations, which carry the NetworkPolicy name override.
fn reconcile_trigger() -> impl Predicate<BotNetworkPolicy> {
    Predicate::<BotNetworkPolicy>::combine(predicates::generation, predicates::annotations)
}

async fn reconcile(policy: Arc<BotNetworkPolicy>, reconciler: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let key = resource_key(&policy);
    debug!("Reconciling BotNetworkPolicy {}", key);

    let outcome = reconciler
        .reconcile(&policy.namespace().unwrap_or_default(), &policy.name_any())
        .await?;
    reconciler.reset_backoff(&key);
    Ok(outcome.action())
}

fn error_policy(policy: Arc<BotNetworkPolicy>, error: &ControllerError, reconciler: Arc<Reconciler>) -> Action {
    let key = resource_key(&policy);
    let (delay, error_count) = reconciler.next_error_backoff(&key);
    error!(
        "Reconciliation failed for BotNetworkPolicy {} (attempt {}): {}, retrying in {:?}",
        key, error_count, error, delay
    );
    Action::requeue(delay)
}

/// Watches BotNetworkPolicies (and the NetworkPolicies they own) until shutdown.
pub async fn watch_bot_network_policies(
    client: Client,
    namespace: Option<&str>,
    reconciler: Arc<Reconciler>,
) -> Result<(), ControllerError> {
    let (policies, network_policies): (Api<BotNetworkPolicy>, Api<NetworkPolicy>) = match namespace {
        Some(ns) => (Api::namespaced(client.clone(), ns), Api::namespaced(client, ns)),
        None => (Api::all(client.clone()), Api::all(client)),
    };

    info!("Starting BotNetworkPolicy watcher");

    let (reader, writer) = reflector::store();
    let stream = watcher(policies, watcher::Config::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(reconcile_trigger());

    // Debounce batches bursts of NetworkPolicy events caused by our own writes.
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    let backoffs = Arc::clone(&reconciler);
    Controller::for_stream(stream, reader)
        .owns(network_policies, watcher::Config::default().labels(OWNER_LABEL))
        .with_config(controller_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| {
            let backoffs = Arc::clone(&backoffs);
            async move {
                match res {
                    Ok((obj, _action)) => debug!("Reconciled BotNetworkPolicy {}", obj),
                    // Deleted while a retry was scheduled
                    Err(RuntimeError::ObjectNotFound(obj)) => {
                        debug!("BotNetworkPolicy {} is gone, dropping its retry state", obj);
                        backoffs.reset_backoff(&format!(
                            "{}/{}",
                            obj.namespace.as_deref().unwrap_or_default(),
                            obj.name
                        ));
                    }
                    Err(e) => error!("Controller error for BotNetworkPolicy: {}", e),
                }
            }
        })
        .await;

    info!("BotNetworkPolicy watcher stopped");
    Ok(())
}
