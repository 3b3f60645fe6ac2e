//! NetworkPolicy rendering and comparison.
//!
//! Both functions are pure: the reconciler feeds them the resource and the
//! merged CIDR set and decides what to write from the result.

use crds::{BotNetworkPolicy, BotNetworkPolicySpec, OWNER_LABEL, PolicyType};
use k8s_openapi::api::networking::v1::{
    IPBlock, NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicyIngressRule, NetworkPolicyPeer,
    NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Directions the generated policy applies to.
///
/// An explicit list is used as given (duplicates dropped). Otherwise ingress
/// is on unless disabled, egress only when enabled, and ingress is forced when
/// both are off. Derived types come out sorted.
pub fn determine_policy_types(spec: &BotNetworkPolicySpec) -> Vec<PolicyType> {
    if !spec.policy_types.is_empty() {
        let mut types = Vec::with_capacity(spec.policy_types.len());
        for policy_type in &spec.policy_types {
            if !types.contains(policy_type) {
                types.push(*policy_type);
            }
        }
        return types;
    }

    let mut types = Vec::with_capacity(2);
    if spec.egress_enabled() {
        types.push(PolicyType::Egress);
    }
    if spec.ingress_enabled() || types.is_empty() {
        types.push(PolicyType::Ingress);
    }
    types
}

/// Desired NetworkPolicy for `policy` admitting `cidrs`
pub fn build_network_policy(policy: &BotNetworkPolicy, cidrs: &[String]) -> NetworkPolicy {
    let policy_types = determine_policy_types(&policy.spec);

    let peers: Vec<NetworkPolicyPeer> = cidrs
        .iter()
        .map(|cidr| NetworkPolicyPeer {
            ip_block: Some(IPBlock {
                cidr: cidr.clone(),
                except: None,
            }),
            ..Default::default()
        })
        .collect();

    let wants = |direction: PolicyType| !peers.is_empty() && policy_types.contains(&direction);
    let ingress = wants(PolicyType::Ingress).then(|| {
        vec![NetworkPolicyIngressRule {
            from: Some(peers.clone()),
            ports: None,
        }]
    });
    let egress = wants(PolicyType::Egress).then(|| {
        vec![NetworkPolicyEgressRule {
            to: Some(peers.clone()),
            ports: None,
        }]
    });

    NetworkPolicy {
        metadata: ObjectMeta {
            name: Some(policy.network_policy_name()),
            namespace: policy.namespace(),
            labels: Some(BTreeMap::from([(OWNER_LABEL.to_string(), policy.name_any())])),
            ..Default::default()
        },
        spec: Some(NetworkPolicySpec {
            pod_selector: Some(policy.spec.pod_selector.clone().unwrap_or_default()),
            policy_types: Some(policy_types.iter().map(|t| t.as_str().to_string()).collect()),
            ingress,
            egress,
        }),
    }
}

/// Whether `existing` already enforces what `desired` describes.
///
/// Compares policy types (order-insensitive), pod selector, and the IP block
/// peers of every ingress and egress rule. Absent and empty lists are equal,
/// and an absent pod selector equals the empty one.
pub fn network_policies_equal(existing: &NetworkPolicy, desired: &NetworkPolicy) -> bool {
    let empty = NetworkPolicySpec::default();
    let a = existing.spec.as_ref().unwrap_or(&empty);
    let b = desired.spec.as_ref().unwrap_or(&empty);

    sorted_policy_types(a) == sorted_policy_types(b)
        && rules_equal(a.ingress.as_deref(), b.ingress.as_deref(), |rule| rule.from.as_deref())
        && rules_equal(a.egress.as_deref(), b.egress.as_deref(), |rule| rule.to.as_deref())
        && selectors_equal(a.pod_selector.as_ref(), b.pod_selector.as_ref())
}

fn sorted_policy_types(spec: &NetworkPolicySpec) -> Vec<&str> {
    let mut types: Vec<&str> = spec
        .policy_types
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect();
    types.sort_unstable();
    types
}

fn rules_equal<R>(
    a: Option<&[R]>,
    b: Option<&[R]>,
    peers: impl Fn(&R) -> Option<&[NetworkPolicyPeer]>,
) -> bool {
    let (a, b) = (a.unwrap_or_default(), b.unwrap_or_default());
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            peers_equal(peers(x).unwrap_or_default(), peers(y).unwrap_or_default())
        })
}

fn peers_equal(a: &[NetworkPolicyPeer], b: &[NetworkPolicyPeer]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| match (&x.ip_block, &y.ip_block) {
            (None, None) => true,
            (Some(x), Some(y)) => {
                x.cidr == y.cidr
                    && x.except.as_deref().unwrap_or_default() == y.except.as_deref().unwrap_or_default()
            }
            _ => false,
        })
}

fn selectors_equal(a: Option<&LabelSelector>, b: Option<&LabelSelector>) -> bool {
    let match_all = LabelSelector::default();
    let (a, b) = (a.unwrap_or(&match_all), b.unwrap_or(&match_all));
    let no_labels = BTreeMap::new();
    if a.match_labels.as_ref().unwrap_or(&no_labels) != b.match_labels.as_ref().unwrap_or(&no_labels) {
        return false;
    }

    let (a, b) = (
        a.match_expressions.as_deref().unwrap_or_default(),
        b.match_expressions.as_deref().unwrap_or_default(),
    );
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.key == y.key
                && x.operator == y.operator
                && x.values.as_deref().unwrap_or_default() == y.values.as_deref().unwrap_or_default()
        })
}
