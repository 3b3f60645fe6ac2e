//! BotNetworkPolicy CRD
//!
//! Declares CIDR sources whose union is rendered into a NetworkPolicy that
//! admits (or permits egress to) those ranges for the selected pods.

use crate::error::ValidationError;
use crate::provider::ProviderSpec;
use crate::duration::parse_duration;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Annotation overriding the generated NetworkPolicy name
pub const NETWORK_POLICY_NAME_ANNOTATION: &str = "bot.networking.dev/networkpolicy-name";

/// Label binding a generated NetworkPolicy to its BotNetworkPolicy
pub const OWNER_LABEL: &str = "botnetworkpolicy.bot.networking.dev/owner";

/// Suffix appended to the resource name when no override annotation is set
pub const NETWORK_POLICY_NAME_SUFFIX: &str = "-allow-bots";

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "bot.networking.dev",
    version = "v1alpha1",
    kind = "BotNetworkPolicy",
    plural = "botnetworkpolicies",
    shortname = "bnp",
    namespaced,
    status = "BotNetworkPolicyStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct BotNetworkPolicySpec {
    /// Pods the NetworkPolicy applies to. Omitted selects every pod in the namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_selector: Option<LabelSelector>,

    /// Optionally restricts target namespaces. Currently informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,

    /// Explicit policy types. When empty they are derived from `ingress`/`egress`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_types: Vec<PolicyType>,

    /// Manage ingress rules (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<bool>,

    /// Manage egress rules (default false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress: Option<bool>,

    /// Providers consulted for IP ranges, in order
    #[serde(default)]
    pub providers: Vec<ProviderSpec>,

    /// Additional CIDRs merged into the generated NetworkPolicy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_cidrs: Vec<String>,

    /// Refresh interval for provider data, e.g. `30m` or `1h`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_period: Option<String>,
}

/// NetworkPolicy direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum PolicyType {
    Ingress,
    Egress,
}

impl PolicyType {
    /// Value used in `NetworkPolicySpec.policyTypes`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingress => "Ingress",
            Self::Egress => "Egress",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BotNetworkPolicyStatus {
    /// Last time providers were synchronised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<chrono::DateTime<chrono::Utc>>,

    /// Providers processed successfully during the last sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_count: Option<u32>,
}

impl BotNetworkPolicySpec {
    /// Ingress is managed unless explicitly disabled
    pub fn ingress_enabled(&self) -> bool {
        self.ingress.unwrap_or(true)
    }

    /// Egress is managed only when explicitly enabled
    pub fn egress_enabled(&self) -> bool {
        self.egress.unwrap_or(false)
    }

    /// Parsed `syncPeriod`. `None` when unset or zero.
    pub fn sync_period(&self) -> Result<Option<Duration>, ValidationError> {
        let Some(raw) = self.sync_period.as_deref() else {
            return Ok(None);
        };
        let period = parse_duration(raw).map_err(|reason| ValidationError::InvalidDuration {
            value: raw.to_string(),
            reason,
        })?;
        Ok((!period.is_zero()).then_some(period))
    }
}

impl BotNetworkPolicy {
    /// Name of the generated NetworkPolicy
    pub fn network_policy_name(&self) -> String {
        if let Some(name) = self
            .annotations()
            .get(NETWORK_POLICY_NAME_ANNOTATION)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
        {
            return name.to_string();
        }
        format!("{}{}", self.name_any(), NETWORK_POLICY_NAME_SUFFIX)
    }

    /// Validates every provider declaration and the sync period
    pub fn validate(&self) -> Result<(), ValidationError> {
        for provider in &self.spec.providers {
            provider.validate()?;
        }
        self.spec.sync_period()?;
        Ok(())
    }
}
