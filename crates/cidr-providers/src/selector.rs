//! Payload selectors for the built-in cloud IP range feeds
//!
//! Each selector turns a decoded JSON object into a raw CIDR list. Filters are
//! case-insensitive allow-lists; an empty allow-list disables that filter.

use crate::error::ProviderError;
use serde_json::{Map, Value};

/// Services kept by the AWS selector when a filter block omits `services`
pub const DEFAULT_AWS_SERVICES: [&str; 2] = ["AMAZON", "AMAZON_CONNECT"];

/// Regions kept by the AWS selector when a filter block omits `regions`
pub const DEFAULT_AWS_REGIONS: [&str; 2] = ["GLOBAL", "us-east-1"];

/// Role read from the GitHub meta payload when none is requested
pub const DEFAULT_GITHUB_ROLE: &str = "hooks";

/// Source-specific extraction bound to its filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Google(GoogleSelector),
    Aws(AwsSelector),
    GitHub(GitHubSelector),
}

impl Selector {
    /// Extracts raw (unsanitised) CIDRs from a decoded payload
    pub fn select(&self, data: &Map<String, Value>) -> Result<Vec<String>, ProviderError> {
        match self {
            Self::Google(selector) => selector.select(data),
            Self::Aws(selector) => selector.select(data),
            Self::GitHub(selector) => selector.select(data),
        }
    }
}

/// `goog.json`: `prefixes[].{ipv4Prefix,ipv6Prefix,scope}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoogleSelector {
    scopes: Vec<String>,
}

impl GoogleSelector {
    /// Keeps prefixes whose `scope` is in `scopes`; empty keeps all
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            scopes: allow_list(scopes),
        }
    }

    fn select(&self, data: &Map<String, Value>) -> Result<Vec<String>, ProviderError> {
        let mut cidrs = Vec::new();
        for prefix in prefixes(data)? {
            if !field_allowed(&self.scopes, prefix, "scope") {
                continue;
            }
            for field in ["ipv4Prefix", "ipv6Prefix"] {
                if let Some(cidr) = trimmed_str(prefix, field) {
                    cidrs.push(cidr.to_string());
                }
            }
        }
        Ok(cidrs)
    }
}

/// `ip-ranges.json`: `prefixes[].{ip_prefix,service,region,network_border_group}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSelector {
    services: Vec<String>,
    regions: Vec<String>,
    network_border_groups: Vec<String>,
}

impl AwsSelector {
    /// AND-combined allow-lists; an empty list does not filter
    pub fn new<S: AsRef<str>>(
        services: impl IntoIterator<Item = S>,
        regions: impl IntoIterator<Item = S>,
        network_border_groups: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            services: allow_list(services),
            regions: allow_list(regions),
            network_border_groups: allow_list(network_border_groups),
        }
    }

    /// Keeps every prefix
    pub fn unfiltered() -> Self {
        Self::default()
    }

    /// Built-in service and region allow-lists, any border group
    pub fn with_default_filters() -> Self {
        Self {
            services: allow_list(DEFAULT_AWS_SERVICES),
            regions: allow_list(DEFAULT_AWS_REGIONS),
            network_border_groups: Vec::new(),
        }
    }

    fn select(&self, data: &Map<String, Value>) -> Result<Vec<String>, ProviderError> {
        let mut cidrs = Vec::new();
        for prefix in prefixes(data)? {
            if !field_allowed(&self.services, prefix, "service")
                || !field_allowed(&self.regions, prefix, "region")
                || !field_allowed(&self.network_border_groups, prefix, "network_border_group")
            {
                continue;
            }
            if let Some(cidr) = trimmed_str(prefix, "ip_prefix") {
                cidrs.push(cidr.to_string());
            }
        }
        Ok(cidrs)
    }
}

/// GitHub meta API: role-keyed arrays of CIDR strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitHubSelector {
    roles: Vec<String>,
}

impl GitHubSelector {
    /// Collects the listed roles, `hooks` when empty
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            roles: allow_list(roles),
        }
    }

    fn select(&self, data: &Map<String, Value>) -> Result<Vec<String>, ProviderError> {
        let requested = if self.roles.is_empty() {
            vec![DEFAULT_GITHUB_ROLE.to_string()]
        } else {
            self.roles.clone()
        };

        let mut cidrs = Vec::new();
        for role in &requested {
            let Some(Value::Array(entries)) = data.get(role) else {
                continue;
            };
            cidrs.extend(
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|cidr| !cidr.is_empty())
                    .map(str::to_string),
            );
        }

        if cidrs.is_empty() {
            // An explicitly empty default role is not a malformed payload.
            let default_role_empty = matches!(
                data.get(DEFAULT_GITHUB_ROLE),
                Some(Value::Array(entries)) if entries.is_empty()
            );
            if self.roles.is_empty() && default_role_empty {
                return Ok(cidrs);
            }
            return Err(ProviderError::NoCidrsForRoles(requested));
        }
        Ok(cidrs)
    }
}

fn allow_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().trim().to_lowercase())
        .collect()
}

fn prefixes(data: &Map<String, Value>) -> Result<impl Iterator<Item = &Map<String, Value>>, ProviderError> {
    match data.get("prefixes") {
        Some(Value::Array(entries)) => Ok(entries.iter().filter_map(Value::as_object)),
        _ => Err(ProviderError::MissingField("prefixes")),
    }
}

fn field_allowed(allow: &[String], item: &Map<String, Value>, field: &str) -> bool {
    if allow.is_empty() {
        return true;
    }
    let value = item
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    allow.contains(&value)
}

fn trimmed_str<'a>(item: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    item.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn aws_payload() -> Map<String, Value> {
        object(json!({
            "prefixes": [
                {"ip_prefix": "3.5.140.0/22", "region": "ap-northeast-2", "service": "AMAZON", "network_border_group": "ap-northeast-2"},
                {"ip_prefix": "52.94.76.0/22", "region": "us-east-1", "service": "AMAZON", "network_border_group": "us-east-1"},
                {"ip_prefix": "15.230.56.0/24", "region": "GLOBAL", "service": "AMAZON_CONNECT", "network_border_group": "GLOBAL"},
                {"ip_prefix": "13.34.37.64/27", "region": "us-east-1", "service": "EC2", "network_border_group": "us-east-1-wl1"}
            ]
        }))
    }

    #[test]
    fn test_google_extracts_both_families() {
        let data = object(json!({
            "prefixes": [
                {"ipv4Prefix": " 8.8.4.0/24 ", "scope": "us-central1"},
                {"ipv6Prefix": "2001:4860::/32", "scope": "europe-west1"},
                {"ipv4Prefix": ""}
            ]
        }));
        let cidrs = Selector::Google(GoogleSelector::default()).select(&data).unwrap();
        assert_eq!(cidrs, vec!["8.8.4.0/24", "2001:4860::/32"]);
    }

    #[test]
    fn test_google_scope_filter_is_case_insensitive() {
        let data = object(json!({
            "prefixes": [
                {"ipv4Prefix": "8.8.4.0/24", "scope": "us-central1"},
                {"ipv4Prefix": "8.34.208.0/20", "scope": "europe-west1"}
            ]
        }));
        let cidrs = GoogleSelector::new(["US-Central1"]).select(&data).unwrap();
        assert_eq!(cidrs, vec!["8.8.4.0/24"]);
    }

    #[test]
    fn test_missing_prefixes() {
        let data = object(json!({"syncToken": "1"}));
        let err = Selector::Aws(AwsSelector::unfiltered()).select(&data).unwrap_err();
        assert_eq!(err.to_string(), "missing prefixes");
        assert!(GoogleSelector::default().select(&data).is_err());
    }

    #[test]
    fn test_aws_default_filters() {
        let cidrs = AwsSelector::with_default_filters().select(&aws_payload()).unwrap();
        assert_eq!(cidrs, vec!["52.94.76.0/22", "15.230.56.0/24"]);
    }

    #[test]
    fn test_aws_unfiltered() {
        let cidrs = AwsSelector::unfiltered().select(&aws_payload()).unwrap();
        assert_eq!(cidrs.len(), 4);
    }

    #[test]
    fn test_aws_filters_are_and_combined() {
        let selector = AwsSelector::new(["ec2", "amazon"], ["US-EAST-1"], ["us-east-1-wl1"]);
        let cidrs = selector.select(&aws_payload()).unwrap();
        assert_eq!(cidrs, vec!["13.34.37.64/27"]);
    }

    #[test]
    fn test_github_default_role() {
        let data = object(json!({
            "hooks": ["192.30.252.0/22", " 185.199.108.0/22 "],
            "web": ["140.82.112.0/20"]
        }));
        let cidrs = GitHubSelector::default().select(&data).unwrap();
        assert_eq!(cidrs, vec!["192.30.252.0/22", "185.199.108.0/22"]);
    }

    #[test]
    fn test_github_requested_roles_skip_missing_keys() {
        let data = object(json!({
            "web": ["140.82.112.0/20"],
            "api": ["143.55.64.0/20", 42]
        }));
        let cidrs = GitHubSelector::new(["Web", "api", "actions"]).select(&data).unwrap();
        assert_eq!(cidrs, vec!["140.82.112.0/20", "143.55.64.0/20"]);
    }

    #[test]
    fn test_github_empty_default_role_is_lenient() {
        let data = object(json!({"hooks": []}));
        assert_eq!(GitHubSelector::default().select(&data).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_github_no_cidrs_for_requested_roles() {
        let data = object(json!({"hooks": [], "web": []}));
        let err = GitHubSelector::new(["web", "api"]).select(&data).unwrap_err();
        assert_eq!(err.to_string(), "no CIDRs found for roles: web, api");

        let err = GitHubSelector::default().select(&object(json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "no CIDRs found for roles: hooks");
    }
}
