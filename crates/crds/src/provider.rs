//! Provider declarations
//!
//! A provider declaration names one CIDR source. The `name` field is a
//! case-insensitive discriminator; at most the configuration block matching it
//! may be populated.

use crate::error::ValidationError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    /// Provider type: google, aws, github, configMap or jsonEndpoint (case-insensitive)
    pub name: String,

    /// Overrides for the Google IP ranges provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleProviderSpec>,

    /// Overrides and filters for the AWS IP ranges provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsProviderSpec>,

    /// Overrides for the GitHub meta provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubProviderSpec>,

    /// ConfigMap provider configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapProviderSpec>,

    /// JSON endpoint provider configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_endpoint: Option<JsonEndpointProviderSpec>,
}

/// Google IP ranges (`goog.json` format)
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProviderSpec {
    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Only keep prefixes whose `scope` matches one of these (case-insensitive)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
}

/// AWS IP ranges (`ip-ranges.json` format)
///
/// Omitting `services` or `regions` applies the built-in defaults
/// (`AMAZON`/`AMAZON_CONNECT` and `GLOBAL`/`us-east-1`). An explicit empty list
/// disables that filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AwsProviderSpec {
    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_border_groups: Option<Vec<String>>,
}

/// GitHub meta API
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitHubProviderSpec {
    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Meta keys to read (hooks, web, api, actions, ...). Defaults to `hooks`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Fetches CIDRs from a ConfigMap key
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapProviderSpec {
    /// Name of the ConfigMap
    pub name: String,

    /// Namespace (defaults to the namespace of the BotNetworkPolicy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Data key holding newline, comma or semicolon separated CIDRs
    pub key: String,
}

/// Fetches CIDRs from a JSON REST endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JsonEndpointProviderSpec {
    /// HTTP endpoint to query
    pub url: String,

    /// Dot-separated path to the CIDR list in the response body
    pub field_path: String,

    /// Static request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Request headers sourced from Secrets in the policy namespace
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_secret_refs: Vec<HttpHeaderSecretRef>,

    /// Optional filter applied to object elements of the CIDR list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonFilterSpec>,
}

/// HTTP header whose value is read from a Secret key
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HttpHeaderSecretRef {
    /// HTTP header name
    pub name: String,

    /// Secret key holding the header value
    pub secret_key_ref: SecretKeySelector,
}

/// Key of a Secret in the policy namespace
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Secret name
    pub name: String,
    /// Data key
    pub key: String,
}

/// Element filter for `jsonEndpoint` array results
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JsonFilterSpec {
    /// All conditions must match for an element to be kept
    #[serde(default)]
    pub field_conditions: Vec<FieldCondition>,
}

/// Keeps elements whose `field` equals one of `values` (case-insensitive).
/// With no values the field only has to be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldCondition {
    /// Element key to inspect
    pub field: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Parsed provider discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    Aws,
    GitHub,
    ConfigMap,
    JsonEndpoint,
}

impl ProviderKind {
    /// Parses a provider name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "google" => Some(Self::Google),
            "aws" => Some(Self::Aws),
            "github" => Some(Self::GitHub),
            "configmap" => Some(Self::ConfigMap),
            "jsonendpoint" => Some(Self::JsonEndpoint),
            _ => None,
        }
    }

    /// Canonical spelling used in messages
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Aws => "aws",
            Self::GitHub => "github",
            Self::ConfigMap => "configMap",
            Self::JsonEndpoint => "jsonEndpoint",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderSpec {
    /// Resolves the discriminator without validating the configuration blocks
    pub fn kind(&self) -> Result<ProviderKind, ValidationError> {
        ProviderKind::from_name(&self.name)
            .ok_or_else(|| ValidationError::UnsupportedProvider(self.name.clone()))
    }

    /// Checks the declaration's shape and returns its kind.
    ///
    /// Required sub-fields are checked for `configMap` and `jsonEndpoint`;
    /// any populated block that belongs to another variant is rejected.
    pub fn validate(&self) -> Result<ProviderKind, ValidationError> {
        let kind = self.kind()?;
        self.reject_foreign_blocks(kind)?;

        match kind {
            ProviderKind::Google | ProviderKind::Aws | ProviderKind::GitHub => {}
            ProviderKind::ConfigMap => {
                let cfg = self.config_map.as_ref().ok_or(ValidationError::MissingBlock {
                    provider: "configMap",
                    block: "configMap",
                })?;
                if cfg.name.is_empty() || cfg.key.is_empty() {
                    return Err(ValidationError::MissingFields {
                        provider: "configMap",
                        fields: "name and key",
                    });
                }
            }
            ProviderKind::JsonEndpoint => {
                let cfg = self.json_endpoint.as_ref().ok_or(ValidationError::MissingBlock {
                    provider: "jsonEndpoint",
                    block: "jsonEndpoint",
                })?;
                if cfg.url.is_empty() || cfg.field_path.is_empty() {
                    return Err(ValidationError::MissingFields {
                        provider: "jsonEndpoint",
                        fields: "url and fieldPath",
                    });
                }
                for header_ref in &cfg.header_secret_refs {
                    if header_ref.name.trim().is_empty() {
                        return Err(ValidationError::HeaderSecretRef("name"));
                    }
                    if header_ref.secret_key_ref.name.is_empty()
                        || header_ref.secret_key_ref.key.is_empty()
                    {
                        return Err(ValidationError::HeaderSecretRef("secret name and key"));
                    }
                }
            }
        }

        Ok(kind)
    }

    fn reject_foreign_blocks(&self, kind: ProviderKind) -> Result<(), ValidationError> {
        let populated = [
            (ProviderKind::Google, self.google.is_some(), "google"),
            (ProviderKind::Aws, self.aws.is_some(), "aws"),
            (ProviderKind::GitHub, self.github.is_some(), "github"),
            (ProviderKind::ConfigMap, self.config_map.is_some(), "configMap"),
            (ProviderKind::JsonEndpoint, self.json_endpoint.is_some(), "jsonEndpoint"),
        ];
        match populated
            .iter()
            .find(|(owner, present, _)| *present && *owner != kind)
        {
            Some((_, _, block)) => Err(ValidationError::UnexpectedBlock {
                provider: self.name.clone(),
                block: *block,
            }),
            None => Ok(()),
        }
    }
}
