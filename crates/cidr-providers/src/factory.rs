//! Provider construction from declarations

use crate::error::ProviderError;
use crate::json_path::JsonFilter;
use crate::provider::{ConfigMapProvider, JsonEndpointProvider, Provider, SecretHeaderRef, StaticHttpProvider};
use crate::reader_trait::ClusterReader;
use crate::selector::{AwsSelector, DEFAULT_AWS_REGIONS, DEFAULT_AWS_SERVICES, GitHubSelector, GoogleSelector, Selector};
use crds::{AwsProviderSpec, ProviderKind, ProviderSpec};
use reqwest::Client;
use std::sync::Arc;

/// Google Cloud IP ranges feed
pub const DEFAULT_GOOGLE_ENDPOINT: &str = "https://www.gstatic.com/ipranges/goog.json";
/// AWS IP ranges feed
pub const DEFAULT_AWS_ENDPOINT: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";
/// GitHub meta API
pub const DEFAULT_GITHUB_ENDPOINT: &str = "https://api.github.com/meta";

/// Endpoints used by cloud providers that do not override `url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultEndpoints {
    /// Google Cloud feed
    pub google: String,
    /// AWS feed
    pub aws: String,
    /// GitHub meta API
    pub github: String,
}

impl Default for DefaultEndpoints {
    fn default() -> Self {
        Self {
            google: DEFAULT_GOOGLE_ENDPOINT.to_string(),
            aws: DEFAULT_AWS_ENDPOINT.to_string(),
            github: DEFAULT_GITHUB_ENDPOINT.to_string(),
        }
    }
}

/// Builds [`Provider`]s, sharing one HTTP client and cluster reader
#[derive(Debug, Clone)]
pub struct ProviderFactory {
    http: Client,
    cluster: Option<Arc<dyn ClusterReader>>,
    endpoints: DefaultEndpoints,
}

impl ProviderFactory {
    /// Creates a factory with the compiled-in endpoints.
    ///
    /// Without a `cluster` reader, `configMap` providers cannot be built and
    /// secret-backed headers fail when fetched.
    pub fn new(http: Client, cluster: Option<Arc<dyn ClusterReader>>) -> Self {
        Self {
            http,
            cluster,
            endpoints: DefaultEndpoints::default(),
        }
    }

    /// Overrides the Google endpoint; blank values are ignored
    pub fn with_google_endpoint(mut self, endpoint: Option<&str>) -> Self {
        if let Some(endpoint) = non_blank(endpoint) {
            self.endpoints.google = endpoint.to_string();
        }
        self
    }

    /// Overrides the AWS endpoint; blank values are ignored
    pub fn with_aws_endpoint(mut self, endpoint: Option<&str>) -> Self {
        if let Some(endpoint) = non_blank(endpoint) {
            self.endpoints.aws = endpoint.to_string();
        }
        self
    }

    /// Overrides the GitHub endpoint; blank values are ignored
    pub fn with_github_endpoint(mut self, endpoint: Option<&str>) -> Self {
        if let Some(endpoint) = non_blank(endpoint) {
            self.endpoints.github = endpoint.to_string();
        }
        self
    }

    /// Endpoints in effect after overrides
    pub fn endpoints(&self) -> &DefaultEndpoints {
        &self.endpoints
    }

    /// Validates `spec` and builds the provider it declares.
    /// `namespace` is the policy namespace, used for namespaced lookups.
    pub fn from_spec(&self, namespace: &str, spec: &ProviderSpec) -> Result<Provider, ProviderError> {
        let provider = match spec.validate()? {
            ProviderKind::Google => {
                let google = spec.google.as_ref();
                let url = url_or(google.and_then(|g| g.url.as_deref()), &self.endpoints.google);
                let scopes = google.map(|g| g.scope.as_slice()).unwrap_or_default();
                self.static_http(url, Selector::Google(GoogleSelector::new(scopes)))
            }
            ProviderKind::Aws => {
                let aws = spec.aws.as_ref();
                let url = url_or(aws.and_then(|a| a.url.as_deref()), &self.endpoints.aws);
                self.static_http(url, Selector::Aws(aws_selector(aws)))
            }
            ProviderKind::GitHub => {
                let github = spec.github.as_ref();
                let url = url_or(github.and_then(|g| g.url.as_deref()), &self.endpoints.github);
                let roles = github.map(|g| g.roles.as_slice()).unwrap_or_default();
                self.static_http(url, Selector::GitHub(GitHubSelector::new(roles)))
            }
            ProviderKind::ConfigMap => {
                let config = spec
                    .config_map
                    .as_ref()
                    .ok_or(ProviderError::MissingField("configMap"))?;
                let reader = self
                    .cluster
                    .clone()
                    .ok_or(ProviderError::ClusterReaderUnavailable("configMap providers"))?;
                let config_namespace = non_blank(config.namespace.as_deref()).unwrap_or(namespace);
                Provider::ConfigMap(ConfigMapProvider::new(reader, config_namespace, &config.name, &config.key))
            }
            ProviderKind::JsonEndpoint => {
                let config = spec
                    .json_endpoint
                    .as_ref()
                    .ok_or(ProviderError::MissingField("jsonEndpoint"))?;
                let mut provider =
                    JsonEndpointProvider::new(self.http.clone(), namespace, &config.url, &config.field_path)
                        .with_reader(self.cluster.clone());
                for (name, value) in &config.headers {
                    provider = provider.with_header(name, value);
                }
                for secret_ref in &config.header_secret_refs {
                    provider = provider.with_secret_header(SecretHeaderRef {
                        header: secret_ref.name.clone(),
                        secret_name: secret_ref.secret_key_ref.name.clone(),
                        key: secret_ref.secret_key_ref.key.clone(),
                    });
                }
                let filter = config
                    .filter
                    .as_ref()
                    .filter(|filter| !filter.field_conditions.is_empty())
                    .map(JsonFilter::from_spec);
                Provider::JsonEndpoint(provider.with_filter(filter))
            }
        };
        Ok(provider)
    }

    fn static_http(&self, url: &str, selector: Selector) -> Provider {
        Provider::StaticHttp(StaticHttpProvider::new(self.http.clone(), url, selector))
    }
}

/// No block: every prefix. With a block, omitted service/region lists fall
/// back to the built-in defaults and explicit empty lists disable the filter.
fn aws_selector(aws: Option<&AwsProviderSpec>) -> AwsSelector {
    let Some(aws) = aws else {
        return AwsSelector::unfiltered();
    };
    let defaults = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
    let services = aws.services.clone().unwrap_or_else(|| defaults(&DEFAULT_AWS_SERVICES));
    let regions = aws.regions.clone().unwrap_or_else(|| defaults(&DEFAULT_AWS_REGIONS));
    let network_border_groups = aws.network_border_groups.clone().unwrap_or_default();
    AwsSelector::new(services, regions, network_border_groups)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn url_or<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    non_blank(value).unwrap_or(default)
}
