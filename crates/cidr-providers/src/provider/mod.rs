//! CIDR providers
//!
//! A provider fetches one CIDR source and returns a sanitized, non-empty list.
//! Fetches are plain futures: dropping one aborts the in-flight request, and
//! [`Provider::fetch_with_timeout`] bounds it with a deadline.

pub mod config_map;
pub mod json_endpoint;
pub mod static_http;

pub use config_map::ConfigMapProvider;
pub use json_endpoint::{JsonEndpointProvider, SecretHeaderRef};
pub use static_http::StaticHttpProvider;

use crate::error::ProviderError;
use reqwest::RequestBuilder;
use std::time::Duration;
use tracing::debug;

/// A configured CIDR source
#[derive(Debug, Clone)]
pub enum Provider {
    StaticHttp(StaticHttpProvider),
    ConfigMap(ConfigMapProvider),
    JsonEndpoint(JsonEndpointProvider),
}

impl Provider {
    /// Fetch and sanitize the source's CIDRs
    pub async fn fetch(&self) -> Result<Vec<String>, ProviderError> {
        match self {
            Self::StaticHttp(provider) => provider.fetch().await,
            Self::ConfigMap(provider) => provider.fetch().await,
            Self::JsonEndpoint(provider) => provider.fetch().await,
        }
    }

    /// [`Provider::fetch`] abandoned after `timeout`
    pub async fn fetch_with_timeout(&self, timeout: Duration) -> Result<Vec<String>, ProviderError> {
        tokio::time::timeout(timeout, self.fetch())
            .await
            .map_err(|_| ProviderError::Timeout(timeout))?
    }

    /// Where the provider reads from, for logs
    pub fn source(&self) -> String {
        match self {
            Self::StaticHttp(provider) => provider.url().to_string(),
            Self::ConfigMap(provider) => format!("configmap {}", provider.object_key()),
            Self::JsonEndpoint(provider) => provider.url().to_string(),
        }
    }
}

/// Sends a prepared GET and returns the body of a 2xx response
pub(crate) async fn get_body(request: RequestBuilder, url: &str) -> Result<String, ProviderError> {
    debug!("GET {}", url);
    let response = request.header("Accept", "application/json").send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::UnexpectedStatus(status.to_string()));
    }
    Ok(response.text().await?)
}
