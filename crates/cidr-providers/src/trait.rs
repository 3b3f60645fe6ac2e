//! Cluster read access for providers
//!
//! ConfigMap-backed providers and secret-backed request headers read cluster
//! objects through this trait so tests can substitute an in-memory store.

use crate::error::ProviderError;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};

/// Read-only access to the namespaced objects providers depend on
///
/// A missing object is `Ok(None)`; errors are reserved for API failures.
#[async_trait::async_trait]
pub trait ClusterReader: Send + Sync + std::fmt::Debug {
    /// Fetches ConfigMap `namespace/name`
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>, ProviderError>;

    /// Fetches Secret `namespace/name`
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ProviderError>;
}
