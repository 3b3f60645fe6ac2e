//! ClusterReader backed by the Kubernetes API

use crate::error::ProviderError;
use crate::reader_trait::ClusterReader;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Api, Client};
use std::fmt;
use tracing::debug;

/// Reads ConfigMaps and Secrets with the operator's service account
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    /// Reader using `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl fmt::Debug for KubeClusterReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClusterReader").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ClusterReader for KubeClusterReader {
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>, ProviderError> {
        debug!("Reading ConfigMap {}/{}", namespace, name);
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ProviderError> {
        debug!("Reading Secret {}/{}", namespace, name);
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}
