//! CIDRs kept in a ConfigMap key

use crate::error::ProviderError;
use crate::reader_trait::ClusterReader;
use crate::sanitize::{sanitize, split_cidrs};
use std::sync::Arc;
use tracing::debug;

/// Reads newline, comma or semicolon separated CIDRs from `namespace/name[key]`
#[derive(Debug, Clone)]
pub struct ConfigMapProvider {
    reader: Arc<dyn ClusterReader>,
    namespace: String,
    name: String,
    key: String,
}

impl ConfigMapProvider {
    /// Provider reading `key` of ConfigMap `namespace/name`
    pub fn new(
        reader: Arc<dyn ClusterReader>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            namespace: namespace.into(),
            name: name.into(),
            key: key.into(),
        }
    }

    /// `namespace/name`
    pub fn object_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Data key holding the CIDR list
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the key and splits it on newlines, commas and semicolons
    pub async fn fetch(&self) -> Result<Vec<String>, ProviderError> {
        debug!("Reading CIDRs from ConfigMap {} key {}", self.object_key(), self.key);
        let config_map = self
            .reader
            .get_config_map(&self.namespace, &self.name)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("configmap {}", self.object_key())))?;

        let value = config_map
            .data
            .as_ref()
            .and_then(|data| data.get(&self.key))
            .ok_or_else(|| ProviderError::MissingKey(self.key.clone()))?;
        sanitize(split_cidrs(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockClusterReader;

    #[tokio::test]
    async fn test_fetch_splits_value() {
        let reader = MockClusterReader::new();
        reader.add_config_map("default", "bots", &[("cidrs", "10.0.0.0/8\n192.168.0.0/16")]);

        let provider = ConfigMapProvider::new(Arc::new(reader), "default", "bots", "cidrs");
        let cidrs = provider.fetch().await.unwrap();
        assert_eq!(cidrs, vec!["10.0.0.0/8", "192.168.0.0/16"]);
    }

    #[tokio::test]
    async fn test_fetch_missing_config_map() {
        let provider = ConfigMapProvider::new(Arc::new(MockClusterReader::new()), "default", "bots", "cidrs");
        let err = provider.fetch().await.unwrap_err();
        assert_eq!(err.to_string(), "configmap default/bots not found");
    }

    #[tokio::test]
    async fn test_fetch_missing_key() {
        let reader = MockClusterReader::new();
        reader.add_config_map("default", "bots", &[("other", "10.0.0.0/8")]);

        let provider = ConfigMapProvider::new(Arc::new(reader), "default", "bots", "cidrs");
        let err = provider.fetch().await.unwrap_err();
        assert_eq!(err.to_string(), "configmap missing key: cidrs");
    }

    #[tokio::test]
    async fn test_fetch_blank_value() {
        let reader = MockClusterReader::new();
        reader.add_config_map("default", "bots", &[("cidrs", " \n ; ,")]);

        let provider = ConfigMapProvider::new(Arc::new(reader), "default", "bots", "cidrs");
        assert!(matches!(provider.fetch().await, Err(ProviderError::Empty)));
    }
}
