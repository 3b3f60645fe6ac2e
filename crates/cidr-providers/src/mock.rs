//! In-memory ClusterReader for unit tests

use crate::error::ProviderError;
use crate::reader_trait::ClusterReader;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type ObjectKey = (String, String);

/// Mock ClusterReader storing ConfigMaps and Secrets by namespace/name
#[derive(Debug, Clone, Default)]
pub struct MockClusterReader {
    config_maps: Arc<Mutex<HashMap<ObjectKey, ConfigMap>>>,
    secrets: Arc<Mutex<HashMap<ObjectKey, Secret>>>,
    failure: Arc<Mutex<Option<String>>>,
    reads: Arc<Mutex<u32>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

impl MockClusterReader {
    /// Empty reader that serves every lookup as missing
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a ConfigMap with string data
    pub fn add_config_map(&self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        let config_map = ConfigMap {
            metadata: meta(namespace, name),
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        };
        lock(&self.config_maps).insert((namespace.to_string(), name.to_string()), config_map);
    }

    /// Store a Secret with binary data
    pub fn add_secret(&self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        let secret = Secret {
            metadata: meta(namespace, name),
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        };
        lock(&self.secrets).insert((namespace.to_string(), name.to_string()), secret);
    }

    /// Make every subsequent read fail
    pub fn fail_reads(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }

    /// Number of reads served so far
    pub fn read_count(&self) -> u32 {
        *lock(&self.reads)
    }

    fn check(&self) -> Result<(), ProviderError> {
        *lock(&self.reads) += 1;
        match lock(&self.failure).as_ref() {
            Some(message) => Err(ProviderError::NotFound(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ClusterReader for MockClusterReader {
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>, ProviderError> {
        self.check()?;
        Ok(lock(&self.config_maps)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ProviderError> {
        self.check()?;
        Ok(lock(&self.secrets)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}
