//! Main controller implementation.
//!
//! Builds the Kubernetes client, the provider factory and the reconciler
//! from [`OperatorConfig`], then hands them to the watcher.

use crate::config::OperatorConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::store::KubeStore;
use crate::watcher::watch_bot_network_policies;
use cidr_providers::{ClusterReader, KubeClusterReader, ProviderFactory};
use kube::Client;
use kube_runtime::events::Reporter;
use std::sync::Arc;
use tracing::info;

/// Name reported on published events
pub const CONTROLLER_NAME: &str = "botnetworkpolicy-controller";

/// Main controller for BotNetworkPolicy resources.
pub struct Controller {
    client: Client,
    namespace: Option<String>,
    reconciler: Arc<Reconciler>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: OperatorConfig) -> Result<Self, ControllerError> {
        info!("Initializing BotNetworkPolicy Controller");

        let client = Client::try_default().await?;

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ControllerError::InvalidConfig(format!("building HTTP client: {}", e)))?;

        let cluster_reader: Arc<dyn ClusterReader> = Arc::new(KubeClusterReader::new(client.clone()));
        let factory = ProviderFactory::new(http, Some(cluster_reader))
            .with_google_endpoint(config.google_endpoint.as_deref())
            .with_aws_endpoint(config.aws_endpoint.as_deref())
            .with_github_endpoint(config.github_endpoint.as_deref());

        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: config.pod_name.clone(),
        };
        let store = KubeStore::new(client.clone(), reporter);

        let reconciler = Reconciler::new(store, factory, config.default_sync_period, config.http_timeout);

        Ok(Self {
            client,
            namespace: config.namespace,
            reconciler: Arc::new(reconciler),
        })
    }

    /// Runs the controller until a shutdown signal is received.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("BotNetworkPolicy Controller running");
        watch_bot_network_policies(self.client, self.namespace.as_deref(), self.reconciler).await
    }
}
