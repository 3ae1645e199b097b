//! Overlay resolution from Kubernetes cluster state.
//!
//! Services expose external load balancer addresses; the operator's device
//! Secrets, labelled with their parent Service, carry the overlay addresses.

pub mod address_index;
pub mod store;
pub mod watch;

pub use address_index::{AddressIndex, ServiceKey};
pub use store::IndexedStore;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::{Api, Client};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tsdns_proxy_application::ports::{OverlayResolver, Startable};
use tsdns_proxy_domain::config::KubernetesConfig;
use tsdns_proxy_domain::DomainError;

pub struct KubernetesResolver {
    client: Client,
    config: KubernetesConfig,
    index: Arc<AddressIndex>,
    shutdown: CancellationToken,
    watching: AtomicBool,
}

impl KubernetesResolver {
    pub fn new(client: Client, config: KubernetesConfig) -> Self {
        Self {
            client,
            config,
            index: Arc::new(AddressIndex::new()),
            shutdown: CancellationToken::new(),
            watching: AtomicBool::new(false),
        }
    }

    /// In-cluster configuration, falling back to the local kubeconfig.
    pub async fn try_default(config: &KubernetesConfig) -> Result<Self, DomainError> {
        let client = Client::try_default()
            .await
            .map_err(|e| DomainError::ResolverStartup(format!("kubernetes client: {}", e)))?;
        Ok(Self::new(client, config.clone()))
    }

    /// Watches stop when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    fn spawn_watches(&self) {
        let services: Api<Service> = Api::all(self.client.clone());
        let secrets: Api<Secret> = match self.config.operator_namespace() {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        let resync = self.config.resync_period();

        tokio::spawn(watch::run_watch(
            services,
            Arc::clone(self.index.services()),
            resync,
            self.shutdown.clone(),
        ));
        tokio::spawn(watch::run_watch(
            secrets,
            Arc::clone(self.index.secrets()),
            resync,
            self.shutdown.clone(),
        ));

        info!(
            operator_namespace = self.config.operator_namespace().unwrap_or("<all>"),
            "Kubernetes watches started"
        );
    }
}

#[async_trait]
impl OverlayResolver for KubernetesResolver {
    async fn resolve(&self, external: IpAddr) -> Result<Vec<IpAddr>, DomainError> {
        self.index.lookup(external)
    }

    fn name(&self) -> &'static str {
        "kubernetes"
    }

    fn as_startable(&self) -> Option<&dyn Startable> {
        Some(self)
    }
}

#[async_trait]
impl Startable for KubernetesResolver {
    /// Starts both watches (once) and waits for their initial listings.
    async fn start(&self, cancel: CancellationToken) -> Result<(), DomainError> {
        if !self.watching.swap(true, Ordering::SeqCst) {
            self.spawn_watches();
        }
        self.index.wait_synced(&cancel).await?;
        info!(
            services = self.index.services().len(),
            secrets = self.index.secrets().len(),
            "Kubernetes caches synced"
        );
        Ok(())
    }
}
