pub mod kubernetes;
pub mod static_resolver;

pub use kubernetes::KubernetesResolver;
pub use static_resolver::StaticResolver;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tsdns_proxy_application::ports::OverlayResolver;
use tsdns_proxy_domain::config::{ResolverBackend, ResolverConfig};
use tsdns_proxy_domain::DomainError;

/// Builds the configured resolver. Background work stops with `shutdown`.
pub async fn create_resolver(
    config: &ResolverConfig,
    shutdown: &CancellationToken,
) -> Result<Arc<dyn OverlayResolver>, DomainError> {
    let backend = config
        .backend()
        .map_err(|e| DomainError::ResolverStartup(e.to_string()))?;

    let resolver: Arc<dyn OverlayResolver> = match backend {
        ResolverBackend::Kubernetes(kubernetes) => Arc::new(
            KubernetesResolver::try_default(kubernetes)
                .await?
                .with_cancellation(shutdown.child_token()),
        ),
        ResolverBackend::Static(mappings) => Arc::new(StaticResolver::from_config(mappings)?),
    };

    info!(resolver = resolver.name(), "Overlay resolver created");
    Ok(resolver)
}
