use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tsdns_proxy_application::ports::{start_with_timeout, OverlayResolver};
use tsdns_proxy_domain::config::ResolverConfig;
use tsdns_proxy_infrastructure::resolvers::create_resolver;

/// Builds the overlay resolver and waits until it can answer lookups.
pub async fn start_resolver(
    config: &ResolverConfig,
    shutdown: &CancellationToken,
) -> anyhow::Result<Arc<dyn OverlayResolver>> {
    let resolver = create_resolver(config, shutdown).await?;

    if let Some(startable) = resolver.as_startable() {
        let timeout = config.start_timeout();
        info!(
            resolver = resolver.name(),
            timeout_secs = timeout.as_secs(),
            "Waiting for resolver to sync"
        );
        start_with_timeout(startable, shutdown, timeout)
            .await
            .inspect_err(|e| error!(resolver = resolver.name(), error = %e, "Resolver failed to start"))?;
    }

    info!(resolver = resolver.name(), "Resolver ready");
    Ok(resolver)
}
