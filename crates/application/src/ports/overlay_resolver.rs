use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tsdns_proxy_domain::DomainError;

/// Maps an externally visible address to the overlay addresses of the same host.
#[async_trait]
pub trait OverlayResolver: Send + Sync {
    /// Empty when the address is unknown (or the backing cache has not synced yet).
    async fn resolve(&self, external: IpAddr) -> Result<Vec<IpAddr>, DomainError>;

    fn name(&self) -> &'static str;

    /// Resolvers that need warm-up before serving expose it here.
    fn as_startable(&self) -> Option<&dyn Startable> {
        None
    }
}

/// A component that must finish an asynchronous startup before use.
#[async_trait]
pub trait Startable: Send + Sync {
    /// Returns once ready, or with an error once `cancel` fires first.
    async fn start(&self, cancel: CancellationToken) -> Result<(), DomainError>;
}

/// Runs `start` under a child of `parent`, cancelling it after `timeout`.
///
/// A zero timeout waits until the startable is ready or `parent` is cancelled.
pub async fn start_with_timeout(
    startable: &dyn Startable,
    parent: &CancellationToken,
    timeout: Duration,
) -> Result<(), DomainError> {
    let token = parent.child_token();
    if timeout.is_zero() {
        return startable.start(token).await;
    }

    let start = startable.start(token.clone());
    tokio::pin!(start);
    tokio::select! {
        result = &mut start => result,
        _ = tokio::time::sleep(timeout) => {
            token.cancel();
            start.await
        }
    }
}
