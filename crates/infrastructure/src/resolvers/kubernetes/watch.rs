use super::store::IndexedStore;
use futures::{Stream, StreamExt};
use kube::runtime::watcher::{self, watcher, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Keeps `store` in step with `api` until `shutdown` fires.
///
/// With a resync period the watch is restarted periodically, which relists the
/// collection and swaps it in atomically.
pub async fn run_watch<T, K>(
    api: Api<T>,
    store: Arc<IndexedStore<T, K>>,
    resync: Option<Duration>,
    shutdown: CancellationToken,
) where
    T: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    info!(store = store.name(), resync_secs = resync.map(|d| d.as_secs()), "Starting watch");

    loop {
        let events = watcher(api.clone(), watcher::Config::default()).default_backoff();
        let resync_timer = async {
            match resync {
                Some(period) => tokio::time::sleep(with_jitter(period)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(store = store.name(), "Watch stopped");
                return;
            }
            _ = resync_timer => {
                debug!(store = store.name(), "Resyncing watch");
            }
            _ = apply_events(events, &store) => {
                warn!(store = store.name(), "Watch stream ended, restarting");
            }
        }
    }
}

async fn apply_events<T, K, S>(events: S, store: &IndexedStore<T, K>)
where
    T: Resource,
    K: Eq + Hash + Clone,
    S: Stream<Item = Result<Event<T>, watcher::Error>>,
{
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                if let Err(e) = store.handle_event(event) {
                    error!(store = store.name(), error = %e, "Failed to apply watch event");
                }
            }
            Err(e) => {
                warn!(store = store.name(), error = %e, "Watch error, retrying with backoff");
            }
        }
    }
}

/// Up to 10% extra so both collections do not relist in lockstep.
fn with_jitter(period: Duration) -> Duration {
    let max_extra_ms = (period.as_millis() / 10) as u64;
    period + Duration::from_millis(fastrand::u64(0..=max_extra_ms))
}
