//! Routes directory watcher for development rebuilds.

use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use super::snapshot::{RouteSnapshot, RouteSource};

/// Watches the routes directory and sends freshly built snapshots.
pub struct RouteWatcher {
    source: RouteSource,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<RouteSnapshot>,
}

impl RouteWatcher {
    /// Returns the watcher and a receiver for rebuilt snapshots.
    pub fn new(source: RouteSource, debounce: Duration) -> (Self, mpsc::UnboundedReceiver<RouteSnapshot>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                source,
                debounce,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Rebuilds run on a background task until `shutdown`
    /// fires; the returned watcher must be kept alive for events to flow.
    pub fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<RecommendedWatcher, notify::Error> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Routes watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(self.source.routes_dir(), RecursiveMode::Recursive)?;

        tracing::info!(
            path = %self.source.routes_dir().display(),
            debounce_ms = self.debounce.as_millis() as u64,
            "Routes watcher started"
        );

        let RouteWatcher {
            source,
            debounce,
            update_tx,
        } = self;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    event = event_rx.recv() => {
                        if event.is_none() {
                            break;
                        }
                    }
                }

                // Collapse a burst of events into one rebuild.
                tokio::time::sleep(debounce).await;
                while event_rx.try_recv().is_ok() {}

                tracing::info!("Routes change detected, rebuilding...");
                let source = source.clone();
                match tokio::task::spawn_blocking(move || source.build()).await {
                    Ok(Ok(snapshot)) => {
                        crate::observability::metrics::record_route_reload(true);
                        if update_tx.send(snapshot).is_err() {
                            break;
                        }
                    }
                    Ok(Err(e)) => {
                        crate::observability::metrics::record_route_reload(false);
                        tracing::error!(error = %e, "Failed to rebuild routes. Keeping current route table.");
                    }
                    Err(e) => tracing::error!(error = %e, "Route rebuild task failed"),
                }
            }
            tracing::debug!("Routes watcher stopped");
        });

        Ok(watcher)
    }
}
