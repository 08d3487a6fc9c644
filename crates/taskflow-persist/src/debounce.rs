//! Debounced, fire-and-forget snapshot saver.
//!
//! The host registers [`DebouncedSaver::schedule`] as a store observer.
//! Scheduling never blocks: snapshots go over an unbounded channel to a
//! background task that keeps only the latest one and writes it after the
//! debounce interval passes without a newer arrival. Save failures are
//! logged and swallowed; the engine never sees them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use taskflow_core::Snapshot;

use crate::config::PersistConfig;
use crate::file::save_snapshot;

/// Handle to the background saver task.
pub struct DebouncedSaver {
    tx: mpsc::UnboundedSender<Arc<Snapshot>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl DebouncedSaver {
    /// Spawn the saver loop on the current tokio runtime.
    pub fn spawn(config: PersistConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(config, rx, cancel.clone()));
        Self { tx, cancel, handle }
    }

    /// Queue a snapshot for saving. Non-blocking; newer snapshots replace
    /// older ones that have not been written yet.
    pub fn schedule(&self, snapshot: Arc<Snapshot>) {
        // A send error means the loop already stopped; scheduling is
        // best-effort either way.
        let _ = self.tx.send(snapshot);
    }

    /// An observer closure suitable for
    /// [`GraphStore::subscribe`](taskflow_core::GraphStore::subscribe):
    /// every published snapshot is scheduled for a debounced save.
    pub fn observer(&self) -> taskflow_core::store::SnapshotObserver {
        let tx = self.tx.clone();
        Box::new(move |snapshot| {
            let _ = tx.send(Arc::clone(snapshot));
        })
    }

    /// Stop the saver, flushing any pending snapshot first.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

async fn run_loop(
    config: PersistConfig,
    mut rx: mpsc::UnboundedReceiver<Arc<Snapshot>>,
    cancel: CancellationToken,
) {
    let mut pending: Option<Arc<Snapshot>> = None;

    'outer: loop {
        tokio::select! {
            _ = cancel.cancelled() => break 'outer,
            msg = rx.recv() => {
                let Some(snapshot) = msg else { break 'outer };
                pending = Some(snapshot);

                // Absorb further snapshots until the channel stays quiet
                // for a full debounce interval, then write the latest.
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break 'outer,
                        _ = tokio::time::sleep(config.debounce) => {
                            write_pending(&config, &mut pending);
                            break;
                        }
                        msg = rx.recv() => {
                            let Some(snapshot) = msg else { break 'outer };
                            pending = Some(snapshot);
                        }
                    }
                }
            }
        }
    }

    // Final flush so a clean shutdown never drops the last state. Drain
    // anything still queued: cancellation may have won the race against
    // snapshots scheduled just before shutdown.
    while let Ok(snapshot) = rx.try_recv() {
        pending = Some(snapshot);
    }
    write_pending(&config, &mut pending);
}

fn write_pending(config: &PersistConfig, pending: &mut Option<Arc<Snapshot>>) {
    let Some(snapshot) = pending.take() else {
        return;
    };
    match save_snapshot(&config.path, &snapshot) {
        Ok(()) => debug!(path = %config.path.display(), "snapshot saved"),
        Err(err) => warn!(path = %config.path.display(), %err, "snapshot save failed, ignoring"),
    }
}
