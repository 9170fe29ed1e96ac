//! Periodic poll runner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::engine::SyncEngine;

/// Counters shared between a running poller and its handle.
#[derive(Debug, Default)]
pub struct PollStats {
    runs: AtomicU64,
    skipped: AtomicU64,
}

impl PollStats {
    /// Polls started.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Ticks dropped because the previous poll was still in flight.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

/// Runs [`SyncEngine::poll`] on a fixed interval.
///
/// The first poll starts immediately. A tick that arrives while the previous
/// poll is still running is skipped rather than queued. A poll that panics is
/// logged and the next tick runs as usual.
#[derive(Debug)]
pub struct Poller {
    engine: Arc<SyncEngine>,
    every: Duration,
}

impl Poller {
    pub fn new(engine: Arc<SyncEngine>, every: Duration) -> Self {
        Self { engine, every }
    }

    /// Start polling on the current tokio runtime.
    pub fn spawn(self) -> PollerHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let stats = Arc::new(PollStats::default());
        let task_stats = Arc::clone(&stats);

        let task = tokio::spawn(async move {
            let mut current: Option<JoinHandle<()>> = None;
            let mut ticker = interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if current.as_ref().is_some_and(|run| !run.is_finished()) {
                            task_stats.skipped.fetch_add(1, Ordering::Relaxed);
                            debug!(platform = %self.engine.platform(), "previous poll still running; tick skipped");
                            continue;
                        }
                        if let Some(finished) = current.take() {
                            if let Err(e) = finished.await {
                                error!(platform = %self.engine.platform(), error = %e, "poll task ended abnormally");
                            }
                        }

                        task_stats.runs.fetch_add(1, Ordering::Relaxed);
                        let engine = Arc::clone(&self.engine);
                        current = Some(tokio::spawn(async move {
                            if let Err(e) = engine.poll().await {
                                error!(platform = %engine.platform(), error = %e, "poll failed");
                            }
                        }));
                    }
                }
            }

            if let Some(running) = current {
                if let Err(e) = running.await {
                    warn!(error = %e, "poll task ended abnormally");
                }
            }
            info!(platform = %self.engine.platform(), "poller stopped");
        });

        PollerHandle {
            stop: stop_tx,
            task,
            stats,
        }
    }
}

/// Handle to a running [`Poller`]. Dropping it also stops the poller.
#[derive(Debug)]
pub struct PollerHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
    stats: Arc<PollStats>,
}

impl PollerHandle {
    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// Stop ticking and wait for any in-flight poll to finish.
    pub async fn shutdown(self) {
        // The receiver is gone only if the task already ended.
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "poller task ended abnormally");
        }
    }
}
