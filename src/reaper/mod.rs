//! Cleanup of container and TTL znodes. Meant to run on the leader only;
//! running elsewhere is harmless, just wasted work, because the delete
//! proposals fail at the request pipeline.
//!
//! Once started, the reaper periodically scans for container nodes that
//! have had children and have none left, never-used containers past their
//! grace period, and expired TTL nodes. A delete is proposed for each; the
//! result is unimportant — if the proposal fails or the node picked up a
//! child in the meantime there is no harm, the next sweep reconsiders.

#[cfg(test)]
mod sweep_test;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::sleep;
use tokio::time::sleep_until;
use tracing::Level;
use tracing_futures::Instrument;

use crate::Config;
use crate::clock::Clock;
use crate::tree::DataTreeView;
use crate::tree::DeleteContainerRequest;
use crate::tree::EphemeralKind;
use crate::tree::RequestPipeline;

/// The sweep was cut short by shutdown.
struct SweepInterrupted;

/// Periodic leader-side task proposing deletion of empty container znodes
/// and expired TTL znodes, rate-limited to the configured deletes per
/// minute.
pub struct ContainerReaper<T, P, C> {
    tree: T,
    pipeline: P,
    clock: C,
    check_interval: Duration,
    min_delete_interval_ms: u64,
    max_never_used_interval_ms: u64,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T, P, C> ContainerReaper<T, P, C>
where
    T: DataTreeView + Send + Sync + 'static,
    P: RequestPipeline + Send + Sync + 'static,
    C: Clock,
{
    pub fn new(config: &Config, tree: T, pipeline: P, clock: C) -> Arc<Self> {
        tracing::info!(
            "container reaper: check_interval_ms={} max_per_minute={} max_never_used_interval_ms={}",
            config.check_interval_ms,
            config.max_per_minute,
            config.max_never_used_interval_ms
        );

        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            tree,
            pipeline,
            clock,
            check_interval: config.check_interval(),
            min_delete_interval_ms: config.min_delete_interval_ms(),
            max_never_used_interval_ms: config.max_never_used_interval_ms,
            shutdown_tx,
            task: Mutex::new(None),
        })
    }

    /// Start the periodic sweep. Can safely be called multiple times.
    pub fn start(self: &Arc<Self>) {
        if *self.shutdown_tx.borrow() {
            tracing::warn!("container reaper was stopped; not restarting");
            return;
        }

        let mut task = self.task.lock().unwrap();
        if task.is_some() {
            return;
        }

        let this = self.clone();
        let handle = tokio::spawn(
            async move { this.run().await }.instrument(tracing::span!(Level::INFO, "container_reaper")),
        );
        *task = Some(handle);
    }

    /// Stop the periodic sweep, aborting an in-progress pass at its next
    /// pause. Can safely be called multiple times, or without `start()`.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);

        let mut task = self.task.lock().unwrap();
        if task.take().is_some() {
            tracing::info!("container reaper stopping");
        }
    }

    async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        tracing::info!("container reaper started, sweeping every {:?}", self.check_interval);

        loop {
            let at = Instant::now() + self.check_interval;
            tokio::select! {
                _ = sleep_until(at) => {}
                _ = shutdown.changed() => {
                    tracing::info!("container reaper stopped");
                    return;
                }
            }

            if self.sweep_guarded(&mut shutdown).await.is_err() {
                tracing::info!("container reaper stopped mid-sweep");
                return;
            }
        }
    }

    /// Run a single sweep by hand. Not normally used directly.
    pub async fn sweep(&self) {
        let mut shutdown = self.shutdown_tx.subscribe();
        let _ = self.sweep_guarded(&mut shutdown).await;
    }

    async fn sweep_guarded(&self, shutdown: &mut watch::Receiver<bool>) -> Result<(), SweepInterrupted> {
        let candidates = self.candidates();
        if candidates.is_empty() {
            tracing::debug!("no deletable containers this sweep");
            return Ok(());
        }

        for path in candidates {
            let started_ms = self.clock.elapsed_now_ms();

            tracing::info!("attempting to delete candidate container: {}", path);
            if let Err(e) = self.pipeline.submit(DeleteContainerRequest::new(&path)) {
                tracing::warn!("could not delete container {}: {}", path, e);
            }

            // Space submissions out so a large batch of empty containers
            // does not turn into a delete storm.
            let elapsed_ms = self.clock.elapsed_now_ms().saturating_sub(started_ms);
            let wait_ms = self.min_delete_interval_ms.saturating_sub(elapsed_ms);
            if wait_ms > 0 {
                tokio::select! {
                    _ = sleep(Duration::from_millis(wait_ms)) => {}
                    _ = shutdown.changed() => return Err(SweepInterrupted),
                }
            }
        }

        Ok(())
    }

    fn candidates(&self) -> BTreeSet<String> {
        let mut candidates = BTreeSet::new();
        let wall_ms = self.clock.wall_now_ms();

        for path in self.tree.container_paths() {
            let Some(node) = self.tree.node(&path) else {
                continue;
            };
            if node.has_children() {
                continue;
            }

            if node.cversion > 0 {
                candidates.insert(path);
            } else if self.max_never_used_interval_ms != 0
                && wall_ms.saturating_sub(node.mtime_ms) > self.max_never_used_interval_ms
            {
                // cversion 0: the container never had a child. Reaped only
                // after the grace period, so one created just before a sweep
                // is not deleted out from under its creator.
                candidates.insert(path);
            }
        }

        for path in self.tree.ttl_paths() {
            let Some(node) = self.tree.node(&path) else {
                continue;
            };
            if node.has_children() {
                continue;
            }

            if let EphemeralKind::Ttl(ttl_ms) = node.ephemeral_owner.kind() {
                if ttl_ms != 0 && wall_ms.saturating_sub(node.mtime_ms) > ttl_ms {
                    candidates.insert(path);
                }
            }
        }

        candidates
    }
}
