//! Push-channel driven resynchronization.
//!
//! Every change event on the channel triggers a full refetch, including
//! events caused by this client's own writes.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::feed::{ChangeFeed, ChangeStream};
use crate::synchronizer::TaskSynchronizer;

/// Background refetch loop bound to one channel subscription.
///
/// Stopping or dropping it tears the subscription down.
#[derive(Debug)]
pub struct LiveUpdates {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveUpdates {
    /// Fetch once, then refetch on every event from `channel`.
    ///
    /// A failed initial fetch is recorded on the synchronizer and does not
    /// prevent the subscription.
    pub async fn mount(
        sync: Arc<TaskSynchronizer>,
        feed: &dyn ChangeFeed,
        channel: &str,
    ) -> Result<Self, SyncError> {
        if let Err(e) = sync.fetch_all().await {
            warn!(error = %e, "initial fetch failed");
        }
        Self::subscribe(sync, feed, channel).await
    }

    /// Refetch on every event from `channel`.
    pub async fn subscribe(
        sync: Arc<TaskSynchronizer>,
        feed: &dyn ChangeFeed,
        channel: &str,
    ) -> Result<Self, SyncError> {
        let stream = feed
            .subscribe(channel)
            .await
            .map_err(SyncError::Subscribe)?;
        info!(channel, "subscribed to task changes");
        let task = tokio::spawn(run(sync, stream));
        Ok(Self {
            task: Mutex::new(Some(task)),
        })
    }

    /// Whether the refetch loop is still running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Tear the subscription down.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            debug!("live updates stopped");
        }
    }
}

impl Drop for LiveUpdates {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(sync: Arc<TaskSynchronizer>, mut stream: ChangeStream) {
    while let Some(event) = stream.next().await {
        debug!(kind = ?event.kind, table = %event.table, "change event, refetching");
        // Failures are recorded in the snapshot.
        let _ = sync.fetch_all().await;
    }
    debug!("change stream ended");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
