//! Push-channel contract.
//!
//! The data service announces row changes on a named channel. Events carry
//! no row data that the synchronizer trusts; any event triggers a refetch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use todo_core::BackendError;

/// Kind of row change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

/// One change notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// Table the change applies to.
    pub table: String,
}

impl ChangeEvent {
    /// Event for `table`.
    pub fn new(kind: ChangeKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
        }
    }
}

/// Subscribes to a push channel.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Open `channel` and deliver its change events until the returned stream
    /// is closed or dropped.
    async fn subscribe(&self, channel: &str) -> Result<ChangeStream, BackendError>;
}

/// Receiving end of a channel subscription.
///
/// Closing or dropping the stream cancels the producer side, which then
/// tears the channel down.
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::Receiver<ChangeEvent>,
    cancel: CancellationToken,
}

impl ChangeStream {
    /// Wrap a receiver whose producer watches `cancel`.
    pub fn new(rx: mpsc::Receiver<ChangeEvent>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Next event, or `None` once the channel is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            event = self.rx.recv() => event,
            () = self.cancel.cancelled() => None,
        }
    }

    /// Tear the subscription down.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether the subscription was torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_until_producer_drops() {
        let (tx, rx) = mpsc::channel(4);
        let mut stream = ChangeStream::new(rx, CancellationToken::new());
        tx.send(ChangeEvent::new(ChangeKind::Insert, "todos")).await.unwrap();
        drop(tx);
        assert_eq!(stream.next().await.unwrap().kind, ChangeKind::Insert);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn close_stops_delivery() {
        let (tx, rx) = mpsc::channel(4);
        let mut stream = ChangeStream::new(rx, CancellationToken::new());
        tx.send(ChangeEvent::new(ChangeKind::Update, "todos")).await.unwrap();
        stream.close();
        assert!(stream.is_closed());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn drop_cancels_producer() {
        let (_tx, rx) = mpsc::channel::<ChangeEvent>(1);
        let cancel = CancellationToken::new();
        let stream = ChangeStream::new(rx, cancel.clone());
        drop(stream);
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn kind_wire_names() {
        let json = serde_json::to_string(&ChangeKind::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
    }
}
