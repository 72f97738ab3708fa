//! Change-event feed for a named table
use crate::error::{Result, VerseError};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

const SUBSCRIPTION_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "INSERT"),
            ChangeKind::Update => write!(f, "UPDATE"),
            ChangeKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// A change notification. Only the kind is carried, never the row payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
}

/// Live subscription. An `Err` item or the end of the stream means the
/// subscription is lost and must be re-established.
pub type ChangeSubscription = mpsc::Receiver<Result<ChangeEvent>>;

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, table: &str) -> Result<ChangeSubscription>;
}

/// In-process feed: publishers push change kinds, every live subscriber of
/// the table receives them.
#[derive(Default)]
pub struct BroadcastChangeFeed {
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<Result<ChangeEvent>>>>>,
    failing_subscribes: AtomicUsize,
    subscribe_calls: AtomicUsize,
}

impl BroadcastChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one event to every subscriber of `table`. Returns how many
    /// subscribers received it.
    pub fn publish(&self, table: &str, kind: ChangeKind) -> usize {
        let mut subscribers = self.subscribers.lock();
        let Some(senders) = subscribers.get_mut(table) else {
            return 0;
        };
        senders.retain(|tx| !tx.is_closed());
        let mut delivered = 0;
        for tx in senders.iter() {
            match tx.try_send(Ok(ChangeEvent { kind })) {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Dropping {kind} event for {table}: {e}"),
            }
        }
        delivered
    }

    /// Break every subscription of `table` with a channel error.
    pub fn disconnect(&self, table: &str) {
        if let Some(senders) = self.subscribers.lock().remove(table) {
            for tx in senders {
                let _ = tx.try_send(Err(VerseError::transport(table, "CHANNEL_ERROR")));
            }
        }
    }

    /// Make the next `n` subscribe attempts fail.
    pub fn fail_next_subscribes(&self, n: usize) {
        self.failing_subscribes.store(n, Ordering::SeqCst);
    }

    pub fn subscriber_count(&self, table: &str) -> usize {
        self.subscribers
            .lock()
            .get(table)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeFeed for BroadcastChangeFeed {
    async fn subscribe(&self, table: &str) -> Result<ChangeSubscription> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .failing_subscribes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(VerseError::transport(table, "TIMED_OUT"));
        }

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        self.subscribers
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let feed = BroadcastChangeFeed::new();
        let mut sub = feed.subscribe("ws-quran").await.unwrap();
        assert_eq!(feed.publish("ws-quran", ChangeKind::Update), 1);
        assert_eq!(feed.publish("ws-quran-foreign", ChangeKind::Update), 0);

        let event = sub.recv().await.unwrap().unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
    }

    #[tokio::test]
    async fn test_disconnect_and_failures() {
        let feed = BroadcastChangeFeed::new();
        let mut sub = feed.subscribe("ws-quran").await.unwrap();
        feed.disconnect("ws-quran");
        assert!(sub.recv().await.unwrap().is_err());
        assert!(sub.recv().await.is_none());

        feed.fail_next_subscribes(1);
        assert!(feed.subscribe("ws-quran").await.is_err());
        assert!(feed.subscribe("ws-quran").await.is_ok());
        assert_eq!(feed.subscribe_calls(), 3);
    }
}
