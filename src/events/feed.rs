//! Bounded channel between the event-producing host and the monitor loop.
//!
//! Hosts deliver events from their own thread (a stdin reader, a WebView
//! callback). The feed never blocks the producer: when the monitor falls
//! behind and the buffer is full, new events are dropped and counted.

use crate::events::types::PageEvent;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default channel capacity.
pub const FEED_CAPACITY: usize = 10_000;

/// Consumer end of a page-event channel.
///
/// The receiver disconnects once every [`EventPublisher`] has been dropped.
pub struct EventFeed {
    receiver: Receiver<PageEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventFeed {
    /// Create a channel with the default capacity.
    pub fn channel() -> (EventPublisher, EventFeed) {
        Self::with_capacity(FEED_CAPACITY)
    }

    /// Create a channel with the given capacity.
    pub fn with_capacity(capacity: usize) -> (EventPublisher, EventFeed) {
        // Use a bounded channel to prevent unbounded memory growth
        let (sender, receiver) = bounded(capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        let publisher = EventPublisher {
            sender,
            dropped: dropped.clone(),
        };
        (publisher, EventFeed { receiver, dropped })
    }

    /// Get the receiver for page events.
    pub fn receiver(&self) -> &Receiver<PageEvent> {
        &self.receiver
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<PageEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<PageEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Number of events dropped because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Producer side of an [`EventFeed`].
#[derive(Clone)]
pub struct EventPublisher {
    sender: Sender<PageEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventPublisher {
    /// Queue an event. Returns `false` if it was dropped.
    pub fn publish(&self, event: PageEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_preserves_order() {
        let (publisher, feed) = EventFeed::channel();

        assert!(publisher.publish(PageEvent::blur()));
        assert!(publisher.publish(PageEvent::focus()));

        assert!(matches!(feed.try_recv(), Some(PageEvent::Blur { .. })));
        assert!(matches!(feed.try_recv(), Some(PageEvent::Focus { .. })));
        assert!(feed.try_recv().is_none());
    }

    #[test]
    fn test_full_feed_drops_and_counts() {
        let (publisher, feed) = EventFeed::with_capacity(1);

        assert!(publisher.publish(PageEvent::context_menu()));
        assert!(!publisher.publish(PageEvent::context_menu()));
        assert_eq!(feed.dropped(), 1);
    }

    #[test]
    fn test_feed_disconnects_after_publishers_drop() {
        let (publisher, feed) = EventFeed::channel();
        let second = publisher.clone();

        publisher.publish(PageEvent::blur());
        drop(publisher);
        second.publish(PageEvent::focus());
        drop(second);

        assert!(feed.recv_timeout(Duration::from_millis(10)).is_ok());
        assert!(feed.recv_timeout(Duration::from_millis(10)).is_ok());
        assert_eq!(
            feed.recv_timeout(Duration::from_millis(10)).unwrap_err(),
            RecvTimeoutError::Disconnected
        );
    }
}
