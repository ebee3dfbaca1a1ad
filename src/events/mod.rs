//! Page events for the lockdown monitor.
//!
//! This module defines the host-facing event model and the bounded feed that
//! carries events from a host thread into the monitor loop.

pub mod feed;
pub mod types;

// Re-export commonly used types
pub use feed::{EventFeed, EventPublisher, FEED_CAPACITY};
pub use types::{EventVerdict, KeyEvent, KeyPhase, Modifiers, PageEvent, WindowMetrics};
