//! Central violation sink shared by every detector.
//!
//! The sink owns the ordered violation log and the `is_secure` latch. Each
//! append invokes the external violation callback, writes the deterrent
//! warning to the log, and notifies subscribers synchronously.

pub mod report;
pub mod violation;

pub use report::{SessionReport, ViolationStats};
pub use violation::{ComboGroup, SecurityState, Violation, ViolationKind};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// External sink invoked on every violation.
pub type ViolationCallback = Arc<dyn Fn(&Violation) + Send + Sync>;

/// Subscriber notified with the new state after every change.
pub type StateSubscriber = Arc<dyn Fn(&SecurityState) + Send + Sync>;

/// Handle returned by [`ViolationSink::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered violation log with a manually reset `is_secure` latch.
pub struct ViolationSink {
    state: Mutex<SecurityState>,
    callback: Option<ViolationCallback>,
    subscribers: Mutex<Vec<(SubscriptionId, StateSubscriber)>>,
    next_subscription: AtomicU64,
    closed: AtomicBool,
}

impl ViolationSink {
    /// Create a sink with no external callback.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SecurityState::default()),
            callback: None,
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a sink that forwards every violation to `callback`.
    pub fn with_callback(callback: ViolationCallback) -> Self {
        let mut sink = Self::new();
        sink.callback = Some(callback);
        sink
    }

    /// Record a violation raised by code outside the built-in detectors.
    pub fn add_violation(&self, reason: impl Into<String>) {
        self.record(Violation::new(ViolationKind::Manual, reason));
    }

    /// Append a violation to the log and flip the latch.
    ///
    /// Append order equals call order, also when several detectors fire
    /// within the same tick. Ignored once the sink is closed.
    pub fn record(&self, violation: Violation) {
        let snapshot = {
            let mut state = lock(&self.state);
            if self.closed.load(Ordering::SeqCst) {
                tracing::debug!(reason = %violation.reason, "Violation after teardown ignored");
                return;
            }
            state.violations.push(violation.clone());
            state.is_secure = false;
            state.clone()
        };

        tracing::warn!(
            kind = %violation.kind,
            total = snapshot.violations.len(),
            "Security violation: {}. This session is monitored and violations are reported.",
            violation.reason
        );

        // The callback is not awaited or retried.
        if let Some(ref callback) = self.callback {
            callback(&violation);
        }

        self.notify(&snapshot);
    }

    /// Empty the log and reset the latch. Idempotent.
    pub fn clear_violations(&self) {
        let snapshot = {
            let mut state = lock(&self.state);
            state.violations.clear();
            state.is_secure = true;
            state.clone()
        };
        tracing::debug!("Violation log cleared");
        self.notify(&snapshot);
    }

    /// Read-only snapshot of the current state.
    pub fn state(&self) -> SecurityState {
        lock(&self.state).clone()
    }

    /// Current value of the latch.
    pub fn is_secure(&self) -> bool {
        lock(&self.state).is_secure
    }

    /// Copy of the violation log, oldest first.
    pub fn violations(&self) -> Vec<Violation> {
        lock(&self.state).violations.clone()
    }

    /// Number of violations currently in the log.
    pub fn len(&self) -> usize {
        lock(&self.state).violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a subscriber notified after every append or clear.
    pub fn subscribe(&self, subscriber: StateSubscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscribers).push((id, subscriber));
        id
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Stop accepting violations and drop every subscriber.
    ///
    /// Taken under the state lock, so a `record` racing with teardown either
    /// completes before it or is ignored.
    pub fn close(&self) {
        {
            let _state = lock(&self.state);
            self.closed.store(true, Ordering::SeqCst);
        }
        self.clear_subscribers();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drop every subscriber.
    pub fn clear_subscribers(&self) {
        lock(&self.subscribers).clear();
    }

    fn notify(&self, snapshot: &SecurityState) {
        // Clone the list so a subscriber may (un)subscribe without deadlocking.
        let subscribers: Vec<StateSubscriber> = lock(&self.subscribers)
            .iter()
            .map(|(_, s)| s.clone())
            .collect();
        for subscriber in subscribers {
            subscriber(snapshot);
        }
    }
}

impl Default for ViolationSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ViolationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("ViolationSink")
            .field("is_secure", &state.is_secure)
            .field("violations", &state.violations.len())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Thread-safe shared violation sink.
pub type SharedViolationSink = Arc<ViolationSink>;

/// Create a new shared sink.
pub fn create_shared_sink(callback: Option<ViolationCallback>) -> SharedViolationSink {
    match callback {
        Some(cb) => Arc::new(ViolationSink::with_callback(cb)),
        None => Arc::new(ViolationSink::new()),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking subscriber must not wedge the log.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
