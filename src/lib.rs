//! Lockdown Monitor - exam-integrity detection and reporting engine.
//!
//! This library wraps an interview or quiz session and detects attempts to
//! capture, copy or escape the monitored content. Detection is best-effort:
//! nothing here blocks capture at the operating-system level, and violations
//! are only delivered to the host's callback, never persisted remotely.
//!
//! # Architecture
//!
//! ```text
//!  PageEvent ──▶ KeyComboDetector   ──┐
//!            ──▶ VisibilityDetector ──┤
//!            ──▶ InteractionBlocker ──┼──▶ ViolationSink ──▶ on_violation callback
//!  interval  ──▶ DevToolsHeuristic  ──┘         │
//!  interval  ──▶ ConsoleAdvisory                ▼
//!                                         SecurityHandle (UI reads, manual reports)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use lockdown_monitor::{LockdownConfig, LockdownMonitor, PageEvent};
//!
//! let mut monitor = LockdownMonitor::mount(LockdownConfig::default());
//! let handle = monitor.handle();
//!
//! let verdict = monitor.dispatch(&PageEvent::context_menu()).unwrap();
//! assert!(verdict.default_prevented);
//! assert!(!handle.is_secure().unwrap());
//! ```

pub mod config;
pub mod detectors;
pub mod events;
pub mod monitor;
pub mod sink;

// Re-export key types at crate root for convenience
pub use config::{ConfigError, LockdownConfig, SecurityLevel};
pub use detectors::{Detector, DetectorError, DevToolsProbe, DETERRENT_BANNER};
pub use events::{EventFeed, EventVerdict, KeyEvent, Modifiers, PageEvent, WindowMetrics};
pub use monitor::{use_security, LockdownError, LockdownMonitor, MonitorBindings, SecurityHandle};
pub use sink::{
    SecurityState, SessionReport, SharedViolationSink, Violation, ViolationKind, ViolationSink,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
