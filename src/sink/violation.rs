//! Violation records and the security state snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Purpose group of a blocked keyboard combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboGroup {
    /// Screen capture (PrintScreen, platform screenshot chords)
    Capture,
    /// Inspector, console, element picker, view-source
    DevTools,
    /// Copy, cut, paste, select-all
    Clipboard,
    /// Refresh, new tab/window, tab switching
    Navigation,
}

impl fmt::Display for ComboGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComboGroup::Capture => "capture",
            ComboGroup::DevTools => "dev_tools",
            ComboGroup::Clipboard => "clipboard",
            ComboGroup::Navigation => "navigation",
        };
        f.write_str(name)
    }
}

/// Which detector (or caller) produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "group", rename_all = "snake_case")]
pub enum ViolationKind {
    Shortcut(ComboGroup),
    TabSwitch,
    FocusLost,
    FocusReturned,
    DevTools,
    ContextMenu,
    /// Registered by code outside the built-in detectors
    Manual,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Shortcut(group) => write!(f, "shortcut:{group}"),
            ViolationKind::TabSwitch => f.write_str("tab_switch"),
            ViolationKind::FocusLost => f.write_str("focus_lost"),
            ViolationKind::FocusReturned => f.write_str("focus_returned"),
            ViolationKind::DevTools => f.write_str("dev_tools"),
            ViolationKind::ContextMenu => f.write_str("context_menu"),
            ViolationKind::Manual => f.write_str("manual"),
        }
    }
}

/// A single recorded violation. Immutable once appended to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Human-readable reason
    pub reason: String,
    pub kind: ViolationKind,
    pub timestamp: DateTime<Utc>,
}

impl Violation {
    pub fn new(kind: ViolationKind, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    /// A violation stamped with an explicit time (usually the triggering event's).
    pub fn at(kind: ViolationKind, reason: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            reason: reason.into(),
            kind,
            timestamp,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({})",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.reason,
            self.kind
        )
    }
}

/// Snapshot of the sink state.
///
/// `is_secure` is a latch: it drops to `false` on the first violation and
/// only returns to `true` through an explicit clear. It is not derived from
/// `violations.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityState {
    pub is_secure: bool,
    pub violations: Vec<Violation>,
}

impl Default for SecurityState {
    fn default() -> Self {
        Self {
            is_secure: true,
            violations: Vec::new(),
        }
    }
}
