//! Page event types fed into the lockdown monitor.
//!
//! These mirror the browser input and DOM events the detectors react to. A host
//! (WebView bridge, native-messaging helper, test) translates its native events
//! into [`PageEvent`] values and dispatches them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Modifier keys held while a key event fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Command on macOS, Windows key elsewhere
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn ctrl_shift() -> Self {
        Self {
            ctrl: true,
            shift: true,
            ..Self::NONE
        }
    }

    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::NONE
        }
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::NONE
        }
    }
}

/// Whether a key event is a press or a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPhase {
    Down,
    Up,
}

/// A keyboard event with the key identity and the modifier state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key identity as reported by the browser (`"c"`, `"F12"`, `"PrintScreen"`)
    pub key: String,
    pub phase: KeyPhase,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl KeyEvent {
    pub fn down(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            phase: KeyPhase::Down,
            modifiers,
            timestamp: Utc::now(),
        }
    }

    pub fn up(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            phase: KeyPhase::Up,
            modifiers,
            timestamp: Utc::now(),
        }
    }
}

/// Outer and inner window dimensions, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub outer_width: f64,
    pub outer_height: f64,
    pub inner_width: f64,
    pub inner_height: f64,
}

impl WindowMetrics {
    pub fn new(outer_width: f64, outer_height: f64, inner_width: f64, inner_height: f64) -> Self {
        Self {
            outer_width,
            outer_height,
            inner_width,
            inner_height,
        }
    }

    /// Horizontal chrome taken away from the viewport.
    pub fn width_delta(&self) -> f64 {
        self.outer_width - self.inner_width
    }

    /// Vertical chrome taken away from the viewport.
    pub fn height_delta(&self) -> f64 {
        self.outer_height - self.inner_height
    }
}

/// Unified event type dispatched into the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    Key(KeyEvent),
    VisibilityChange {
        hidden: bool,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
    Blur {
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
    Focus {
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
    ContextMenu {
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
    SelectStart {
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
    DragStart {
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
    Viewport {
        metrics: WindowMetrics,
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
}

impl PageEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PageEvent::Key(e) => e.timestamp,
            PageEvent::VisibilityChange { timestamp, .. }
            | PageEvent::Blur { timestamp }
            | PageEvent::Focus { timestamp }
            | PageEvent::ContextMenu { timestamp }
            | PageEvent::SelectStart { timestamp }
            | PageEvent::DragStart { timestamp }
            | PageEvent::Viewport { timestamp, .. } => *timestamp,
        }
    }

    pub fn visibility(hidden: bool) -> Self {
        PageEvent::VisibilityChange {
            hidden,
            timestamp: Utc::now(),
        }
    }

    pub fn blur() -> Self {
        PageEvent::Blur {
            timestamp: Utc::now(),
        }
    }

    pub fn focus() -> Self {
        PageEvent::Focus {
            timestamp: Utc::now(),
        }
    }

    pub fn context_menu() -> Self {
        PageEvent::ContextMenu {
            timestamp: Utc::now(),
        }
    }

    pub fn select_start() -> Self {
        PageEvent::SelectStart {
            timestamp: Utc::now(),
        }
    }

    pub fn drag_start() -> Self {
        PageEvent::DragStart {
            timestamp: Utc::now(),
        }
    }

    pub fn viewport(metrics: WindowMetrics) -> Self {
        PageEvent::Viewport {
            metrics,
            timestamp: Utc::now(),
        }
    }
}

/// What the monitor decided to do with a dispatched event.
///
/// The host applies these to the native event (`preventDefault()` /
/// `stopPropagation()` in a browser).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventVerdict {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

impl EventVerdict {
    /// Let the event through untouched.
    pub const PASS: EventVerdict = EventVerdict {
        default_prevented: false,
        propagation_stopped: false,
    };

    /// Cancel the default action only.
    pub const PREVENT: EventVerdict = EventVerdict {
        default_prevented: true,
        propagation_stopped: false,
    };

    /// Cancel the default action and stop propagation.
    pub const BLOCK: EventVerdict = EventVerdict {
        default_prevented: true,
        propagation_stopped: true,
    };

    /// Combine two verdicts; any cancellation wins.
    pub fn merge(self, other: EventVerdict) -> EventVerdict {
        EventVerdict {
            default_prevented: self.default_prevented || other.default_prevented,
            propagation_stopped: self.propagation_stopped || other.propagation_stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_metrics_deltas() {
        let metrics = WindowMetrics::new(1400.0, 900.0, 1400.0, 700.0);
        assert_eq!(metrics.width_delta(), 0.0);
        assert_eq!(metrics.height_delta(), 200.0);
    }

    #[test]
    fn test_verdict_merge() {
        assert_eq!(EventVerdict::PASS.merge(EventVerdict::PASS), EventVerdict::PASS);
        assert_eq!(EventVerdict::PASS.merge(EventVerdict::PREVENT), EventVerdict::PREVENT);
        assert_eq!(EventVerdict::PREVENT.merge(EventVerdict::BLOCK), EventVerdict::BLOCK);
    }

    #[test]
    fn test_page_event_json_shape() {
        let json = r#"{"type":"key","key":"c","phase":"down","modifiers":{"ctrl":true}}"#;
        let event: PageEvent = serde_json::from_str(json).unwrap();
        match event {
            PageEvent::Key(key) => {
                assert_eq!(key.key, "c");
                assert_eq!(key.phase, KeyPhase::Down);
                assert!(key.modifiers.ctrl);
                assert!(!key.modifiers.shift);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let json = r#"{"type":"viewport","metrics":{"outer_width":1200,"outer_height":900,"inner_width":1200,"inner_height":600}}"#;
        let event: PageEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, PageEvent::Viewport { metrics, .. } if metrics.height_delta() == 300.0));
    }
}
