//! Tab, window and focus transitions.
//!
//! Three independent signals, each wired to its own page event:
//! - visibility → hidden: counted tab switch
//! - blur: focus lost, reported unconditionally
//! - focus: reported only when the absence reached the return threshold
//!
//! Each of the three refreshes the "last active" time read by the next focus
//! regain.

use crate::detectors::{Detector, DetectorError};
use crate::events::{EventVerdict, PageEvent};
use crate::sink::{Violation, ViolationKind, ViolationSink};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Number of hide transitions in the mounted session. Never decreases.
#[derive(Debug, Clone, Default)]
pub struct TabSwitchCounter(Arc<AtomicU64>);

impl TabSwitchCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the new count.
    fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct VisibilityDetector {
    counter: TabSwitchCounter,
    return_threshold: Duration,
    last_active: DateTime<Utc>,
}

impl VisibilityDetector {
    pub fn new(return_threshold: Duration, counter: TabSwitchCounter) -> Self {
        Self::starting_at(return_threshold, counter, Utc::now())
    }

    /// Detector whose "last active" time starts at `now`.
    pub fn starting_at(
        return_threshold: Duration,
        counter: TabSwitchCounter,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            counter,
            return_threshold,
            last_active: now,
        }
    }

    pub fn tab_switches(&self) -> u64 {
        self.counter.get()
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }
}

impl Detector for VisibilityDetector {
    fn name(&self) -> &'static str {
        "visibility"
    }

    fn handle(
        &mut self,
        event: &PageEvent,
        sink: &ViolationSink,
    ) -> Result<EventVerdict, DetectorError> {
        match *event {
            PageEvent::VisibilityChange { hidden, timestamp } => {
                // Becoming visible again is not a signal; the focus regain reports the absence
                if hidden {
                    let count = self.counter.increment();
                    sink.record(Violation::at(
                        ViolationKind::TabSwitch,
                        format!("tab/window switch detected ({count})"),
                        timestamp,
                    ));
                    self.last_active = timestamp;
                }
            }
            PageEvent::Blur { timestamp } => {
                sink.record(Violation::at(
                    ViolationKind::FocusLost,
                    "window lost focus",
                    timestamp,
                ));
                self.last_active = timestamp;
            }
            PageEvent::Focus { timestamp } => {
                let away_ms = (timestamp - self.last_active).num_milliseconds().max(0);
                if away_ms as u128 >= self.return_threshold.as_millis() {
                    let secs = (away_ms as f64 / 1000.0).round() as u64;
                    sink.record(Violation::at(
                        ViolationKind::FocusReturned,
                        format!("window focus regained after {secs}s away"),
                        timestamp,
                    ));
                }
                self.last_active = timestamp;
            }
            _ => {}
        }
        // Visibility and focus cannot be cancelled.
        Ok(EventVerdict::PASS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn detector(start: DateTime<Utc>) -> VisibilityDetector {
        VisibilityDetector::starting_at(Duration::from_secs(3), TabSwitchCounter::new(), start)
    }

    #[test]
    fn test_each_hide_increments_counter() {
        let sink = ViolationSink::new();
        let t0 = Utc::now();
        let mut d = detector(t0);

        for i in 1..=3 {
            let event = PageEvent::VisibilityChange {
                hidden: true,
                timestamp: t0 + ChronoDuration::seconds(i),
            };
            d.handle(&event, &sink).unwrap();
        }

        assert_eq!(d.tab_switches(), 3);
        let reasons: Vec<String> = sink.violations().into_iter().map(|v| v.reason).collect();
        assert_eq!(
            reasons,
            vec![
                "tab/window switch detected (1)",
                "tab/window switch detected (2)",
                "tab/window switch detected (3)",
            ]
        );
    }

    #[test]
    fn test_show_is_silent() {
        let sink = ViolationSink::new();
        let t0 = Utc::now();
        let mut d = detector(t0);

        let event = PageEvent::VisibilityChange {
            hidden: false,
            timestamp: t0 + ChronoDuration::seconds(4),
        };
        d.handle(&event, &sink).unwrap();
        assert_eq!(d.tab_switches(), 0);
        assert!(sink.is_empty());
        assert_eq!(d.last_active(), t0);
    }

    #[test]
    fn test_blur_always_reports() {
        let sink = ViolationSink::new();
        let t0 = Utc::now();
        let mut d = detector(t0);

        d.handle(&PageEvent::Blur { timestamp: t0 }, &sink).unwrap();
        d.handle(&PageEvent::Blur { timestamp: t0 }, &sink).unwrap();

        let violations = sink.violations();
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.reason == "window lost focus"));
    }

    #[test]
    fn test_short_absence_is_silent() {
        let sink = ViolationSink::new();
        let t0 = Utc::now();
        let mut d = detector(t0);

        d.handle(&PageEvent::Blur { timestamp: t0 }, &sink).unwrap();
        sink.clear_violations();

        let back = t0 + ChronoDuration::milliseconds(2999);
        d.handle(&PageEvent::Focus { timestamp: back }, &sink).unwrap();
        assert!(sink.is_empty());
        assert_eq!(d.last_active(), back);
    }

    #[test]
    fn test_long_absence_reports_rounded_seconds() {
        let sink = ViolationSink::new();
        let t0 = Utc::now();
        let mut d = detector(t0);

        d.handle(&PageEvent::Blur { timestamp: t0 }, &sink).unwrap();
        sink.clear_violations();

        let back = t0 + ChronoDuration::milliseconds(7600);
        d.handle(&PageEvent::Focus { timestamp: back }, &sink).unwrap();

        let violations = sink.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::FocusReturned);
        assert_eq!(violations[0].reason, "window focus regained after 8s away");
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let sink = ViolationSink::new();
        let t0 = Utc::now();
        let mut d = detector(t0);

        let back = t0 + ChronoDuration::milliseconds(3000);
        d.handle(&PageEvent::Focus { timestamp: back }, &sink).unwrap();
        assert_eq!(sink.len(), 1);
        assert!(sink.violations()[0].reason.contains("3s"));
    }

    #[test]
    fn test_focus_measures_from_latest_transition() {
        let sink = ViolationSink::new();
        let t0 = Utc::now();
        let mut d = detector(t0);

        // Hide at +10s, focus at +11s: only 1s since the last transition
        let hide = PageEvent::VisibilityChange {
            hidden: true,
            timestamp: t0 + ChronoDuration::seconds(10),
        };
        d.handle(&hide, &sink).unwrap();
        let focus = PageEvent::Focus {
            timestamp: t0 + ChronoDuration::seconds(11),
        };
        d.handle(&focus, &sink).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.violations()[0].kind, ViolationKind::TabSwitch);
    }
}
