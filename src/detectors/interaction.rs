//! Context menu, selection and drag suppression.

use crate::config::SecurityLevel;
use crate::detectors::{Detector, DetectorError};
use crate::events::{EventVerdict, PageEvent};
use crate::sink::{Violation, ViolationKind, ViolationSink};

/// Blocks the context menu at every level and, at `High`, silently blocks
/// selection and drag.
///
/// Every right-click is logged; there is no coalescing.
pub struct InteractionBlocker {
    level: SecurityLevel,
}

impl InteractionBlocker {
    pub fn new(level: SecurityLevel) -> Self {
        Self { level }
    }

    fn suppresses_selection(&self) -> bool {
        self.level == SecurityLevel::High
    }
}

impl Detector for InteractionBlocker {
    fn name(&self) -> &'static str {
        "interaction"
    }

    fn handle(
        &mut self,
        event: &PageEvent,
        sink: &ViolationSink,
    ) -> Result<EventVerdict, DetectorError> {
        match *event {
            PageEvent::ContextMenu { timestamp } => {
                sink.record(Violation::at(
                    ViolationKind::ContextMenu,
                    "right-click context menu blocked",
                    timestamp,
                ));
                Ok(EventVerdict::PREVENT)
            }
            PageEvent::SelectStart { .. } | PageEvent::DragStart { .. }
                if self.suppresses_selection() =>
            {
                Ok(EventVerdict::PREVENT)
            }
            _ => Ok(EventVerdict::PASS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_right_click_is_logged() {
        let sink = ViolationSink::new();
        let mut blocker = InteractionBlocker::new(SecurityLevel::Low);

        for _ in 0..5 {
            let verdict = blocker.handle(&PageEvent::context_menu(), &sink).unwrap();
            assert!(verdict.default_prevented);
        }
        assert_eq!(sink.len(), 5);
    }

    #[test]
    fn test_selection_suppressed_silently_at_high() {
        let sink = ViolationSink::new();
        let mut blocker = InteractionBlocker::new(SecurityLevel::High);

        let verdict = blocker.handle(&PageEvent::select_start(), &sink).unwrap();
        assert!(verdict.default_prevented);
        let verdict = blocker.handle(&PageEvent::drag_start(), &sink).unwrap();
        assert!(verdict.default_prevented);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_selection_allowed_below_high() {
        let sink = ViolationSink::new();
        for level in [SecurityLevel::Low, SecurityLevel::Medium] {
            let mut blocker = InteractionBlocker::new(level);
            let verdict = blocker.handle(&PageEvent::select_start(), &sink).unwrap();
            assert_eq!(verdict, EventVerdict::PASS);
            let verdict = blocker.handle(&PageEvent::drag_start(), &sink).unwrap();
            assert_eq!(verdict, EventVerdict::PASS);
        }
        assert!(sink.is_empty());
    }
}
