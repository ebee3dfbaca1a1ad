//! Detector units.
//!
//! Each unit watches one class of evasion attempt and reports into the shared
//! [`ViolationSink`]. Units do not know about each other. Event-driven units
//! implement [`Detector`]; the two timer-driven units (dev-tools heuristic and
//! console advisory) are driven by the monitor's interval tasks.

pub mod advisory;
pub mod devtools;
pub mod interaction;
pub mod keyboard;
pub mod visibility;

pub use advisory::{AdvisoryConsole, ConsoleAdvisory, TracingConsole, DETERRENT_BANNER};
pub use devtools::{DevToolsHeuristic, DevToolsProbe, MetricsCell, ViewportDeltaProbe};
pub use interaction::InteractionBlocker;
pub use keyboard::{default_combos, KeyCombo, KeyComboDetector, ModifierRule};
pub use visibility::{TabSwitchCounter, VisibilityDetector};

use crate::events::{EventVerdict, PageEvent};
use crate::sink::ViolationSink;

/// Failure of a single detector. The monitor disables the failing unit and
/// keeps the others running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    #[error("{0} is not supported by this host")]
    Unsupported(String),
    #[error("detector failed: {0}")]
    Failed(String),
}

/// An event-driven detector unit.
pub trait Detector: Send {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// React to one page event. Events the unit does not care about pass
    /// through with [`EventVerdict::PASS`].
    fn handle(
        &mut self,
        event: &PageEvent,
        sink: &ViolationSink,
    ) -> Result<EventVerdict, DetectorError>;
}
