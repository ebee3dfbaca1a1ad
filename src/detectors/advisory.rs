//! Console deterrent banner.
//!
//! Re-issued on mount and on every advisory tick. It enforces nothing; it
//! only tells whoever opens a console that the session is monitored.

use crate::detectors::DetectorError;

/// Banner written to the console on every advisory tick.
pub const DETERRENT_BANNER: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                 STOP - THIS SESSION IS MONITORED                 ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This assessment runs inside a lockdown monitor.                 ║
║                                                                  ║
║  The following are detected and reported:                        ║
║    • Screenshots and screen-capture shortcuts                    ║
║    • Opening developer tools or the console                      ║
║    • Copying, cutting or pasting content                         ║
║    • Switching tabs or leaving the window                        ║
║                                                                  ║
║  Every attempt is recorded with a timestamp and may end          ║
║  your session.                                                   ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

/// Where the banner is written. Browser hosts map this to `console.clear()`
/// and a styled `console.log`.
pub trait AdvisoryConsole: Send {
    fn clear(&mut self) -> Result<(), DetectorError>;
    fn write_banner(&mut self, banner: &str) -> Result<(), DetectorError>;
}

/// Writes the banner through `tracing`. Clearing is a no-op.
#[derive(Debug, Default)]
pub struct TracingConsole;

impl AdvisoryConsole for TracingConsole {
    fn clear(&mut self) -> Result<(), DetectorError> {
        Ok(())
    }

    fn write_banner(&mut self, banner: &str) -> Result<(), DetectorError> {
        tracing::warn!(target: "lockdown_monitor::advisory", "{banner}");
        Ok(())
    }
}

/// Fire-and-forget banner writer.
pub struct ConsoleAdvisory {
    console: Box<dyn AdvisoryConsole>,
    issued: u64,
    disabled: bool,
}

impl ConsoleAdvisory {
    pub fn new(console: Box<dyn AdvisoryConsole>) -> Self {
        Self {
            console,
            issued: 0,
            disabled: false,
        }
    }

    /// Clear the console and write the banner.
    ///
    /// Never fails: a console error turns the advisory into a no-op for the
    /// rest of the session. Returns whether the banner was written.
    pub fn issue(&mut self) -> bool {
        if self.disabled {
            return false;
        }
        let result = self
            .console
            .clear()
            .and_then(|_| self.console.write_banner(DETERRENT_BANNER));
        match result {
            Ok(()) => {
                self.issued += 1;
                true
            }
            Err(e) => {
                tracing::warn!("Console advisory disabled: {e}");
                self.disabled = true;
                false
            }
        }
    }

    /// Number of banners written so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}
