//! Open-inspector heuristic.
//!
//! The default probe compares outer and inner window dimensions: a docked
//! inspector panel eats into the viewport. This is approximate. Resizable
//! browser chrome, toolbars and some window managers produce false
//! positives, and an undocked inspector is not seen at all. Hosts with a
//! better signal plug in their own [`DevToolsProbe`].

use crate::detectors::DetectorError;
use crate::events::WindowMetrics;
use crate::sink::{Violation, ViolationKind, ViolationSink};
use std::sync::{Arc, Mutex, PoisonError};

/// Strategy answering "is an inspector open right now?".
pub trait DevToolsProbe: Send {
    fn is_open(&mut self) -> Result<bool, DetectorError>;
}

/// Latest window metrics reported by the host.
#[derive(Debug, Clone, Default)]
pub struct MetricsCell(Arc<Mutex<Option<WindowMetrics>>>);

impl MetricsCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, metrics: WindowMetrics) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(metrics);
    }

    pub fn get(&self) -> Option<WindowMetrics> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Viewport-vs-window delta probe.
pub struct ViewportDeltaProbe {
    metrics: MetricsCell,
    threshold_px: f64,
}

impl ViewportDeltaProbe {
    pub fn new(metrics: MetricsCell, threshold_px: f64) -> Self {
        Self {
            metrics,
            threshold_px,
        }
    }
}

impl DevToolsProbe for ViewportDeltaProbe {
    fn is_open(&mut self) -> Result<bool, DetectorError> {
        // No metrics reported yet reads as closed.
        Ok(self.metrics.get().is_some_and(|m| {
            m.width_delta() > self.threshold_px || m.height_delta() > self.threshold_px
        }))
    }
}

/// Edge-triggered wrapper around a probe: reports closed→open transitions only.
pub struct DevToolsHeuristic {
    probe: Box<dyn DevToolsProbe>,
    open: bool,
}

impl DevToolsHeuristic {
    pub fn new(probe: Box<dyn DevToolsProbe>) -> Self {
        Self { probe, open: false }
    }

    /// Sample the probe once. Returns `true` if a violation was recorded.
    pub fn poll(&mut self, sink: &ViolationSink) -> Result<bool, DetectorError> {
        let open = self.probe.is_open()?;
        let opened = open && !self.open;
        self.open = open;

        if opened {
            sink.record(Violation::new(
                ViolationKind::DevTools,
                "developer tools opened",
            ));
        }
        Ok(opened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed() -> WindowMetrics {
        WindowMetrics::new(1400.0, 900.0, 1400.0, 820.0)
    }

    fn docked_bottom() -> WindowMetrics {
        WindowMetrics::new(1400.0, 900.0, 1400.0, 500.0)
    }

    fn docked_side() -> WindowMetrics {
        WindowMetrics::new(1400.0, 900.0, 1000.0, 820.0)
    }

    fn heuristic(cell: &MetricsCell) -> DevToolsHeuristic {
        DevToolsHeuristic::new(Box::new(ViewportDeltaProbe::new(cell.clone(), 160.0)))
    }

    #[test]
    fn test_edge_triggered() {
        let sink = ViolationSink::new();
        let cell = MetricsCell::new();
        let mut h = heuristic(&cell);

        cell.set(closed());
        assert!(!h.poll(&sink).unwrap());

        cell.set(docked_bottom());
        assert!(h.poll(&sink).unwrap());
        // Staying open is silent
        assert!(!h.poll(&sink).unwrap());
        assert!(!h.poll(&sink).unwrap());
        assert_eq!(sink.len(), 1);

        cell.set(closed());
        assert!(!h.poll(&sink).unwrap());

        cell.set(docked_side());
        assert!(h.poll(&sink).unwrap());
        assert_eq!(sink.len(), 2);
        assert!(sink
            .violations()
            .iter()
            .all(|v| v.kind == ViolationKind::DevTools));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let sink = ViolationSink::new();
        let cell = MetricsCell::new();
        let mut h = heuristic(&cell);

        cell.set(WindowMetrics::new(1400.0, 900.0, 1400.0, 740.0));
        assert!(!h.poll(&sink).unwrap());
        cell.set(WindowMetrics::new(1400.0, 900.0, 1400.0, 739.0));
        assert!(h.poll(&sink).unwrap());
    }

    #[test]
    fn test_no_metrics_reads_closed() {
        let sink = ViolationSink::new();
        let mut h = heuristic(&MetricsCell::new());
        assert!(!h.poll(&sink).unwrap());
        assert!(sink.is_empty());
    }

    struct Broken;

    impl DevToolsProbe for Broken {
        fn is_open(&mut self) -> Result<bool, DetectorError> {
            Err(DetectorError::Unsupported("window metrics".into()))
        }
    }

    #[test]
    fn test_probe_error_propagates() {
        let sink = ViolationSink::new();
        let mut h = DevToolsHeuristic::new(Box::new(Broken));
        assert!(matches!(h.poll(&sink), Err(DetectorError::Unsupported(_))));
        assert!(sink.is_empty());
    }
}
