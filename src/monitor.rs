//! The lockdown wrapper: owns every detector unit for one monitored session.
//!
//! Mounting creates the sink, the event-driven detectors and two interval
//! tasks (dev-tools poll, console advisory). Unmounting, explicitly or by
//! drop, aborts the tasks and detaches every detector; nothing fires after
//! that and the [`SecurityHandle`]s handed out start failing.

use crate::config::{LockdownConfig, SecurityLevel};
use crate::detectors::{
    AdvisoryConsole, ConsoleAdvisory, Detector, DevToolsHeuristic, DevToolsProbe,
    InteractionBlocker, KeyComboDetector, MetricsCell, TabSwitchCounter, TracingConsole,
    ViewportDeltaProbe, VisibilityDetector,
};
use crate::events::{EventVerdict, PageEvent};
use crate::sink::{
    create_shared_sink, SecurityState, SessionReport, SharedViolationSink, StateSubscriber,
    SubscriptionId, Violation, ViolationCallback,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// Misuse of the security API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockdownError {
    #[error("security state requested outside an active lockdown wrapper")]
    OutsideLockdown,
    #[error("lockdown session has been unmounted")]
    NotMounted,
}

/// Host-provided collaborators for a session.
pub struct MonitorBindings {
    /// External sink invoked on every violation
    pub on_violation: Option<ViolationCallback>,
    /// Replaces the default viewport-delta probe
    pub devtools_probe: Option<Box<dyn DevToolsProbe>>,
    pub console: Box<dyn AdvisoryConsole>,
    /// Additional event-driven detectors, run after the built-in ones
    pub extra_detectors: Vec<Box<dyn Detector>>,
}

impl MonitorBindings {
    pub fn with_callback(mut self, callback: ViolationCallback) -> Self {
        self.on_violation = Some(callback);
        self
    }

    pub fn with_probe(mut self, probe: Box<dyn DevToolsProbe>) -> Self {
        self.devtools_probe = Some(probe);
        self
    }

    pub fn with_console(mut self, console: Box<dyn AdvisoryConsole>) -> Self {
        self.console = console;
        self
    }

    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.extra_detectors.push(detector);
        self
    }
}

impl Default for MonitorBindings {
    fn default() -> Self {
        Self {
            on_violation: None,
            devtools_probe: None,
            console: Box::new(TracingConsole),
            extra_detectors: Vec::new(),
        }
    }
}

struct DetectorSlot {
    detector: Box<dyn Detector>,
    disabled: bool,
}

/// One mounted lockdown session.
pub struct LockdownMonitor {
    session_id: Uuid,
    config: LockdownConfig,
    sink: SharedViolationSink,
    counter: TabSwitchCounter,
    metrics: MetricsCell,
    detectors: Vec<DetectorSlot>,
    tasks: Vec<JoinHandle<()>>,
    mounted: Arc<AtomicBool>,
    mounted_at: DateTime<Utc>,
}

impl LockdownMonitor {
    /// Mount a session with default bindings.
    pub fn mount(config: LockdownConfig) -> Self {
        Self::mount_with(config, MonitorBindings::default())
    }

    /// Mount a session.
    ///
    /// The timer-driven units need a tokio runtime; without one they are
    /// skipped and the event-driven units still run.
    pub fn mount_with(config: LockdownConfig, bindings: MonitorBindings) -> Self {
        let session_id = Uuid::new_v4();
        let sink = create_shared_sink(bindings.on_violation);
        let counter = TabSwitchCounter::new();
        let metrics = MetricsCell::new();
        let mounted = Arc::new(AtomicBool::new(true));

        let mut detectors: Vec<Box<dyn Detector>> = Vec::new();
        if config.any_key_blocking() {
            detectors.push(Box::new(KeyComboDetector::from_config(&config)));
        }
        if config.enable_tab_switch_detection {
            detectors.push(Box::new(VisibilityDetector::new(
                config.focus_return_threshold,
                counter.clone(),
            )));
        }
        detectors.push(Box::new(InteractionBlocker::new(config.security_level)));
        detectors.extend(bindings.extra_detectors);

        let mut monitor = Self {
            session_id,
            config,
            sink,
            counter,
            metrics,
            detectors: detectors
                .into_iter()
                .map(|detector| DetectorSlot {
                    detector,
                    disabled: false,
                })
                .collect(),
            tasks: Vec::new(),
            mounted,
            mounted_at: Utc::now(),
        };

        let probe = bindings.devtools_probe.unwrap_or_else(|| {
            Box::new(ViewportDeltaProbe::new(
                monitor.metrics.clone(),
                monitor.config.devtools_threshold_px,
            ))
        });
        monitor.start_timers(probe, bindings.console);

        tracing::debug!(
            session = %monitor.session_id,
            level = %monitor.config.security_level,
            detectors = ?monitor.active_detectors(),
            "Lockdown mounted"
        );
        monitor
    }

    fn start_timers(&mut self, probe: Box<dyn DevToolsProbe>, console: Box<dyn AdvisoryConsole>) {
        let mut advisory = ConsoleAdvisory::new(console);
        // Immediate banner on mount, independent of the runtime
        advisory.issue();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No tokio runtime: dev-tools heuristic and console advisory disabled");
            return;
        };

        if let Some(period) = nonzero(self.config.devtools_poll_interval, "dev-tools poll") {
            let mut heuristic = DevToolsHeuristic::new(probe);
            let sink = self.sink.clone();
            let mounted = self.mounted.clone();
            self.tasks.push(runtime.spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if !mounted.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Err(e) = heuristic.poll(&sink) {
                        tracing::warn!("Dev-tools heuristic disabled: {e}");
                        break;
                    }
                }
            }));
        }

        if let Some(period) = nonzero(self.config.advisory_interval, "console advisory") {
            let mounted = self.mounted.clone();
            self.tasks.push(runtime.spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if !mounted.load(Ordering::SeqCst) || advisory.is_disabled() {
                        break;
                    }
                    advisory.issue();
                }
            }));
        }
    }

    /// Route one page event through every active detector.
    ///
    /// A detector that errors is disabled for the rest of the session; the
    /// others keep running.
    pub fn dispatch(&mut self, event: &PageEvent) -> Result<EventVerdict, LockdownError> {
        if !self.is_mounted() {
            return Err(LockdownError::NotMounted);
        }

        if let PageEvent::Viewport { metrics, .. } = event {
            self.metrics.set(*metrics);
        }

        let mut verdict = EventVerdict::PASS;
        for slot in self.detectors.iter_mut().filter(|s| !s.disabled) {
            match slot.detector.handle(event, &self.sink) {
                Ok(v) => verdict = verdict.merge(v),
                Err(e) => {
                    tracing::warn!(detector = slot.detector.name(), "Detector disabled: {e}");
                    slot.disabled = true;
                }
            }
        }
        Ok(verdict)
    }

    /// Read surface for UI code nested inside this session.
    pub fn handle(&self) -> SecurityHandle {
        SecurityHandle {
            sink: self.sink.clone(),
            level: self.config.security_level,
            counter: self.counter.clone(),
            mounted: self.mounted.clone(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &LockdownConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Names of the event-driven detectors still running.
    pub fn active_detectors(&self) -> Vec<&'static str> {
        self.detectors
            .iter()
            .filter(|s| !s.disabled)
            .map(|s| s.detector.name())
            .collect()
    }

    /// Summary of the session so far.
    pub fn report(&self) -> SessionReport {
        let state = self.sink.state();
        SessionReport::new(
            self.session_id,
            self.mounted_at,
            state.is_secure,
            self.counter.get(),
            state.violations,
        )
    }

    /// Tear the session down. Idempotent.
    pub fn unmount(&mut self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.detectors.clear();
        self.sink.close();
        tracing::debug!(session = %self.session_id, "Lockdown unmounted");
    }
}

impl Drop for LockdownMonitor {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn nonzero(period: Duration, what: &str) -> Option<Duration> {
    if period.is_zero() {
        tracing::warn!("{what} interval is zero; disabled");
        None
    } else {
        Some(period)
    }
}

/// Security state and API exposed to code inside a lockdown session.
///
/// Every call fails with [`LockdownError::NotMounted`] once the session is
/// unmounted, so callers never mistake a dead session for active monitoring.
#[derive(Clone)]
pub struct SecurityHandle {
    sink: SharedViolationSink,
    level: SecurityLevel,
    counter: TabSwitchCounter,
    mounted: Arc<AtomicBool>,
}

impl SecurityHandle {
    fn ensure_mounted(&self) -> Result<(), LockdownError> {
        if self.mounted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LockdownError::NotMounted)
        }
    }

    pub fn is_active(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> Result<SecurityState, LockdownError> {
        self.ensure_mounted()?;
        Ok(self.sink.state())
    }

    pub fn is_secure(&self) -> Result<bool, LockdownError> {
        self.ensure_mounted()?;
        Ok(self.sink.is_secure())
    }

    pub fn violations(&self) -> Result<Vec<Violation>, LockdownError> {
        self.ensure_mounted()?;
        Ok(self.sink.violations())
    }

    /// Register a violation from a custom probe elsewhere in the page.
    pub fn add_violation(&self, reason: impl Into<String>) -> Result<(), LockdownError> {
        self.ensure_mounted()?;
        self.sink.add_violation(reason);
        Ok(())
    }

    pub fn clear_violations(&self) -> Result<(), LockdownError> {
        self.ensure_mounted()?;
        self.sink.clear_violations();
        Ok(())
    }

    pub fn security_level(&self) -> Result<SecurityLevel, LockdownError> {
        self.ensure_mounted()?;
        Ok(self.level)
    }

    pub fn tab_switch_count(&self) -> Result<u64, LockdownError> {
        self.ensure_mounted()?;
        Ok(self.counter.get())
    }

    /// Be notified after every append or clear, until unmount.
    pub fn subscribe(&self, subscriber: StateSubscriber) -> Result<SubscriptionId, LockdownError> {
        self.ensure_mounted()?;
        Ok(self.sink.subscribe(subscriber))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.sink.unsubscribe(id)
    }
}

impl std::fmt::Debug for SecurityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityHandle")
            .field("level", &self.level)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Resolve the security API from the enclosing scope.
///
/// Fails fast when no lockdown wrapper is in scope or it has been torn down.
pub fn use_security(scope: Option<&SecurityHandle>) -> Result<&SecurityHandle, LockdownError> {
    let handle = scope.ok_or(LockdownError::OutsideLockdown)?;
    handle.ensure_mounted()?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{KeyEvent, Modifiers};

    #[test]
    fn test_mount_without_runtime_keeps_event_detectors() {
        let mut monitor = LockdownMonitor::mount(LockdownConfig::default());
        assert_eq!(
            monitor.active_detectors(),
            vec!["key_combo", "visibility", "interaction"]
        );

        monitor.dispatch(&PageEvent::blur()).unwrap();
        assert_eq!(monitor.handle().violations().unwrap().len(), 1);
    }

    #[test]
    fn test_tab_detection_flag_removes_visibility_detector() {
        let config = LockdownConfig {
            enable_tab_switch_detection: false,
            ..LockdownConfig::default()
        };
        let mut monitor = LockdownMonitor::mount(config);
        assert!(!monitor.active_detectors().contains(&"visibility"));

        monitor.dispatch(&PageEvent::visibility(true)).unwrap();
        monitor.dispatch(&PageEvent::blur()).unwrap();
        let handle = monitor.handle();
        assert!(handle.is_secure().unwrap());
        assert_eq!(handle.tab_switch_count().unwrap(), 0);
    }

    #[test]
    fn test_handle_fails_after_unmount() {
        let mut monitor = LockdownMonitor::mount(LockdownConfig::default());
        let handle = monitor.handle();
        assert!(handle.state().is_ok());

        monitor.unmount();
        monitor.unmount();
        assert_eq!(handle.state(), Err(LockdownError::NotMounted));
        assert_eq!(handle.add_violation("late"), Err(LockdownError::NotMounted));
        assert_eq!(
            monitor.dispatch(&PageEvent::context_menu()),
            Err(LockdownError::NotMounted)
        );
        assert!(monitor.active_detectors().is_empty());
    }

    #[test]
    fn test_use_security_outside_scope() {
        assert_eq!(use_security(None).unwrap_err(), LockdownError::OutsideLockdown);

        let monitor = LockdownMonitor::mount(LockdownConfig::default());
        let handle = monitor.handle();
        assert!(use_security(Some(&handle)).is_ok());

        drop(monitor);
        assert_eq!(
            use_security(Some(&handle)).unwrap_err(),
            LockdownError::NotMounted
        );
    }

    struct Faulty;

    impl Detector for Faulty {
        fn name(&self) -> &'static str {
            "faulty"
        }

        fn handle(
            &mut self,
            _event: &PageEvent,
            _sink: &crate::sink::ViolationSink,
        ) -> Result<EventVerdict, crate::detectors::DetectorError> {
            Err(crate::detectors::DetectorError::Unsupported("selection api".into()))
        }
    }

    #[test]
    fn test_failing_detector_is_isolated() {
        let bindings = MonitorBindings::default().with_detector(Box::new(Faulty));
        let mut monitor = LockdownMonitor::mount_with(LockdownConfig::default(), bindings);
        assert!(monitor.active_detectors().contains(&"faulty"));

        let verdict = monitor
            .dispatch(&PageEvent::Key(KeyEvent::down("F12", Modifiers::NONE)))
            .unwrap();
        assert_eq!(verdict, EventVerdict::BLOCK);
        assert!(!monitor.active_detectors().contains(&"faulty"));

        // Remaining detectors still run
        monitor.dispatch(&PageEvent::context_menu()).unwrap();
        assert_eq!(monitor.handle().violations().unwrap().len(), 2);
    }

    #[test]
    fn test_report_reflects_session() {
        let mut monitor = LockdownMonitor::mount(LockdownConfig::default());
        monitor.dispatch(&PageEvent::visibility(true)).unwrap();
        monitor.dispatch(&PageEvent::visibility(false)).unwrap();

        let report = monitor.report();
        assert_eq!(report.session_id, monitor.session_id());
        assert_eq!(report.tab_switches, 1);
        assert!(!report.is_secure);
        assert_eq!(report.stats.total, 1);
    }
}
