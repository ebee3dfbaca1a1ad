//! Demonstration of a lockdown session.
//!
//! This example shows how to:
//! 1. Mount a monitor with a violation callback
//! 2. Dispatch page events the way a browser bridge would
//! 3. Read security state through a handle
//! 4. Acknowledge violations with a manual reset
//! 5. Build a session report
//!
//! Run with: cargo run --example session_demo

use std::sync::Arc;
use std::time::Duration;

use lockdown_monitor::{
    KeyEvent, LockdownConfig, LockdownMonitor, Modifiers, MonitorBindings, PageEvent,
    SecurityLevel, Violation, WindowMetrics,
};

#[tokio::main]
async fn main() {
    println!("Lockdown Monitor - Session Demo");
    println!("===============================");
    println!();

    let config = LockdownConfig {
        security_level: SecurityLevel::High,
        ..LockdownConfig::default()
    };

    // The callback is where an application would forward violations to its backend
    let bindings = MonitorBindings::default().with_callback(Arc::new(|v: &Violation| {
        println!("  -> callback: {v}");
    }));

    let mut monitor = LockdownMonitor::mount_with(config, bindings);
    let handle = monitor.handle();
    println!("Session {} mounted", monitor.session_id());
    println!();

    let script = vec![
        ("copy attempt", PageEvent::Key(KeyEvent::down("c", Modifiers::ctrl()))),
        ("inspector shortcut", PageEvent::Key(KeyEvent::down("i", Modifiers::ctrl_shift()))),
        ("right click", PageEvent::context_menu()),
        ("text selection", PageEvent::select_start()),
        ("switch tab", PageEvent::visibility(true)),
        ("come back", PageEvent::visibility(false)),
        (
            "dock inspector",
            PageEvent::viewport(WindowMetrics::new(1440.0, 900.0, 1440.0, 500.0)),
        ),
    ];

    for (label, event) in script {
        let verdict = monitor.dispatch(&event).expect("session is mounted");
        println!(
            "{label:<20} prevented={:<5} stopped={}",
            verdict.default_prevented, verdict.propagation_stopped
        );
    }

    // Give the dev-tools heuristic a poll
    tokio::time::sleep(Duration::from_millis(600)).await;

    println!();
    println!("Secure: {}", handle.is_secure().expect("session is mounted"));
    println!();
    println!("{}", monitor.report().summary());

    // The proctor acknowledges the violations
    handle.clear_violations().expect("session is mounted");
    println!();
    println!(
        "After acknowledgement, secure: {}",
        handle.is_secure().expect("session is mounted")
    );

    monitor.unmount();
    println!(
        "After unmount, state access fails: {}",
        handle.state().unwrap_err()
    );
}
