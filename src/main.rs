//! Lockdown Monitor CLI
//!
//! Drives a lockdown session from a stream of JSON-lines page events (a
//! browser bridge on stdin, or a recorded session file). Verdicts are written
//! to stdout, one JSON object per event; logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use lockdown_monitor::{
    events::{EventFeed, EventPublisher},
    LockdownConfig, LockdownMonitor, PageEvent, SecurityLevel, SessionReport, DETERRENT_BANNER,
    VERSION,
};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lockdown-monitor")]
#[command(version = VERSION)]
#[command(about = "Exam-integrity lockdown monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor a session from JSON-lines page events
    Watch {
        /// Security level (low, medium, high)
        #[arg(long)]
        level: Option<SecurityLevel>,

        /// Read events from a file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Disable tab/window switch detection
        #[arg(long)]
        no_tab_detection: bool,

        /// Do not block copy/cut/paste/select-all
        #[arg(long)]
        allow_copy_paste: bool,

        /// Do not write a session report on exit
        #[arg(long)]
        no_export: bool,
    },

    /// Show the summary of an exported session report
    Report {
        /// Report file (defaults to the newest report in the export directory)
        path: Option<PathBuf>,
    },

    /// Show configuration
    Config,

    /// Display the console deterrent banner
    Banner,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch {
            level,
            input,
            no_tab_detection,
            allow_copy_paste,
            no_export,
        } => cmd_watch(level, input, no_tab_detection, allow_copy_paste, no_export),
        Commands::Report { path } => cmd_report(path),
        Commands::Config => cmd_config(),
        Commands::Banner => {
            println!("{DETERRENT_BANNER}");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_watch(
    level: Option<SecurityLevel>,
    input: Option<PathBuf>,
    no_tab_detection: bool,
    allow_copy_paste: bool,
    no_export: bool,
) -> anyhow::Result<()> {
    let mut config = LockdownConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load configuration, using defaults: {e}");
        LockdownConfig::default()
    });
    if let Some(level) = level {
        config.security_level = level;
    }
    if no_tab_detection {
        config.enable_tab_switch_detection = false;
    }
    if allow_copy_paste {
        config.enable_copy_paste_prevention = false;
    }

    eprintln!("Lockdown Monitor v{VERSION}");
    eprintln!("  Security level: {}", config.security_level);
    eprintln!(
        "  Tab switch detection: {}",
        enabled(config.enable_tab_switch_detection)
    );
    eprintln!(
        "  Copy/paste prevention: {}",
        enabled(config.enable_copy_paste_prevention)
    );
    eprintln!();

    // Timer-driven detectors run on the runtime's workers
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let _guard = runtime.enter();

    let mut monitor = LockdownMonitor::mount(config.clone());
    eprintln!("Session ID: {}", monitor.session_id());

    let (publisher, feed) = EventFeed::channel();
    spawn_reader(input, publisher)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let stdout = std::io::stdout();
    while running.load(Ordering::SeqCst) {
        match feed.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                let verdict = monitor.dispatch(&event)?;
                let mut out = stdout.lock();
                serde_json::to_writer(&mut out, &verdict)?;
                writeln!(out)?;
                out.flush()?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if feed.dropped() > 0 {
        tracing::warn!(dropped = feed.dropped(), "Events dropped while the monitor was busy");
    }

    let report = monitor.report();
    monitor.unmount();

    eprintln!();
    eprintln!("{}", report.summary());

    if !no_export {
        let path = report
            .save_to_dir(&config.export_path)
            .with_context(|| format!("failed to write report to {:?}", config.export_path))?;
        eprintln!("Exported session report to {path:?}");
    }
    Ok(())
}

/// Read JSON-lines events on a background thread. The publisher is dropped at
/// end of input, which disconnects the feed.
fn spawn_reader(input: Option<PathBuf>, publisher: EventPublisher) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead + Send> = match input {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("failed to open {path:?}"))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    thread::spawn(move || {
        for (n, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Input error: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PageEvent>(&line) {
                Ok(event) => {
                    publisher.publish(event);
                }
                Err(e) => tracing::warn!(line = n + 1, "Skipping malformed event: {e}"),
            }
        }
    });
    Ok(())
}

fn cmd_report(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path,
        None => {
            let config = LockdownConfig::load().unwrap_or_default();
            newest_report(&config.export_path)?
                .with_context(|| format!("no session reports found in {:?}", config.export_path))?
        }
    };

    let report =
        SessionReport::load(&path).with_context(|| format!("failed to read report {path:?}"))?;
    println!("{}", report.summary());
    println!();
    for violation in &report.violations {
        println!("  {violation}");
    }
    Ok(())
}

fn newest_report(dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    // Report names embed a sortable timestamp
    let newest = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().map(|e| e == "json").unwrap_or(false)
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("session_"))
        })
        .max();
    Ok(newest)
}

fn cmd_config() -> anyhow::Result<()> {
    let config = LockdownConfig::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", LockdownConfig::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}
