//! Session report summarising a monitored session.
//!
//! The report is what a consuming application hands to its own backend; this
//! crate only builds it and, optionally, writes it to disk.

use crate::sink::violation::{Violation, ViolationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Per-kind violation counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationStats {
    pub total: u64,
    /// Keyed by [`ViolationKind`]'s display form (`"shortcut:clipboard"`, `"tab_switch"`)
    pub by_kind: BTreeMap<String, u64>,
}

impl ViolationStats {
    pub fn from_violations(violations: &[Violation]) -> Self {
        let mut stats = Self::default();
        for v in violations {
            stats.total += 1;
            *stats.by_kind.entry(v.kind.to_string()).or_insert(0) += 1;
        }
        stats
    }

    /// Count for a single kind.
    pub fn count(&self, kind: ViolationKind) -> u64 {
        self.by_kind.get(&kind.to_string()).copied().unwrap_or(0)
    }
}

/// Everything known about one mounted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub host: String,
    pub mounted_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub is_secure: bool,
    pub tab_switches: u64,
    pub stats: ViolationStats,
    pub violations: Vec<Violation>,
}

impl SessionReport {
    pub fn new(
        session_id: Uuid,
        mounted_at: DateTime<Utc>,
        is_secure: bool,
        tab_switches: u64,
        violations: Vec<Violation>,
    ) -> Self {
        let generated_at = Utc::now();
        Self {
            session_id,
            host: host_name(),
            mounted_at,
            generated_at,
            duration_secs: (generated_at - mounted_at).num_seconds().max(0) as u64,
            is_secure,
            tab_switches,
            stats: ViolationStats::from_violations(&violations),
            violations,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Session Summary:\n\
             - Session: {}\n\
             - Duration: {} seconds\n\
             - Secure: {}\n\
             - Tab/window switches: {}\n\
             - Violations recorded: {}",
            self.session_id,
            self.duration_secs,
            if self.is_secure { "yes" } else { "no" },
            self.tab_switches,
            self.stats.total
        );
        for (kind, count) in &self.stats.by_kind {
            out.push_str(&format!("\n    {kind}: {count}"));
        }
        out
    }

    /// File name used when exporting this report.
    ///
    /// Millisecond timestamp first so names sort by time, then the session id
    /// so two sessions exported in the same instant do not collide.
    pub fn file_name(&self) -> String {
        format!(
            "session_{}_{}.json",
            self.generated_at.format("%Y%m%d_%H%M%S_%3f"),
            self.session_id.simple()
        )
    }

    /// Write the report as pretty JSON into `dir`, returning the file path.
    pub fn save_to_dir(&self, dir: &Path) -> Result<PathBuf, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Load a previously exported report.
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::violation::ComboGroup;

    fn sample() -> Vec<Violation> {
        vec![
            Violation::new(ViolationKind::TabSwitch, "tab/window switch detected (1)"),
            Violation::new(ViolationKind::FocusLost, "window lost focus"),
            Violation::new(ViolationKind::TabSwitch, "tab/window switch detected (2)"),
            Violation::new(
                ViolationKind::Shortcut(ComboGroup::Clipboard),
                "blocked keyboard shortcut: copy (c)",
            ),
        ]
    }

    #[test]
    fn test_stats_counting() {
        let stats = ViolationStats::from_violations(&sample());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.count(ViolationKind::TabSwitch), 2);
        assert_eq!(stats.count(ViolationKind::FocusLost), 1);
        assert_eq!(stats.count(ViolationKind::Shortcut(ComboGroup::Clipboard)), 1);
        assert_eq!(stats.count(ViolationKind::DevTools), 0);
    }

    #[test]
    fn test_summary_format() {
        let report = SessionReport::new(Uuid::new_v4(), Utc::now(), false, 2, sample());
        let summary = report.summary();

        assert!(summary.contains("Tab/window switches: 2"));
        assert!(summary.contains("Violations recorded: 4"));
        assert!(summary.contains("tab_switch: 2"));
        assert!(summary.contains("Secure: no"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let report = SessionReport::new(Uuid::new_v4(), Utc::now(), false, 2, sample());

        let path = report.save_to_dir(dir.path()).unwrap();
        assert!(path.exists());

        let loaded = SessionReport::load(&path).unwrap();
        assert_eq!(loaded.session_id, report.session_id);
        assert_eq!(loaded.violations, report.violations);
        assert_eq!(loaded.stats, report.stats);
    }

    #[test]
    fn test_same_instant_exports_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let mut first = SessionReport::new(Uuid::new_v4(), now, false, 0, sample());
        let mut second = SessionReport::new(Uuid::new_v4(), now, true, 0, Vec::new());
        first.generated_at = now;
        second.generated_at = now;

        let a = first.save_to_dir(dir.path()).unwrap();
        let b = second.save_to_dir(dir.path()).unwrap();
        assert_ne!(a, b);
        assert!(a.file_name().unwrap().to_str().unwrap().starts_with("session_"));

        assert_eq!(SessionReport::load(&a).unwrap().session_id, first.session_id);
        assert_eq!(SessionReport::load(&b).unwrap().session_id, second.session_id);
    }
}
