//! Blocked keyboard combinations.
//!
//! A combo matches when the pressed key equals the combo key (ASCII
//! case-insensitive) and every modifier rule accepts the modifier state. A
//! modifier the combo does not mention is not checked, so `Ctrl+C` also
//! matches `Ctrl+Shift+C`. The first matching combo in table order wins.

use crate::config::LockdownConfig;
use crate::detectors::{Detector, DetectorError};
use crate::events::{EventVerdict, KeyEvent, KeyPhase, PageEvent};
use crate::sink::{ComboGroup, Violation, ViolationKind, ViolationSink};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Requirement on a single modifier key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierRule {
    /// Not checked
    #[default]
    Any,
    /// Must be held
    Held,
    /// Must not be held
    Released,
}

impl ModifierRule {
    fn accepts(self, pressed: bool) -> bool {
        match self {
            ModifierRule::Any => true,
            ModifierRule::Held => pressed,
            ModifierRule::Released => !pressed,
        }
    }
}

/// One blocked key combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    pub key: String,
    pub group: ComboGroup,
    #[serde(default)]
    pub ctrl: ModifierRule,
    #[serde(default)]
    pub shift: ModifierRule,
    #[serde(default)]
    pub alt: ModifierRule,
    #[serde(default)]
    pub meta: ModifierRule,
}

impl KeyCombo {
    /// A bare key with no modifier checks.
    pub fn new(group: ComboGroup, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            group,
            ctrl: ModifierRule::Any,
            shift: ModifierRule::Any,
            alt: ModifierRule::Any,
            meta: ModifierRule::Any,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = ModifierRule::Held;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = ModifierRule::Held;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = ModifierRule::Held;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = ModifierRule::Held;
        self
    }

    /// Whether `event` triggers this combo.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.key.eq_ignore_ascii_case(&self.key)
            && self.ctrl.accepts(event.modifiers.ctrl)
            && self.shift.accepts(event.modifiers.shift)
            && self.alt.accepts(event.modifiers.alt)
            && self.meta.accepts(event.modifiers.meta)
    }

    /// Human form, e.g. `Ctrl+Shift+I`.
    pub fn label(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.ctrl == ModifierRule::Held {
            parts.push("Ctrl".into());
        }
        if self.meta == ModifierRule::Held {
            parts.push("Meta".into());
        }
        if self.alt == ModifierRule::Held {
            parts.push("Alt".into());
        }
        if self.shift == ModifierRule::Held {
            parts.push("Shift".into());
        }
        if self.key.chars().count() == 1 {
            parts.push(self.key.to_uppercase());
        } else {
            parts.push(self.key.clone());
        }
        parts.join("+")
    }
}

/// Build the default combo table for `config`, in match order.
pub fn default_combos(config: &LockdownConfig) -> Vec<KeyCombo> {
    use ComboGroup::*;
    let mut combos = Vec::new();

    if config.enable_screenshot_prevention {
        combos.push(KeyCombo::new(Capture, "PrintScreen"));
        // macOS full/area/toolbar capture
        for key in ["3", "4", "5"] {
            combos.push(KeyCombo::new(Capture, key).meta().shift());
        }
        // Windows snipping tool
        combos.push(KeyCombo::new(Capture, "s").meta().shift());
    }

    if config.enable_keyboard_blocking {
        combos.push(KeyCombo::new(DevTools, "F12"));
        for key in ["i", "j", "c"] {
            combos.push(KeyCombo::new(DevTools, key).ctrl().shift());
            combos.push(KeyCombo::new(DevTools, key).meta().alt());
        }
        combos.push(KeyCombo::new(DevTools, "u").ctrl());
        combos.push(KeyCombo::new(DevTools, "u").meta().alt());
    }

    if config.enable_copy_paste_prevention {
        for key in ["c", "x", "v", "a"] {
            combos.push(KeyCombo::new(Clipboard, key).ctrl());
            combos.push(KeyCombo::new(Clipboard, key).meta());
        }
    }

    if config.enable_keyboard_blocking {
        combos.push(KeyCombo::new(Navigation, "F5"));
        combos.push(KeyCombo::new(Navigation, "r").ctrl().shift());
        combos.push(KeyCombo::new(Navigation, "r").ctrl());
        combos.push(KeyCombo::new(Navigation, "r").meta());
        combos.push(KeyCombo::new(Navigation, "t").ctrl());
        combos.push(KeyCombo::new(Navigation, "n").ctrl());
        combos.push(KeyCombo::new(Navigation, "w").ctrl());
        combos.push(KeyCombo::new(Navigation, "Tab").ctrl());
        combos.push(KeyCombo::new(Navigation, "Tab").alt());
        combos.push(KeyCombo::new(Navigation, "Tab").meta());
    }

    combos
}

/// Matches key events against the blocked-combo table.
pub struct KeyComboDetector {
    combos: Vec<KeyCombo>,
    /// Keys whose key-down was already reported, so the release stays silent
    reported_down: HashSet<String>,
}

impl KeyComboDetector {
    pub fn new(combos: Vec<KeyCombo>) -> Self {
        Self {
            combos,
            reported_down: HashSet::new(),
        }
    }

    pub fn from_config(config: &LockdownConfig) -> Self {
        Self::new(default_combos(config))
    }

    pub fn combos(&self) -> &[KeyCombo] {
        &self.combos
    }

    /// First combo in table order matching `event`.
    pub fn find_match(&self, event: &KeyEvent) -> Option<&KeyCombo> {
        self.combos.iter().find(|combo| combo.matches(event))
    }

    fn report(sink: &ViolationSink, combo: &KeyCombo, event: &KeyEvent) {
        sink.record(Violation::at(
            ViolationKind::Shortcut(combo.group),
            format!("blocked keyboard shortcut: {} ({})", combo.label(), event.key),
            event.timestamp,
        ));
    }
}

impl Detector for KeyComboDetector {
    fn name(&self) -> &'static str {
        "key_combo"
    }

    fn handle(
        &mut self,
        event: &PageEvent,
        sink: &ViolationSink,
    ) -> Result<EventVerdict, DetectorError> {
        let key_event = match event {
            PageEvent::Key(key_event) => key_event,
            // Releases are not delivered while the page is away, so pending
            // presses would otherwise mask the next release-only report
            PageEvent::Blur { .. } | PageEvent::VisibilityChange { hidden: true, .. } => {
                self.reported_down.clear();
                return Ok(EventVerdict::PASS);
            }
            _ => return Ok(EventVerdict::PASS),
        };
        let key = key_event.key.to_ascii_lowercase();

        match key_event.phase {
            KeyPhase::Down => {
                let Some(combo) = self.find_match(key_event) else {
                    return Ok(EventVerdict::PASS);
                };
                Self::report(sink, combo, key_event);
                self.reported_down.insert(key);
                Ok(EventVerdict::BLOCK)
            }
            KeyPhase::Up => {
                // Release clears the pending entry even if modifiers changed meanwhile
                let already_reported = self.reported_down.remove(&key);
                let Some(combo) = self.find_match(key_event) else {
                    return Ok(EventVerdict::PASS);
                };
                // Some platforms only deliver PrintScreen on release
                if !already_reported {
                    Self::report(sink, combo, key_event);
                }
                Ok(EventVerdict::BLOCK)
            }
        }
    }
}
