//! Timer-definition file loading for the driver binary.
//!
//! A definition file names one or more timers, each with its rotation list,
//! its settings (the same key → values map the bracket-grouping parser
//! produces) and the displays to attach:
//!
//! ```yaml
//! timers:
//!   herb-patch:
//!     items:
//!       - "Bloody Herb {link=https://wiki/bloody}"
//!       - "Sunlight Herb"
//!       - "Mana Herb"
//!     settings:
//!       changeAt: ["sunshift"]
//!       compress: ["true"]
//!     displays:
//!       - kind: countdown
//!         depth: 3
//! ```
//!
//! Loading and validating are separate steps: [`TimerConfig::load_from_file`]
//! only requires well-formed YAML, while [`TimerConfig::build`] runs the full
//! rule validation and display construction for one timer.  A file that loads
//! can still fail to build — the error then names the timer and the setting
//! that was rejected.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::display::{self, new_sink, RenderSink};
use crate::item::Item;
use crate::rule::{build_plan, ArgumentError, RotationPlan};
use crate::settings::Settings;
use crate::timer::TimerDisplay;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    timers: BTreeMap<String, TimerEntry>,
}

/// One timer definition as it appears in the file.
#[derive(Debug, Deserialize)]
struct TimerEntry {
    /// Raw rotation list; each entry may embed `{key=...}` groups.
    items: Vec<String>,

    /// Settings map, key → ordered values (`epoch`, `changeAt`,
    /// `changeEvery`, `compress`, ...).  Unknown keys are preserved.
    #[serde(default)]
    settings: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    displays: Vec<DisplayEntry>,
}

/// One display to attach to its timer.
#[derive(Debug, Deserialize)]
struct DisplayEntry {
    /// Adapter kind: `console`, `list` or `countdown`.
    kind: String,

    /// Schedule entries this display renders.
    #[serde(default = "default_depth")]
    depth: usize,

    /// Item values to filter on (countdown only); empty means no filter.
    #[serde(default)]
    query: Vec<String>,
}

/// Serde default for a display's depth: the engine's floor.
fn default_depth() -> usize {
    2
}

// ── Public types ──────────────────────────────────────────────────────────────

/// One validated timer, ready to run: the plan for the engine, the displays
/// to attach, and the sink the sink-backed displays render into.
pub struct BuiltTimer {
    pub name: String,
    pub plan: RotationPlan,
    pub displays: Vec<Box<dyn TimerDisplay + Send>>,
    /// Shared by every `list` / `countdown` display of this timer.
    pub sink: RenderSink,
}

/// A loaded timer-definition file.
#[derive(Debug)]
pub struct TimerConfig {
    timers: BTreeMap<String, TimerEntry>,
}

impl TimerConfig {
    /// Read and parse a definition file.  Validation of the individual
    /// timers happens in [`TimerConfig::build`].
    ///
    /// # Errors
    /// The file could not be read or is not well-formed YAML.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<TimerConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read timer config: {}", path.display()))?;
        let file: ConfigFile = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse timer config: {}", path.display()))?;

        info!(
            path = %path.display(),
            timers = file.timers.len(),
            "timer configuration loaded"
        );
        Ok(TimerConfig {
            timers: file.timers,
        })
    }

    /// Configured timer names, in file (alphabetical) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.timers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Validate one timer and construct its plan and displays.
    ///
    /// # Errors
    /// [`ArgumentError`] naming the rejected setting.
    ///
    /// # Panics
    /// `name` is not a configured timer — iterate [`TimerConfig::names`] or
    /// use [`TimerConfig::build_all`].
    pub fn build(&self, name: &str) -> Result<BuiltTimer, ArgumentError> {
        let entry = &self.timers[name];
        let items: Vec<Item> = entry.items.iter().map(|raw| Item::from_text(raw)).collect();
        let settings = Settings::from(entry.settings.clone());

        let plan = build_plan(&settings, items)?;

        let sink = new_sink();
        let mut displays = Vec::with_capacity(entry.displays.len());
        for d in &entry.displays {
            displays.push(display::from_settings(
                &d.kind,
                d.depth,
                d.query.clone(),
                Arc::clone(&plan.items),
                Arc::clone(&sink),
            )?);
        }

        debug!(
            timer = name,
            items = plan.items.len(),
            displays = displays.len(),
            "timer built"
        );
        Ok(BuiltTimer {
            name: name.to_string(),
            plan,
            displays,
            sink,
        })
    }

    /// Build every configured timer, stopping at the first invalid one.
    ///
    /// # Errors
    /// The name of the failing timer plus the [`ArgumentError`] it produced.
    pub fn build_all(&self) -> Result<Vec<BuiltTimer>, (String, ArgumentError)> {
        self.names()
            .map(|name| {
                self.build(name)
                    .map_err(|err| (name.to_string(), err))
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
