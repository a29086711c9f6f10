//! Rotation-rule construction and validation.
//!
//! A timer definition arrives as a [`Settings`] map plus a rotation list.
//! [`build_plan`] validates the combination all-or-nothing and produces a
//! [`RotationPlan`] — the engine never sees half-checked input, and no timer
//! instance exists when validation fails.
//!
//! Two rule families:
//!
//! * `changeEvery=<duration>` — a fixed real-time interval; the `epoch` is
//!   the exact instant of rotation 0's boundary.
//! * `changeAt=<time of day>...` — daily triggers in either calendar (the
//!   alias `sunshift` expands to `6:00E` + `18:00E`); the `epoch` is any
//!   instant while item 0 was active.
//!
//! Items may instead carry their own `{changeAt=...}` groups: all-or-nothing
//! across the list, one calendar only, and exclusive with every list-wide
//! rule setting.  Each item is expanded into one synthetic item per trigger
//! time, the expansion is sorted by time of day, and the epoch is
//! synthesized at the earliest time on a fixed transition-free anchor date
//! (only the daily phase matters).

pub mod error;

pub use error::ArgumentError;

use tracing::{info, warn};

use crate::clock::parse::{parse_duration, parse_server_date_time, parse_time_of_day};
use crate::clock::{format::format_full_duration, Calendar, ERINN_OFFSET_MS};
use crate::item::{Item, ItemList};
use crate::settings::{parse_bool, Settings};
use crate::timer::triggers::TriggerSet;

/// 2020-01-01T00:00:00 on the server wall clock, as unix ms.  The date is
/// DST-transition free, so midnight plus a time-of-day position lands
/// exactly on that wall time; used to synthesize per-item epochs.
const REAL_ANCHOR_MS: i64 = 1_577_865_600_000;

// ── Rule types ────────────────────────────────────────────────────────────────

/// How a rotation advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationRule {
    /// Advance every fixed real-time interval (≥ 1 ms).
    Interval { interval_ms: i64 },

    /// Advance at daily times in either calendar.  Duplicate times advance
    /// the counter twice at one instant.
    DailyTriggers { erinn: TriggerSet, real: TriggerSet },
}

impl std::fmt::Display for RotationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationRule::Interval { interval_ms } => {
                write!(f, "every {}", format_full_duration(*interval_ms, Calendar::Real))
            }
            RotationRule::DailyTriggers { erinn, real } => {
                write!(
                    f,
                    "daily at {} Erinn / {} Real triggers",
                    erinn.len(),
                    real.len()
                )
            }
        }
    }
}

/// Validated construction product: everything the engine needs, nothing it
/// has to re-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPlan {
    /// Absolute instant where the rotation counter is 0.
    pub epoch_ms: i64,
    pub rule: RotationRule,
    /// Collapse consecutive entries with equal item values.
    pub compress: bool,
    /// For interval / list-wide rules: the list as given.  For per-item
    /// triggers: the expanded synthetic list, sorted by time of day.
    pub items: ItemList,
}

// ── Construction ──────────────────────────────────────────────────────────────

/// Validate a timer definition and build its plan.
///
/// # Errors
/// [`ArgumentError`] describing the first rejected setting; the rejection is
/// also logged here, once, so every construction site reports consistently.
pub fn build_plan(settings: &Settings, items: Vec<Item>) -> Result<RotationPlan, ArgumentError> {
    let plan = validate(settings, items).map_err(|err| {
        warn!(%err, "timer definition rejected");
        err
    })?;

    info!(
        rule = %plan.rule,
        items = plan.items.len(),
        compress = plan.compress,
        epoch_ms = plan.epoch_ms,
        "rotation plan built"
    );
    Ok(plan)
}

fn validate(settings: &Settings, items: Vec<Item>) -> Result<RotationPlan, ArgumentError> {
    if items.is_empty() {
        return Err(ArgumentError::EmptyItems);
    }
    let compress = parse_compress(settings)?;

    if items.iter().any(Item::has_triggers) {
        build_item_trigger_plan(settings, items, compress)
    } else {
        let (epoch_ms, rule) = build_list_rule(settings)?;
        Ok(RotationPlan {
            epoch_ms,
            rule,
            compress,
            items: items.into(),
        })
    }
}

/// List-wide rule: exactly one of `changeEvery` / `changeAt`, plus `epoch`.
fn build_list_rule(settings: &Settings) -> Result<(i64, RotationRule), ArgumentError> {
    let has_at = !settings.values("changeAt").is_empty();
    let has_every = settings.contains("changeEvery");
    if has_at && has_every {
        return Err(ArgumentError::ConflictingRules);
    }
    if !has_at && !has_every {
        return Err(ArgumentError::MissingRule);
    }

    let epoch_raw = single_value(settings, "epoch")?.ok_or(ArgumentError::MissingEpoch)?;
    let epoch =
        parse_server_date_time(epoch_raw).map_err(|source| ArgumentError::InvalidEpoch {
            value: epoch_raw.to_string(),
            source,
        })?;

    let rule = if has_every {
        let raw = single_value(settings, "changeEvery")?.ok_or(ArgumentError::MissingRule)?;
        let duration = parse_duration(raw).map_err(|source| ArgumentError::InvalidInterval {
            value: raw.to_string(),
            source,
        })?;
        if duration.ms == 0 {
            return Err(ArgumentError::ZeroInterval {
                value: raw.to_string(),
            });
        }
        RotationRule::Interval {
            interval_ms: duration.ms,
        }
    } else {
        let (erinn, real) = partition_triggers(settings.values("changeAt"))?;
        RotationRule::DailyTriggers {
            erinn: TriggerSet::new(Calendar::Erinn, erinn),
            real: TriggerSet::new(Calendar::Real, real),
        }
    };

    Ok((epoch.instant_ms, rule))
}

/// Per-item triggers: every item expands into one synthetic item per time,
/// sorted by time of day, with a synthesized epoch at the earliest time.
fn build_item_trigger_plan(
    settings: &Settings,
    items: Vec<Item>,
    compress: bool,
) -> Result<RotationPlan, ArgumentError> {
    for key in ["changeAt", "changeEvery", "epoch"] {
        if settings.contains(key) {
            return Err(ArgumentError::ItemAndListTriggers {
                key: key.to_string(),
            });
        }
    }
    let without = items.iter().filter(|i| !i.has_triggers()).count();
    if without > 0 {
        return Err(ArgumentError::PartialItemTriggers {
            with: items.len() - without,
            without,
        });
    }

    let mut calendar: Option<Calendar> = None;
    let mut expanded: Vec<(i64, Item)> = Vec::new();
    for item in &items {
        for value in expand_sunshift(&item.change_at) {
            let tod = parse_time_of_day(&value).map_err(|source| ArgumentError::InvalidTrigger {
                value: value.clone(),
                source,
            })?;
            match calendar {
                None => calendar = Some(tod.calendar),
                Some(c) if c != tod.calendar => {
                    return Err(ArgumentError::MixedTriggerCalendars)
                }
                Some(_) => {}
            }
            expanded.push((
                tod.ms,
                Item {
                    value: item.value.clone(),
                    links: item.links.clone(),
                    change_at: Vec::new(),
                },
            ));
        }
    }
    // every item carries at least one trigger, so a calendar was seen
    let calendar = calendar.ok_or(ArgumentError::MissingRule)?;

    // stable: items sharing a time keep their list order
    expanded.sort_by_key(|(ms, _)| *ms);
    let times: Vec<i64> = expanded.iter().map(|(ms, _)| *ms).collect();
    let synthetic: Vec<Item> = expanded.into_iter().map(|(_, item)| item).collect();

    let epoch_ms = synthesized_epoch(calendar, times[0]);
    let (erinn, real) = match calendar {
        Calendar::Erinn => (times, Vec::new()),
        Calendar::Real => (Vec::new(), times),
    };

    Ok(RotationPlan {
        epoch_ms,
        rule: RotationRule::DailyTriggers {
            erinn: TriggerSet::new(Calendar::Erinn, erinn),
            real: TriggerSet::new(Calendar::Real, real),
        },
        compress,
        items: synthetic.into(),
    })
}

/// An instant whose position-in-day is exactly `earliest_tod`; item 0 went
/// active at that instant, which is all a daily-trigger epoch encodes.
fn synthesized_epoch(calendar: Calendar, earliest_tod: i64) -> i64 {
    match calendar {
        Calendar::Erinn => earliest_tod - ERINN_OFFSET_MS,
        Calendar::Real => REAL_ANCHOR_MS + earliest_tod,
    }
}

// ── Setting helpers ───────────────────────────────────────────────────────────

fn parse_compress(settings: &Settings) -> Result<bool, ArgumentError> {
    match single_value(settings, "compress")? {
        None => Ok(false),
        Some(v) => parse_bool(v).ok_or_else(|| ArgumentError::InvalidCompress {
            value: v.to_string(),
        }),
    }
}

/// Exactly zero or one value for a key.
fn single_value<'a>(settings: &'a Settings, key: &str) -> Result<Option<&'a str>, ArgumentError> {
    let values = settings.values(key);
    match values.len() {
        0 => Ok(None),
        1 => Ok(Some(values[0].as_str())),
        count => Err(ArgumentError::TooManyValues {
            key: key.to_string(),
            count,
        }),
    }
}

/// Replace the `sunshift` alias with its two Erinn times, preserving order.
fn expand_sunshift(values: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        if v.trim().eq_ignore_ascii_case("sunshift") {
            out.push("6:00E".to_string());
            out.push("18:00E".to_string());
        } else {
            out.push(v.clone());
        }
    }
    out
}

/// Parse every `changeAt` value and split by calendar.
fn partition_triggers(values: &[String]) -> Result<(Vec<i64>, Vec<i64>), ArgumentError> {
    let mut erinn = Vec::new();
    let mut real = Vec::new();
    for value in expand_sunshift(values) {
        let tod = parse_time_of_day(&value).map_err(|source| ArgumentError::InvalidTrigger {
            value: value.clone(),
            source,
        })?;
        match tod.calendar {
            Calendar::Erinn => erinn.push(tod.ms),
            Calendar::Real => real.push(tod.ms),
        }
    }
    Ok((erinn, real))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
