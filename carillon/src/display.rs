/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Built-in display adapters.
//!
//! Three thin renderers behind the [`TimerDisplay`] trait, selected by a
//! type tag in [`from_settings`]:
//!
//! * `console` — logs the active item and upcoming entries via `tracing`.
//! * `list` — renders `value @ wall-clock time` lines into a [`RenderSink`].
//! * `countdown` — renders `value in H:MM:SS` lines into a sink; an
//!   optional query filter keeps only matching values.
//!
//! Adapters resolve item values through their shared item list and render
//! into plain text.  They hold no engine state; everything they show comes
//! from the last delivered schedule.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::clock::format::{format_countdown, format_server_datetime};
use crate::item::{ItemList, ScheduleEntry};
use crate::rule::ArgumentError;
use crate::timer::runner::now_ms;
use crate::timer::TimerDisplay;

/// Shared line buffer the sink-backed displays render into.  Each delivery
/// replaces the previous rendering.
pub type RenderSink = Arc<Mutex<Vec<String>>>;

/// Fresh empty sink.
pub fn new_sink() -> RenderSink {
    Arc::new(Mutex::new(Vec::new()))
}

/// Build a display adapter from its configured kind.
///
/// # Errors
/// [`ArgumentError::UnknownDisplayKind`] for an unrecognized tag.
pub fn from_settings(
    kind: &str,
    depth: usize,
    query: Vec<String>,
    items: ItemList,
    sink: RenderSink,
) -> Result<Box<dyn TimerDisplay + Send>, ArgumentError> {
    match kind {
        "console" => Ok(Box::new(ConsoleDisplay { depth, items })),
        "list" => Ok(Box::new(ListDisplay { depth, items, sink })),
        "countdown" => Ok(Box::new(CountdownDisplay {
            depth,
            query,
            items,
            sink,
        })),
        other => {
            let err = ArgumentError::UnknownDisplayKind {
                kind: other.to_string(),
            };
            warn!(%err, "display configuration rejected");
            Err(err)
        }
    }
}

fn value_of(items: &ItemList, entry: &ScheduleEntry) -> String {
    items
        .get(entry.item_index)
        .map(|item| item.value.clone())
        .unwrap_or_else(|| format!("#{}", entry.item_index))
}

// ── ConsoleDisplay ────────────────────────────────────────────────────────────

/// Logs each delivered schedule.
pub struct ConsoleDisplay {
    depth: usize,
    items: ItemList,
}

impl TimerDisplay for ConsoleDisplay {
    fn depth(&self) -> usize {
        self.depth
    }

    fn query(&self) -> &[String] {
        &[]
    }

    fn receive_schedule(&mut self, schedule: &[ScheduleEntry]) {
        let Some(active) = schedule.first() else {
            return;
        };
        info!(
            active = %value_of(&self.items, active),
            since = %format_server_datetime(active.activation_ms),
            "rotation"
        );
        for entry in schedule.iter().take(self.depth).skip(1) {
            debug!(
                value = %value_of(&self.items, entry),
                at = %format_server_datetime(entry.activation_ms),
                "upcoming"
            );
        }
    }
}

// ── ListDisplay ───────────────────────────────────────────────────────────────

/// Renders `value @ wall-clock time` lines, the active entry first.
pub struct ListDisplay {
    depth: usize,
    items: ItemList,
    sink: RenderSink,
}

impl TimerDisplay for ListDisplay {
    fn depth(&self) -> usize {
        self.depth
    }

    fn query(&self) -> &[String] {
        &[]
    }

    fn receive_schedule(&mut self, schedule: &[ScheduleEntry]) {
        let Ok(mut lines) = self.sink.lock() else {
            return;
        };
        lines.clear();
        for entry in schedule.iter().take(self.depth) {
            lines.push(format!(
                "{} @ {}",
                value_of(&self.items, entry),
                format_server_datetime(entry.activation_ms)
            ));
        }
    }
}

// ── CountdownDisplay ──────────────────────────────────────────────────────────

/// Renders `value in H:MM:SS` lines for upcoming entries (the active one
/// renders as `value now`).  A non-empty query keeps only matching values.
pub struct CountdownDisplay {
    depth: usize,
    query: Vec<String>,
    items: ItemList,
    sink: RenderSink,
}

impl CountdownDisplay {
    fn matches(&self, value: &str) -> bool {
        self.query.is_empty() || self.query.iter().any(|q| q == value)
    }
}

impl TimerDisplay for CountdownDisplay {
    fn depth(&self) -> usize {
        self.depth
    }

    fn query(&self) -> &[String] {
        &self.query
    }

    fn receive_schedule(&mut self, schedule: &[ScheduleEntry]) {
        let now = now_ms();
        let Ok(mut lines) = self.sink.lock() else {
            return;
        };
        lines.clear();
        let rendered = schedule
            .iter()
            .map(|entry| (value_of(&self.items, entry), entry.activation_ms))
            .filter(|(value, _)| self.matches(value))
            .take(self.depth);
        for (value, activation_ms) in rendered {
            if activation_ms <= now {
                lines.push(format!("{value} now"));
            } else {
                lines.push(format!("{value} in {}", format_countdown(activation_ms - now)));
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
