/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Rotation items and the schedule entries computed over them.
//!
//! An [`Item`] is an opaque payload: the engine never interprets its value
//! beyond equality (compress mode collapses runs of equal values, queries
//! match on equality).  A [`Schedule`] is what subscribers receive: index 0
//! is always the currently active entry, later entries activate at strictly
//! increasing instants.

use std::sync::Arc;

use crate::settings::{parse_item_text, Settings};

// ── Item ──────────────────────────────────────────────────────────────────────

/// One entry of a rotation list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Item {
    /// Display text; the engine only compares it for equality.
    pub value: String,

    /// Pass-through links attached to the item (`{link=...}` groups).
    pub links: Vec<String>,

    /// Raw per-item trigger strings (`{changeAt=...}` groups).  Consumed by
    /// rule validation; empty for list-wide rules.
    pub change_at: Vec<String>,
}

impl Item {
    /// Decode a raw list entry: embedded `{key=...}` groups become the
    /// item's settings, the remaining text its value.
    pub fn from_text(raw: &str) -> Item {
        let (value, settings) = parse_item_text(raw);
        Item::from_parts(value, &settings)
    }

    /// Build from already-split text and settings.
    pub fn from_parts(value: String, settings: &Settings) -> Item {
        Item {
            value,
            links: settings.values("link").to_vec(),
            change_at: settings.values("changeAt").to_vec(),
        }
    }

    /// Plain item with no settings (the common case, and the test builder).
    pub fn plain(value: impl Into<String>) -> Item {
        Item {
            value: value.into(),
            ..Default::default()
        }
    }

    /// `true` when the item carries its own trigger times.
    pub fn has_triggers(&self) -> bool {
        !self.change_at.is_empty()
    }
}

/// Immutable, shared rotation list.  Validated once, then shared between the
/// engine and its display adapters.
pub type ItemList = Arc<[Item]>;

// ── Schedule ──────────────────────────────────────────────────────────────────

/// One computed rotation: which item, activating at which instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// Index into the rotation list.
    pub item_index: usize,

    /// Absolute activation instant, unix-epoch ms.
    pub activation_ms: i64,
}

/// Computed schedule: entry 0 active now, the rest upcoming.
pub type Schedule = Vec<ScheduleEntry>;

// ── Tests ─────────────────────────────────────────────────────────────────────
