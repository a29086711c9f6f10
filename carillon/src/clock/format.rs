/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Rendering of durations, clocks and countdowns.
//!
//! [`format_full_duration`] is the normalising inverse of
//! [`parse_duration`](super::parse::parse_duration): it always emits the full
//! shape (`HH:MM:SS.mmmS`, `HH:MME`) with every field zero-padded, so parsing
//! a formatted duration always returns the original millisecond value.  The
//! remaining helpers are presentation-only and used by the display adapters.

use super::{server_datetime, Calendar, ERINN_HOUR_MS, ERINN_MINUTE_MS};

/// Normalised full-form duration string.
///
/// Hours are unbounded (zero-padded to at least two digits).  Negative
/// inputs clamp to zero.  Erinn durations render in whole Erinn minutes;
/// sub-minute remainders (impossible for parsed Erinn durations) truncate.
pub fn format_full_duration(ms: i64, calendar: Calendar) -> String {
    let ms = ms.max(0);
    match calendar {
        Calendar::Erinn => {
            let minutes = ms / ERINN_MINUTE_MS;
            format!("{:02}:{:02}E", minutes / 60, minutes % 60)
        }
        Calendar::Real => {
            let h = ms / 3_600_000;
            let m = ms % 3_600_000 / 60_000;
            let s = ms % 60_000 / 1_000;
            let milli = ms % 1_000;
            format!("{h:02}:{m:02}:{s:02}.{milli:03}S")
        }
    }
}

/// `H:MM:SS` remaining-time rendering, truncated to whole seconds.
/// Negative inputs clamp to zero.
pub fn format_countdown(ms: i64) -> String {
    let ms = ms.max(0);
    let h = ms / 3_600_000;
    let m = ms % 3_600_000 / 60_000;
    let s = ms % 60_000 / 1_000;
    format!("{h}:{m:02}:{s:02}")
}

/// `HH:MM` Erinn clock rendering of a position within the Erinn day.
pub fn format_erinn_time_of_day(ms_after_midnight: i64) -> String {
    let ms = ms_after_midnight.max(0);
    format!(
        "{:02}:{:02}",
        ms / ERINN_HOUR_MS,
        ms % ERINN_HOUR_MS / ERINN_MINUTE_MS
    )
}

/// `YYYY-MM-DD HH:MM:SS` server wall-clock rendering of an instant.
pub fn format_server_datetime(instant_ms: i64) -> String {
    server_datetime(instant_ms)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
