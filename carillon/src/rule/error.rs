/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for rotation-rule validation.
//!
//! [`ArgumentError`] covers everything a timer definition can get wrong:
//! malformed time strings, contradictory rule combinations, unusable flag
//! values.  Construction is all-or-nothing — when any variant is returned,
//! no timer instance exists.
//!
//! Every variant carries the offending key/value verbatim so the caller can
//! emit a fully-qualified `tracing` warning without re-parsing anything.

use thiserror::Error;

use crate::clock::parse::TimeStringError;

/// Why a timer definition was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    /// Neither `changeAt` nor `changeEvery` was given (and no item carries
    /// its own triggers).
    #[error("settings select no rotation rule — changeAt or changeEvery is required")]
    MissingRule,

    /// Both `changeAt` and `changeEvery` were given.
    #[error("changeAt and changeEvery are mutually exclusive")]
    ConflictingRules,

    /// A single-valued setting was given more than once.
    #[error("setting '{key}' takes one value, got {count}")]
    TooManyValues { key: String, count: usize },

    /// The rule needs an `epoch` and none was given.
    #[error("epoch is required — the rule has no rotation-zero instant without it")]
    MissingEpoch,

    /// `epoch` did not parse as a server date-time.
    #[error("epoch '{value}' rejected: {source}")]
    InvalidEpoch {
        value: String,
        source: TimeStringError,
    },

    /// A `changeAt` value did not parse as a time of day in either calendar.
    #[error("changeAt '{value}' rejected: {source}")]
    InvalidTrigger {
        value: String,
        source: TimeStringError,
    },

    /// `changeEvery` did not parse as a duration.
    #[error("changeEvery '{value}' rejected: {source}")]
    InvalidInterval {
        value: String,
        source: TimeStringError,
    },

    /// `changeEvery` parsed to zero milliseconds.
    #[error("changeEvery '{value}' is zero — the interval must be at least 1ms")]
    ZeroInterval { value: String },

    /// `compress` was neither `true` nor `false`.
    #[error("compress '{value}' is not a boolean (expected true or false)")]
    InvalidCompress { value: String },

    /// The rotation list is empty.
    #[error("rotation list is empty — at least one item is required")]
    EmptyItems,

    /// Some items carry their own `changeAt` and some do not; per-item
    /// triggers are all-or-nothing.
    #[error("per-item changeAt must cover every item ({with} items have it, {without} do not)")]
    PartialItemTriggers { with: usize, without: usize },

    /// Items carry their own triggers but a list-wide rule setting was also
    /// given.
    #[error("per-item changeAt conflicts with list-wide setting '{key}'")]
    ItemAndListTriggers { key: String },

    /// Per-item trigger times mix the Erinn and Real calendars.
    #[error("per-item changeAt times must all use one calendar")]
    MixedTriggerCalendars,

    /// A display definition named a kind no adapter exists for.
    #[error("unknown display kind: '{kind}' (valid: console, list, countdown)")]
    UnknownDisplayKind { kind: String },
}
