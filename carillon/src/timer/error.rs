/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runtime error types for the rotation engine.
//!
//! Two enums model the two runtime failure layers:
//!
//! * [`TimerError`] — internal invariant violations.  Logged via `tracing`;
//!   the engine keeps its previous good state and carries on.
//! * [`DisplayError`] — subscriber-contract violations (bad depth, unusable
//!   query, detach of an unknown display).  Logged; the operation is a
//!   no-op.
//!
//! Neither is ever allowed to escape as a panic.

use thiserror::Error;

use super::DisplayId;

/// Internal engine failure.  Seeing one of these in the logs means a bug,
/// not bad user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// Schedule generation hit the hard entry cap before satisfying demand.
    #[error("schedule generation stopped at {len} entries (cap {cap}) with demand unsatisfied")]
    ScheduleOverflow { len: usize, cap: usize },

    /// Trigger resolution could not find an occurrence within its search
    /// window around an instant.
    #[error("no trigger occurrence found near instant {instant_ms}")]
    TriggerResolution { instant_ms: i64 },
}

/// Subscriber-contract violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    /// A display stated a depth of zero.
    #[error("display depth must be at least 1, got {depth}")]
    InvalidDepth { depth: usize },

    /// A display's query names a value that no rotation item has; the
    /// query could never be satisfied by any schedule.
    #[error("query value '{value}' does not occur in the rotation list")]
    UnsatisfiableQuery { value: String },

    /// Detach of a display that is not attached.
    #[error("{id} is not attached")]
    NotAttached { id: DisplayId },

    /// A delivered schedule was shorter than the display's stated depth
    /// (only possible when generation stopped early, e.g. a value-constant
    /// compressed rotation).
    #[error("schedule has {len} entries but the display asked for {depth}")]
    ScheduleShorterThanDepth { depth: usize, len: usize },
}
