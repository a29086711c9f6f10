/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Carillon – dual-calendar rotation scheduling engine.
//!
//! A rotation timer cycles through a fixed list of items on a schedule: a
//! fixed real-time interval, or daily trigger times in either of two
//! calendars — the server wall clock (DST-aware, one fixed zone) and the
//! fast-running synthetic Erinn clock.  Attached displays state how far
//! ahead they need to see and receive the computed schedule on every
//! rotation.
//!
//! ```text
//! lib.rs
//! ├── clock/       – calendars, constants, time-string grammar, formatting
//! ├── item.rs      – rotation items and schedule entries
//! ├── settings.rs  – bracket-grouping settings parser
//! ├── rule/        – rotation-rule validation (settings → RotationPlan)
//! ├── timer/       – RotateTimer engine, trigger sets, demand, tokio runner
//! ├── display.rs   – console / list / countdown display adapters
//! └── config.rs    – YAML timer-definition files for the binary
//! ```
//!
//! The engine core is synchronous and driven by explicit `now` instants;
//! [`timer::runner`] wraps it in a tokio task that sleeps until the next
//! rotation boundary and recomputes from absolute time on every wake.

pub mod clock;
pub mod config;
pub mod display;
pub mod item;
pub mod rule;
pub mod settings;
pub mod timer;
