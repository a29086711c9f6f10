/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Aggregate schedule demand across attached displays.
//!
//! Each display states how far ahead it wants to see (depth) and optionally
//! which item values it is interested in (query).  The engine folds every
//! attached display into one [`Demand`] and generates schedule entries until
//! it is satisfied.  The aggregate is rebuilt from scratch on every attach
//! and detach — there is no incremental bookkeeping to drift.

use crate::item::{Item, ScheduleEntry};

/// The engine always computes at least the active entry and its successor,
/// whatever the displays ask for.
pub const MIN_DEPTH: usize = 2;

/// One display's query: at least `required` schedule entries whose item
/// value is in `values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDemand {
    pub values: Vec<String>,
    pub required: usize,
}

impl QueryDemand {
    /// Entries of `schedule` matching this query's value set.
    pub fn matches(&self, schedule: &[ScheduleEntry], items: &[Item]) -> usize {
        schedule
            .iter()
            .filter(|e| {
                items
                    .get(e.item_index)
                    .is_some_and(|item| self.values.iter().any(|v| *v == item.value))
            })
            .count()
    }
}

/// Folded demand of every attached display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demand {
    /// `max(MIN_DEPTH, max over display depths)`.
    pub depth: usize,
    /// One entry per attached display with a non-empty query.
    pub queries: Vec<QueryDemand>,
}

impl Default for Demand {
    fn default() -> Self {
        Demand {
            depth: MIN_DEPTH,
            queries: Vec::new(),
        }
    }
}

impl Demand {
    pub fn new() -> Demand {
        Demand::default()
    }

    /// Fold one display's stated interest into the aggregate.
    pub fn observe(&mut self, depth: usize, query: &[String]) {
        self.depth = self.depth.max(depth);
        if !query.is_empty() {
            self.queries.push(QueryDemand {
                values: query.to_vec(),
                required: depth.max(1),
            });
        }
    }

    /// `true` when the schedule is long enough and every query has its
    /// required number of matching entries.
    pub fn satisfied_by(&self, schedule: &[ScheduleEntry], items: &[Item]) -> bool {
        schedule.len() >= self.depth
            && self
                .queries
                .iter()
                .all(|q| q.matches(schedule, items) >= q.required)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
