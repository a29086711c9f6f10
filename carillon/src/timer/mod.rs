//! Rotation schedule computation.
//!
//! [`RotateTimer`] turns a validated [`RotationPlan`] into a live
//! [`Schedule`] for its attached displays: which item is active right now,
//! when it activated, and which items follow at which instants.
//!
//! # Recomputation model
//!
//! | Concern | Approach |
//! |---|---|
//! | Counter | `i64`, derived from `epoch` + absolute time on every wake, never ticked |
//! | Pre-epoch instants | negative counter; `rem_euclid` keeps the item index valid |
//! | Schedule depth | demanded by displays ([`Demand`]), floor of 2, hard cap of [`MAX_SCHEDULE_ENTRIES`] |
//! | Rebuild trigger | counter changed, demand changed, or demand unsatisfied |
//! | Notification | full schedule to every display on every recomputation |
//! | Failure | [`TimerError`] logged, previous schedule kept; [`DisplayError`] logged, no-op |
//!
//! Deriving the counter from absolute time makes [`RotateTimer::recompute`]
//! re-entrant and idempotent: a missed or duplicated wake can never drift
//! the rotation, and a second call at the same instant delivers an
//! identical schedule.
//!
//! The engine is synchronous and takes `now` explicitly; the tokio driver
//! in [`runner`] owns the wake loop.

pub mod demand;
pub mod error;
pub mod runner;
pub mod triggers;

pub use error::{DisplayError, TimerError};

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::clock::REAL_DAY_MS;
use crate::item::{Schedule, ScheduleEntry};
use crate::rule::{RotationPlan, RotationRule};

use demand::Demand;
use triggers::{latest_across, next_across};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Hard cap on schedule length per rebuild.  Hitting it means a query (or a
/// pathological depth) could not be satisfied; generation stops with a
/// [`TimerError::ScheduleOverflow`] in the logs.
pub const MAX_SCHEDULE_ENTRIES: usize = 512;

/// Smallest wait ever reported to the driver.
const MIN_WAIT_MS: i64 = 1;

// ── Display contract ──────────────────────────────────────────────────────────

/// Handle identifying one attached display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayId(pub u64);

impl std::fmt::Display for DisplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "display #{}", self.0)
    }
}

/// A schedule subscriber.
///
/// Displays state what they need (`depth`, `query`) and receive the full
/// schedule on every recomputation.  They hold no engine state and cannot
/// reach back into the timer.
pub trait TimerDisplay {
    /// Number of schedule entries this display renders (≥ 1; the engine
    /// never computes fewer than 2).
    fn depth(&self) -> usize;

    /// Item values this display filters on; empty means no filter.  A
    /// non-empty query extends generation until `depth` matching entries
    /// exist.
    fn query(&self) -> &[String];

    /// Called with the freshly computed schedule.
    fn receive_schedule(&mut self, schedule: &[ScheduleEntry]);
}

// ── RotateTimer ───────────────────────────────────────────────────────────────

/// The rotation engine for one timer definition.
///
/// Owns the validated plan, the derived counter and schedule, and the
/// display registry.  Mutated only by [`RotateTimer::recompute`] and
/// attach/detach; with no displays attached the engine is dormant and
/// reports no wait.
pub struct RotateTimer {
    plan: RotationPlan,

    /// Counter value at the last recomputation.  Index into the item list
    /// is always `rotation rem_euclid len`.
    rotation: i64,
    schedule: Schedule,

    /// Attached displays; `BTreeMap` so notification order is attach order
    /// (ids are allocated ascending).
    displays: BTreeMap<DisplayId, Box<dyn TimerDisplay + Send>>,
    demand: Demand,

    /// `(rotation, demand)` the current schedule was built for; rebuilds
    /// are skipped while it matches and the demand stays satisfied.
    built_for: Option<(i64, Demand)>,

    next_id: u64,
}

impl RotateTimer {
    /// Wrap a plan produced by rule validation.  No schedule exists until
    /// the first display attaches.
    pub fn new(plan: RotationPlan) -> RotateTimer {
        RotateTimer {
            plan,
            rotation: 0,
            schedule: Vec::new(),
            displays: BTreeMap::new(),
            demand: Demand::new(),
            built_for: None,
            next_id: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn plan(&self) -> &RotationPlan {
        &self.plan
    }

    /// Counter at the last recomputation.
    pub fn rotation(&self) -> i64 {
        self.rotation
    }

    /// Schedule computed by the last rebuild.
    pub fn schedule(&self) -> &[ScheduleEntry] {
        &self.schedule
    }

    pub fn display_count(&self) -> usize {
        self.displays.len()
    }

    /// `true` when no display is attached; a dormant timer reports no wait
    /// and computes nothing.
    pub fn is_dormant(&self) -> bool {
        self.displays.is_empty()
    }

    // ── Recomputation ─────────────────────────────────────────────────────────

    /// Recompute the rotation at `now_ms`, rebuild the schedule if needed,
    /// and notify every display.  Returns the wait until the next rotation
    /// boundary, or `None` when dormant.
    pub fn recompute(&mut self, now_ms: i64) -> Option<i64> {
        if self.displays.is_empty() {
            return None;
        }

        let rotation = self.current_rotation(now_ms);
        self.rotation = rotation;

        let key = (rotation, self.demand.clone());
        let satisfied = self.demand.satisfied_by(&self.schedule, &self.plan.items);
        if self.built_for.as_ref() != Some(&key) || !satisfied {
            match self.build_schedule(now_ms, rotation) {
                Ok(schedule) => {
                    debug!(
                        rotation,
                        entries = schedule.len(),
                        "schedule rebuilt"
                    );
                    self.schedule = schedule;
                    self.built_for = Some(key);
                }
                Err(err) => {
                    warn!(%err, rotation, "schedule rebuild failed, keeping the previous schedule");
                }
            }
        }

        self.notify();
        self.next_wait(now_ms)
    }

    /// Wait until the next rotation boundary after `now_ms`, floored at
    /// 1 ms; `None` when dormant.  At an exact interval boundary the wait
    /// is one full interval.
    pub fn next_wait(&self, now_ms: i64) -> Option<i64> {
        if self.displays.is_empty() {
            return None;
        }
        let wait = match &self.plan.rule {
            RotationRule::Interval { interval_ms } => {
                interval_ms - (now_ms - self.plan.epoch_ms).rem_euclid(*interval_ms)
            }
            RotationRule::DailyTriggers { erinn, real } => {
                match next_across(&[erinn, real], now_ms) {
                    Ok(occ) => occ.instant_ms - now_ms,
                    Err(err) => {
                        warn!(%err, "cannot resolve the next trigger, retrying in one day");
                        REAL_DAY_MS
                    }
                }
            }
        };
        Some(wait.max(MIN_WAIT_MS))
    }

    /// Counter derived from the epoch and `now_ms`.
    fn current_rotation(&self, now_ms: i64) -> i64 {
        match &self.plan.rule {
            RotationRule::Interval { interval_ms } => {
                (now_ms - self.plan.epoch_ms).div_euclid(*interval_ms)
            }
            RotationRule::DailyTriggers { erinn, real } => {
                erinn.count_between(self.plan.epoch_ms, now_ms)
                    + real.count_between(self.plan.epoch_ms, now_ms)
            }
        }
    }

    fn item_index(&self, rotation: i64) -> usize {
        rotation.rem_euclid(self.plan.items.len() as i64) as usize
    }

    // ── Schedule building ─────────────────────────────────────────────────────

    /// Build a fresh schedule for `rotation` at `now_ms`: the active entry
    /// first, then boundaries forward until the demand is satisfied or a
    /// stop condition fires.
    fn build_schedule(&self, now_ms: i64, rotation: i64) -> Result<Schedule, TimerError> {
        let items = &self.plan.items;
        let len = items.len() as i64;

        let active_activation = match &self.plan.rule {
            RotationRule::Interval { interval_ms } => self
                .plan
                .epoch_ms
                .saturating_add(rotation.saturating_mul(*interval_ms)),
            RotationRule::DailyTriggers { erinn, real } => {
                latest_across(&[erinn, real], now_ms)?.instant_ms
            }
        };
        let entry_activation = if self.plan.compress {
            self.run_start(rotation, active_activation)?
        } else {
            active_activation
        };

        let mut schedule: Schedule = vec![ScheduleEntry {
            item_index: self.item_index(rotation),
            activation_ms: entry_activation,
        }];
        let mut kept_value = &items[self.item_index(rotation)].value;
        let mut cursor_r = rotation;
        let mut cursor_activation = active_activation;
        let mut skipped_in_a_row = 0i64;

        loop {
            if self.demand.satisfied_by(&schedule, items) {
                break;
            }
            if schedule.len() >= MAX_SCHEDULE_ENTRIES {
                let err = TimerError::ScheduleOverflow {
                    len: schedule.len(),
                    cap: MAX_SCHEDULE_ENTRIES,
                };
                warn!(%err, "schedule generation stopped");
                break;
            }
            let Some((next_r, next_activation)) =
                self.next_boundary(cursor_r, cursor_activation)?
            else {
                warn!(
                    entries = schedule.len(),
                    "next activation not representable, schedule truncated"
                );
                break;
            };
            cursor_r = next_r;
            cursor_activation = next_activation;

            let value = &items[self.item_index(next_r)].value;
            if self.plan.compress && value == kept_value {
                skipped_in_a_row += 1;
                if skipped_in_a_row >= len {
                    warn!(
                        entries = schedule.len(),
                        "rotation produces no further value change, schedule truncated"
                    );
                    break;
                }
                continue;
            }
            skipped_in_a_row = 0;
            schedule.push(ScheduleEntry {
                item_index: self.item_index(next_r),
                activation_ms: next_activation,
            });
            kept_value = value;
        }

        Ok(schedule)
    }

    /// The boundary after `(rotation, activation_ms)`: new counter value and
    /// activation instant.  Coincident daily triggers advance the counter by
    /// their summed multiplicity in one step.  `None` when the next instant
    /// leaves `i64` range.
    fn next_boundary(
        &self,
        rotation: i64,
        activation_ms: i64,
    ) -> Result<Option<(i64, i64)>, TimerError> {
        match &self.plan.rule {
            RotationRule::Interval { interval_ms } => Ok(activation_ms
                .checked_add(*interval_ms)
                .map(|activation| (rotation + 1, activation))),
            RotationRule::DailyTriggers { erinn, real } => {
                let occ = next_across(&[erinn, real], activation_ms)?;
                Ok(Some((rotation + occ.count as i64, occ.instant_ms)))
            }
        }
    }

    /// Activation instant of the start of the current run of equal item
    /// values, for compressed schedules: walk boundaries backwards while the
    /// value before each boundary equals the active value, at most
    /// `len - 1` steps.  Derived on every rebuild, so the instant is stable
    /// for as long as the run lasts.
    fn run_start(&self, rotation: i64, active_activation: i64) -> Result<i64, TimerError> {
        let items = &self.plan.items;
        let len = items.len() as i64;
        let active_value = &items[self.item_index(rotation)].value;

        let mut r = rotation;
        let mut activation = active_activation;
        for _ in 0..len.saturating_sub(1) {
            match &self.plan.rule {
                RotationRule::Interval { interval_ms } => {
                    if items[self.item_index(r - 1)].value != *active_value {
                        break;
                    }
                    r -= 1;
                    activation = self
                        .plan
                        .epoch_ms
                        .saturating_add(r.saturating_mul(*interval_ms));
                }
                RotationRule::DailyTriggers { erinn, real } => {
                    let sets = [erinn, real];
                    let here = latest_across(&sets, activation)?;
                    let before = r - here.count as i64;
                    if items[self.item_index(before)].value != *active_value {
                        break;
                    }
                    let prev = latest_across(&sets, activation - 1)?;
                    r = before;
                    activation = prev.instant_ms;
                }
            }
        }
        Ok(activation)
    }

    // ── Display registry ──────────────────────────────────────────────────────

    /// Attach a display, allocating its id from the engine's counter.
    ///
    /// A first, deeper, or querying display forces a full recomputation
    /// (which notifies everyone); otherwise the newcomer just receives the
    /// existing schedule.
    ///
    /// # Errors
    /// [`DisplayError::InvalidDepth`] for depth 0;
    /// [`DisplayError::UnsatisfiableQuery`] when a query value does not
    /// occur in the item list.  The display is not attached on error.
    pub fn attach(
        &mut self,
        display: Box<dyn TimerDisplay + Send>,
        now_ms: i64,
    ) -> Result<DisplayId, DisplayError> {
        let id = DisplayId(self.next_id);
        self.attach_with_id(id, display, now_ms)?;
        Ok(id)
    }

    /// [`RotateTimer::attach`] with a caller-allocated id (the runner hands
    /// out ids before the command reaches the engine).
    pub(crate) fn attach_with_id(
        &mut self,
        id: DisplayId,
        display: Box<dyn TimerDisplay + Send>,
        now_ms: i64,
    ) -> Result<(), DisplayError> {
        let depth = display.depth();
        if depth == 0 {
            let err = DisplayError::InvalidDepth { depth };
            warn!(%id, %err, "display rejected");
            return Err(err);
        }
        for value in display.query() {
            if !self.plan.items.iter().any(|item| item.value == *value) {
                let err = DisplayError::UnsatisfiableQuery {
                    value: value.clone(),
                };
                warn!(%id, %err, "display rejected");
                return Err(err);
            }
        }

        let first = self.displays.is_empty();
        let prior_depth = self.demand.depth;
        let has_query = !display.query().is_empty();
        self.displays.insert(id, display);
        self.next_id = self.next_id.max(id.0 + 1);
        self.rescan_demand();
        info!(%id, depth, first, "display attached");

        if first || self.demand.depth > prior_depth || has_query {
            self.recompute(now_ms);
        } else if let Some(display) = self.displays.get_mut(&id) {
            // nothing new demanded: hand the newcomer the current schedule
            Self::deliver(id, display, &self.schedule);
        }
        Ok(())
    }

    /// Detach a display.  Aggregates are rescanned from the remainder; the
    /// last detach leaves the engine dormant with demand back at its floor.
    ///
    /// # Errors
    /// [`DisplayError::NotAttached`] for an unknown id.
    pub fn detach(&mut self, id: DisplayId) -> Result<(), DisplayError> {
        if self.displays.remove(&id).is_none() {
            let err = DisplayError::NotAttached { id };
            warn!(%err, "detach ignored");
            return Err(err);
        }
        self.rescan_demand();
        info!(%id, remaining = self.displays.len(), "display detached");
        if self.displays.is_empty() {
            debug!("last display detached, timer dormant");
        }
        Ok(())
    }

    /// Rebuild the aggregate demand by scanning the registry in id order.
    fn rescan_demand(&mut self) {
        let mut demand = Demand::new();
        for display in self.displays.values() {
            demand.observe(display.depth(), display.query());
        }
        self.demand = demand;
    }

    fn notify(&mut self) {
        for (id, display) in &mut self.displays {
            Self::deliver(*id, display, &self.schedule);
        }
        debug!(
            rotation = self.rotation,
            entries = self.schedule.len(),
            displays = self.displays.len(),
            "schedule delivered"
        );
    }

    /// Push the schedule to one display; a display asking for more entries
    /// than were built gets a logged warning and the schedule anyway.
    fn deliver(
        id: DisplayId,
        display: &mut Box<dyn TimerDisplay + Send>,
        schedule: &[ScheduleEntry],
    ) {
        let depth = display.depth();
        if depth > schedule.len() {
            let err = DisplayError::ScheduleShorterThanDepth {
                depth,
                len: schedule.len(),
            };
            warn!(%id, %err, "delivering a short schedule");
        }
        display.receive_schedule(schedule);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
