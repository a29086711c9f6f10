/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Daily trigger sets, generic over the calendar.
//!
//! A [`TriggerSet`] is a sorted list of times-after-midnight in one
//! calendar.  Everything the engine needs from a daily rule reduces to three
//! questions, each answered here:
//!
//! 1. how many occurrences fell in `(from, to]`  → [`TriggerSet::count_between`]
//! 2. when is the next occurrence after X        → [`TriggerSet::next_after`]
//! 3. when was the latest occurrence at/before X → [`TriggerSet::latest_at_or_before`]
//!
//! Erinn answers are pure modular arithmetic.  Real answers go through the
//! server wall clock: counting and instant resolution share one per-date
//! mapping with the gap/fold policy of
//! [`resolve_server_local`](crate::clock::resolve_server_local), so every
//! listed time lands on exactly one instant per day (a spring-forward time
//! shifts an hour, a fall-back time takes its first pass) and the occurrence
//! count keeps agreeing with the occurrence instants — in particular it
//! never regresses while the wall clock rewinds through a fold.
//!
//! Duplicate times are legitimate (a double rotation): occurrences carry a
//! multiplicity, and coincident occurrences from *different* times (possible
//! when a gap shift lands one time onto another) merge into one occurrence
//! with their counts summed.

use chrono::{Days, NaiveDate};
use tracing::warn;

use super::error::TimerError;
use crate::clock::{
    erinn_day_index, erinn_ms_after_midnight, naive_time_from_ms, resolve_server_local,
    server_date, server_days_between, Calendar, ERINN_DAY_MS,
};

/// Dates examined around an instant when resolving Real occurrences.  DST
/// shifts stay within a day; anything past this window is an engine bug.
const SEARCH_WINDOW_DAYS: u64 = 3;

// ── Occurrence ────────────────────────────────────────────────────────────────

/// One trigger occurrence: the absolute instant and how many listed times
/// land on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub instant_ms: i64,
    pub count: usize,
}

// ── TriggerSet ────────────────────────────────────────────────────────────────

/// Sorted daily trigger times for one calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSet {
    calendar: Calendar,
    /// Positions after midnight in real-equivalent ms, ascending, duplicates
    /// preserved.
    times: Vec<i64>,
}

impl TriggerSet {
    /// Build a set from validated times-of-day; sorts, keeps duplicates.
    pub fn new(calendar: Calendar, mut times: Vec<i64>) -> TriggerSet {
        times.sort_unstable();
        debug_assert!(times.iter().all(|&t| (0..calendar.day_ms()).contains(&t)));
        TriggerSet { calendar, times }
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn times(&self) -> &[i64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    // ── counting ──────────────────────────────────────────────────────────────

    /// Signed occurrence count in `(from, to]` (negative when `to < from`,
    /// counting the reversed interval).
    pub fn count_between(&self, from_ms: i64, to_ms: i64) -> i64 {
        if self.times.is_empty() {
            return 0;
        }
        if to_ms < from_ms {
            -self.count_forward(to_ms, from_ms)
        } else {
            self.count_forward(from_ms, to_ms)
        }
    }

    /// Occurrences in `(from, to]` with `from <= to`, decomposed as
    /// same-day / two partial days / partial + whole days + partial.
    fn count_forward(&self, from_ms: i64, to_ms: i64) -> i64 {
        match self.calendar {
            Calendar::Erinn => self.erinn_count_forward(from_ms, to_ms),
            Calendar::Real => self.real_count_forward(from_ms, to_ms),
        }
    }

    /// Erinn occurrences are pure day-position arithmetic.
    fn erinn_count_forward(&self, from_ms: i64, to_ms: i64) -> i64 {
        let per_day = self.times.len() as i64;
        let from_pos = erinn_ms_after_midnight(from_ms);
        let to_pos = erinn_ms_after_midnight(to_ms);
        let days_apart = erinn_day_index(to_ms) - erinn_day_index(from_ms);

        if days_apart == 0 {
            self.at_or_before(to_pos) - self.at_or_before(from_pos)
        } else {
            let rest_of_from_day = per_day - self.at_or_before(from_pos);
            let start_of_to_day = self.at_or_before(to_pos);
            rest_of_from_day + start_of_to_day + (days_apart - 1) * per_day
        }
    }

    /// Real occurrences are counted by resolved instants, the same mapping
    /// [`real_scan`](Self::real_scan) uses.  A wall-clock position comparison
    /// would rewind inside a DST fall-back fold and un-count a trigger the
    /// clock already passed; instants only move forward.  The boundary dates
    /// resolve each listed time and compare instants; whole days between
    /// contribute every listed time once.
    fn real_count_forward(&self, from_ms: i64, to_ms: i64) -> i64 {
        let per_day = self.times.len() as i64;
        let days_apart = server_days_between(from_ms, to_ms);

        if days_apart == 0 {
            self.real_day_count(server_date(from_ms), from_ms, to_ms)
        } else {
            self.real_day_count(server_date(from_ms), from_ms, to_ms)
                + self.real_day_count(server_date(to_ms), from_ms, to_ms)
                + (days_apart - 1) * per_day
        }
    }

    /// Occurrences resolving onto one server date with instants in
    /// `(from, to]`.
    fn real_day_count(&self, date: NaiveDate, from_ms: i64, to_ms: i64) -> i64 {
        let mut count = 0;
        for (t, mult) in self.unique_times() {
            let Some(time) = naive_time_from_ms(t) else {
                continue;
            };
            let Some(inst) = resolve_server_local(date.and_time(time)) else {
                continue;
            };
            if inst > from_ms && inst <= to_ms {
                count += mult as i64;
            }
        }
        count
    }

    // ── occurrence resolution ─────────────────────────────────────────────────

    /// Earliest occurrence strictly after an instant.
    ///
    /// # Errors
    /// [`TimerError::TriggerResolution`] when the set is empty or (Real
    /// only) no date in the search window yields an occurrence.
    pub fn next_after(&self, instant_ms: i64) -> Result<Occurrence, TimerError> {
        if self.times.is_empty() {
            return Err(TimerError::TriggerResolution { instant_ms });
        }
        match self.calendar {
            Calendar::Erinn => Ok(self.erinn_next_after(instant_ms)),
            Calendar::Real => self.real_scan(instant_ms, Direction::Forward),
        }
    }

    /// Latest occurrence at or before an instant.
    ///
    /// # Errors
    /// Same conditions as [`TriggerSet::next_after`].
    pub fn latest_at_or_before(&self, instant_ms: i64) -> Result<Occurrence, TimerError> {
        if self.times.is_empty() {
            return Err(TimerError::TriggerResolution { instant_ms });
        }
        match self.calendar {
            Calendar::Erinn => Ok(self.erinn_latest_at_or_before(instant_ms)),
            Calendar::Real => self.real_scan(instant_ms, Direction::Backward),
        }
    }

    fn erinn_next_after(&self, instant_ms: i64) -> Occurrence {
        let pos = erinn_ms_after_midnight(instant_ms);
        let day_start = instant_ms - pos;
        let idx = self.times.partition_point(|&t| t <= pos);
        let (day_start, t) = if idx < self.times.len() {
            (day_start, self.times[idx])
        } else {
            (day_start + ERINN_DAY_MS, self.times[0])
        };
        Occurrence {
            instant_ms: day_start + t,
            count: self.multiplicity_of(t),
        }
    }

    fn erinn_latest_at_or_before(&self, instant_ms: i64) -> Occurrence {
        let pos = erinn_ms_after_midnight(instant_ms);
        let day_start = instant_ms - pos;
        let idx = self.times.partition_point(|&t| t <= pos);
        let (day_start, t) = if idx > 0 {
            (day_start, self.times[idx - 1])
        } else {
            (day_start - ERINN_DAY_MS, self.times[self.times.len() - 1])
        };
        Occurrence {
            instant_ms: day_start + t,
            count: self.multiplicity_of(t),
        }
    }

    /// Resolve Real occurrences by mapping each distinct time onto candidate
    /// dates and taking the nearest instant past (or at/before) the pivot.
    /// Scanning every time per date keeps the result correct when a DST gap
    /// shift reorders instants against their wall-clock positions.
    fn real_scan(&self, instant_ms: i64, dir: Direction) -> Result<Occurrence, TimerError> {
        let start = server_date(instant_ms);
        for day_offset in 0..=SEARCH_WINDOW_DAYS {
            let date = match dir {
                Direction::Forward => start.checked_add_days(Days::new(day_offset)),
                Direction::Backward => start.checked_sub_days(Days::new(day_offset)),
            };
            let Some(date) = date else { break };

            let mut best: Option<Occurrence> = None;
            for (t, mult) in self.unique_times() {
                let naive = match naive_time_from_ms(t) {
                    Some(time) => date.and_time(time),
                    None => continue,
                };
                let Some(inst) = resolve_server_local(naive) else {
                    continue;
                };
                let eligible = match dir {
                    Direction::Forward => inst > instant_ms,
                    Direction::Backward => inst <= instant_ms,
                };
                if !eligible {
                    continue;
                }
                best = Some(match best {
                    None => Occurrence {
                        instant_ms: inst,
                        count: mult,
                    },
                    Some(b) if dir.prefers(inst, b.instant_ms) => Occurrence {
                        instant_ms: inst,
                        count: mult,
                    },
                    Some(b) if inst == b.instant_ms => Occurrence {
                        instant_ms: inst,
                        count: b.count + mult,
                    },
                    Some(b) => b,
                });
            }
            if let Some(found) = best {
                return Ok(found);
            }
        }
        warn!(
            instant_ms,
            calendar = %self.calendar,
            "no trigger occurrence within the date search window"
        );
        Err(TimerError::TriggerResolution { instant_ms })
    }

    // ── position helpers ──────────────────────────────────────────────────────

    fn at_or_before(&self, pos: i64) -> i64 {
        self.times.partition_point(|&t| t <= pos) as i64
    }

    fn multiplicity_of(&self, t: i64) -> usize {
        self.times.partition_point(|&x| x <= t) - self.times.partition_point(|&x| x < t)
    }

    /// Distinct times with their multiplicities (the list is sorted).
    fn unique_times(&self) -> impl Iterator<Item = (i64, usize)> + '_ {
        let mut i = 0;
        std::iter::from_fn(move || {
            if i >= self.times.len() {
                return None;
            }
            let t = self.times[i];
            let mut n = 1;
            while i + n < self.times.len() && self.times[i + n] == t {
                n += 1;
            }
            i += n;
            Some((t, n))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// `true` when `candidate` is nearer the pivot than `best` in this
    /// direction.
    fn prefers(self, candidate: i64, best: i64) -> bool {
        match self {
            Direction::Forward => candidate < best,
            Direction::Backward => candidate > best,
        }
    }
}

// ── Cross-calendar combinators ────────────────────────────────────────────────

/// Earliest next occurrence across several sets; coincident instants sum
/// their counts.  Empty sets are skipped; pass Erinn before Real so the
/// merged tally is built in that order.
///
/// # Errors
/// [`TimerError::TriggerResolution`] when no set yields an occurrence.
pub fn next_across(sets: &[&TriggerSet], instant_ms: i64) -> Result<Occurrence, TimerError> {
    merge_across(sets, instant_ms, Direction::Forward)
}

/// Latest occurrence at or before an instant across several sets.
///
/// # Errors
/// Same conditions as [`next_across`].
pub fn latest_across(sets: &[&TriggerSet], instant_ms: i64) -> Result<Occurrence, TimerError> {
    merge_across(sets, instant_ms, Direction::Backward)
}

fn merge_across(
    sets: &[&TriggerSet],
    instant_ms: i64,
    dir: Direction,
) -> Result<Occurrence, TimerError> {
    let mut best: Option<Occurrence> = None;
    for set in sets {
        if set.is_empty() {
            continue;
        }
        let occ = match dir {
            Direction::Forward => set.next_after(instant_ms)?,
            Direction::Backward => set.latest_at_or_before(instant_ms)?,
        };
        best = Some(match best {
            None => occ,
            Some(b) if dir.prefers(occ.instant_ms, b.instant_ms) => occ,
            Some(b) if occ.instant_ms == b.instant_ms => Occurrence {
                instant_ms: b.instant_ms,
                count: b.count + occ.count,
            },
            Some(b) => b,
        });
    }
    best.ok_or(TimerError::TriggerResolution { instant_ms })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{real_ms_after_midnight, ERINN_HOUR_MS, ERINN_OFFSET_MS};
    use chrono::{NaiveDateTime, NaiveTime};

    fn real_instant(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        let naive = NaiveDateTime::new(
            NaiveDate::from_ymd_opt(y, mo, d).unwrap(),
            NaiveTime::from_hms_opt(h, mi, s).unwrap(),
        );
        resolve_server_local(naive).unwrap()
    }

    fn sunshift() -> TriggerSet {
        TriggerSet::new(Calendar::Erinn, vec![6 * ERINN_HOUR_MS, 18 * ERINN_HOUR_MS])
    }

    // ── Erinn counting ────────────────────────────────────────────────────────

    #[test]
    fn erinn_same_day_count() {
        // unix epoch sits at 08:00 Erinn, between the two sunshift triggers
        let set = sunshift();
        assert_eq!(set.count_between(0, 1_000_000), 1, "18:00E passed");
        assert_eq!(set.count_between(0, 100_000), 0);
    }

    #[test]
    fn erinn_count_accumulates_whole_days() {
        let set = sunshift();
        let from = 0;
        for days in 1..4i64 {
            let to = from + days * ERINN_DAY_MS;
            // same position a day later: one full day of triggers per day
            assert_eq!(set.count_between(from, to), 2 * days);
        }
    }

    #[test]
    fn erinn_count_is_signed() {
        let set = sunshift();
        assert_eq!(set.count_between(1_000_000, 0), -1);
    }

    #[test]
    fn erinn_trigger_exactly_at_from_does_not_count() {
        // 18:00E occurs at instant 900_000 (see erinn_latest test below)
        let set = sunshift();
        assert_eq!(set.count_between(900_000, 900_000), 0);
        assert_eq!(set.count_between(899_999, 900_000), 1, "inclusive at to");
    }

    // ── Erinn occurrence resolution ───────────────────────────────────────────

    #[test]
    fn erinn_next_and_latest_around_a_known_instant() {
        let set = sunshift();
        let latest = set.latest_at_or_before(1_000_000).unwrap();
        assert_eq!(latest.instant_ms, 900_000); // 18:00E
        assert_eq!(erinn_ms_after_midnight(latest.instant_ms), 18 * ERINN_HOUR_MS);

        let next = set.next_after(1_000_000).unwrap();
        assert_eq!(next.instant_ms, 1_980_000); // 06:00E next Erinn day
        assert_eq!(erinn_ms_after_midnight(next.instant_ms), 6 * ERINN_HOUR_MS);
    }

    #[test]
    fn erinn_next_is_strictly_after() {
        let set = sunshift();
        let at_trigger = 900_000;
        let next = set.next_after(at_trigger).unwrap();
        assert!(next.instant_ms > at_trigger);
        assert_eq!(set.latest_at_or_before(at_trigger).unwrap().instant_ms, at_trigger);
    }

    #[test]
    fn duplicated_time_reports_multiplicity_two() {
        let set = TriggerSet::new(
            Calendar::Erinn,
            vec![6 * ERINN_HOUR_MS, 6 * ERINN_HOUR_MS],
        );
        let next = set.next_after(-ERINN_OFFSET_MS).unwrap();
        assert_eq!(next.count, 2);
        assert_eq!(set.count_between(-ERINN_OFFSET_MS, next.instant_ms), 2);
    }

    #[test]
    fn empty_set_resolution_is_an_error() {
        let set = TriggerSet::new(Calendar::Erinn, vec![]);
        assert!(matches!(
            set.next_after(0),
            Err(TimerError::TriggerResolution { .. })
        ));
        assert_eq!(set.count_between(0, ERINN_DAY_MS), 0);
    }

    // ── Real counting, plain days ─────────────────────────────────────────────

    #[test]
    fn real_same_day_count() {
        let set = TriggerSet::new(Calendar::Real, vec![21_600_000, 64_800_000]); // 06:00, 18:00
        let midnight = real_instant(2024, 1, 2, 0, 0, 0);
        let seven = real_instant(2024, 1, 2, 7, 0, 0);
        assert_eq!(set.count_between(midnight, seven), 1);
    }

    #[test]
    fn real_count_across_whole_days() {
        let set = TriggerSet::new(Calendar::Real, vec![21_600_000, 64_800_000]);
        let from = real_instant(2024, 1, 1, 0, 0, 0);
        let to = real_instant(2024, 1, 3, 7, 0, 0);
        // rest of Jan 1 (2) + whole Jan 2 (2) + Jan 3 until 07:00 (1)
        assert_eq!(set.count_between(from, to), 5);
    }

    #[test]
    fn real_next_and_latest_on_plain_days() {
        let set = TriggerSet::new(Calendar::Real, vec![21_600_000, 64_800_000]);
        let seven = real_instant(2024, 1, 2, 7, 0, 0);
        assert_eq!(
            set.latest_at_or_before(seven).unwrap().instant_ms,
            real_instant(2024, 1, 2, 6, 0, 0)
        );
        assert_eq!(
            set.next_after(seven).unwrap().instant_ms,
            real_instant(2024, 1, 2, 18, 0, 0)
        );
    }

    #[test]
    fn real_next_wraps_to_the_next_day() {
        let set = TriggerSet::new(Calendar::Real, vec![21_600_000]);
        let evening = real_instant(2024, 1, 2, 20, 0, 0);
        assert_eq!(
            set.next_after(evening).unwrap().instant_ms,
            real_instant(2024, 1, 3, 6, 0, 0)
        );
    }

    // ── Real counting, DST transition days ────────────────────────────────────

    #[test]
    fn spring_forward_day_counts_every_listed_time_once() {
        // 01:00 exists, 02:30 is skipped by the clock jump; its gap-shifted
        // instant (03:30) still counts once for the day.
        let set = TriggerSet::new(Calendar::Real, vec![3_600_000, 9_000_000]);
        let from = real_instant(2024, 3, 9, 0, 0, 0);
        let to = real_instant(2024, 3, 10, 4, 0, 0);
        assert_eq!(set.count_between(from, to), 4);
    }

    #[test]
    fn fall_back_fold_never_uncounts_a_trigger() {
        // trigger 01:30 on 2024-11-03: at 02:00 PDT the clock rewinds to
        // 01:00 PST and passes 01:30 a second time.  Counting by resolved
        // instants (first pass) keeps the tally monotonic through the fold.
        let set = TriggerSet::new(Calendar::Real, vec![5_400_000]);
        let epoch = real_instant(2024, 11, 2, 0, 0, 0);
        let midnight = real_instant(2024, 11, 3, 0, 0, 0);

        let mut last = i64::MIN;
        for minutes in [60, 95, 105, 125, 135, 150, 200] {
            let now = midnight + minutes * 60_000;
            let count = set.count_between(epoch, now);
            assert!(
                count >= last,
                "count regressed at midnight+{minutes}min: {last} -> {count}"
            );
            last = count;
        }

        // Nov 2 occurrence plus the first 01:30 pass on Nov 3; the repeated
        // wall-clock 01:30 (midnight + 150min, PST) adds nothing.
        assert_eq!(set.count_between(epoch, midnight + 105 * 60_000), 2);
        assert_eq!(set.count_between(epoch, midnight + 135 * 60_000), 2);
        assert_eq!(set.count_between(epoch, midnight + 200 * 60_000), 2);
    }

    #[test]
    fn gap_time_occurrence_shifts_forward_one_hour() {
        // 02:30 on 2024-03-10 resolves to 03:30 PDT
        let set = TriggerSet::new(Calendar::Real, vec![9_000_000]);
        let midnight = real_instant(2024, 3, 10, 0, 0, 0);
        let occ = set.next_after(midnight).unwrap();
        assert_eq!(occ.instant_ms - midnight, 2 * 3_600_000 + 30 * 60_000);
        assert_eq!(real_ms_after_midnight(occ.instant_ms), 12_600_000); // 03:30
    }

    #[test]
    fn gap_shift_merging_two_times_sums_their_counts() {
        // 02:30 shifts onto 03:30: one occurrence, count 2
        let set = TriggerSet::new(Calendar::Real, vec![9_000_000, 12_600_000]);
        let midnight = real_instant(2024, 3, 10, 0, 0, 0);
        let occ = set.next_after(midnight).unwrap();
        assert_eq!(occ.count, 2);
        assert_eq!(real_ms_after_midnight(occ.instant_ms), 12_600_000);
    }

    #[test]
    fn fold_time_occurrence_resolves_to_earliest_pass() {
        // 01:30 happens twice on 2024-11-03; the occurrence is the first pass
        let set = TriggerSet::new(Calendar::Real, vec![5_400_000]);
        let midnight = real_instant(2024, 11, 3, 0, 0, 0);
        let six = real_instant(2024, 11, 3, 6, 0, 0);
        let occ = set.latest_at_or_before(six).unwrap();
        assert_eq!(occ.instant_ms - midnight, 90 * 60_000);
    }

    // ── cross-calendar merging ────────────────────────────────────────────────

    #[test]
    fn next_across_picks_the_earlier_calendar() {
        let erinn = sunshift();
        let real = TriggerSet::new(Calendar::Real, vec![21_600_000, 64_800_000]);
        let now = real_instant(2024, 1, 2, 7, 0, 0);
        // Erinn triggers every 18 real minutes at most; always sooner than 18:00
        let merged = next_across(&[&erinn, &real], now).unwrap();
        let erinn_next = erinn.next_after(now).unwrap();
        assert_eq!(merged, erinn_next);
        assert!(merged.instant_ms < real.next_after(now).unwrap().instant_ms);
    }

    #[test]
    fn coincident_cross_calendar_occurrences_sum_counts() {
        let x = real_instant(2024, 1, 15, 13, 45, 30);
        let erinn = TriggerSet::new(Calendar::Erinn, vec![erinn_ms_after_midnight(x)]);
        let real = TriggerSet::new(Calendar::Real, vec![real_ms_after_midnight(x)]);
        let merged = next_across(&[&erinn, &real], x - 1).unwrap();
        assert_eq!(merged.instant_ms, x);
        assert_eq!(merged.count, 2);
    }

    #[test]
    fn across_skips_empty_sets() {
        let erinn = TriggerSet::new(Calendar::Erinn, vec![]);
        let real = TriggerSet::new(Calendar::Real, vec![21_600_000]);
        let now = real_instant(2024, 1, 2, 7, 0, 0);
        assert!(next_across(&[&erinn, &real], now).is_ok());
        assert!(matches!(
            next_across(&[&erinn], now),
            Err(TimerError::TriggerResolution { .. })
        ));
    }
}
