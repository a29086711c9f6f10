/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The time-string grammar shared by every timer setting.
//!
//! Three families, distinguished by shape and by a trailing calendar suffix
//! (`S` = server wall clock, `E` = Erinn; both case-insensitive):
//!
//! ```text
//! time of day   6:00E            h:mmE              hour 0–23, minute 0–59
//!               6:00S            h:mmS
//!               6:00:30S         h:mm:ssS           second 0–59
//!               6:00:30.250S     h:mm:ss.sssS       ms 0–999, 1–3 digits
//! duration      0:90S  100:00E   same shapes        digit counts unbounded,
//!                                                   values not range-checked
//! date-time     2024-1-1T0:00:00S                   yyyy-mm-ddThh[:mm[:ss[.sss]]]S
//!                                                   minute/second optional,
//!                                                   T and S case-insensitive
//! ```
//!
//! Numeric fields convert by integer value, so a millisecond field of `.5`
//! means 5 ms, not 500.  Missing trailing fields of a duration are zero.
//! Date-times are calendar-validated (month lengths, Gregorian leap rule)
//! and then resolved on the server wall clock via
//! [`resolve_server_local`](super::resolve_server_local).

use thiserror::Error;

use super::{
    resolve_server_local, Calendar, ERINN_MINUTE_MS, REAL_DAY_MS,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

// ── Parsed value types ────────────────────────────────────────────────────────

/// A validated time of day in one calendar.
///
/// `ms` is the position after that calendar's midnight in real-equivalent
/// milliseconds: `0..ERINN_DAY_MS` for Erinn, `0..REAL_DAY_MS` for Real.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub calendar: Calendar,
    pub ms: i64,
}

/// A validated duration in one calendar, in real-equivalent milliseconds.
///
/// Durations are unbounded: `0:90S` is ninety minutes, `100:00E` is a bit
/// over four Erinn days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDuration {
    pub calendar: Calendar,
    pub ms: i64,
}

/// A validated server-zone date-time with its resolved absolute instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub milli: u32,
    /// Unix-epoch ms of the wall-clock value (DST-resolved).
    pub instant_ms: i64,
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A time string that failed to parse.  The offending input is carried
/// verbatim so the caller can log exactly what was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeStringError {
    #[error("time string '{input}' has no calendar suffix (expected trailing S or E)")]
    MissingSuffix { input: String },

    #[error("'{input}' is not a valid {calendar} time of day")]
    InvalidTimeOfDay { input: String, calendar: Calendar },

    #[error("'{input}' is not a valid {calendar} duration")]
    InvalidDuration { input: String, calendar: Calendar },

    #[error("'{input}' is not a valid server date-time")]
    InvalidDateTime { input: String },
}

// ── Public parsers ────────────────────────────────────────────────────────────

/// Parse a time-of-day string, selecting the calendar from the suffix.
///
/// # Errors
/// [`TimeStringError::MissingSuffix`] when neither suffix is present,
/// [`TimeStringError::InvalidTimeOfDay`] when the body does not fit the
/// suffixed calendar's shape or ranges.
pub fn parse_time_of_day(input: &str) -> Result<TimeOfDay, TimeStringError> {
    let trimmed = input.trim();
    let (body, calendar) =
        strip_calendar_suffix(trimmed).ok_or_else(|| TimeStringError::MissingSuffix {
            input: trimmed.to_string(),
        })?;
    let ms = match calendar {
        Calendar::Erinn => erinn_time_of_day_ms(body),
        Calendar::Real => real_time_of_day_ms(body),
    }
    .ok_or_else(|| TimeStringError::InvalidTimeOfDay {
        input: trimmed.to_string(),
        calendar,
    })?;
    Ok(TimeOfDay { calendar, ms })
}

/// Parse a duration string, selecting the calendar from the suffix.
///
/// Same shapes as a time of day but with unbounded, un-range-checked fields;
/// the only rejections are malformed shapes and `i64` overflow.
///
/// # Errors
/// [`TimeStringError::MissingSuffix`] / [`TimeStringError::InvalidDuration`].
pub fn parse_duration(input: &str) -> Result<CalendarDuration, TimeStringError> {
    let trimmed = input.trim();
    let (body, calendar) =
        strip_calendar_suffix(trimmed).ok_or_else(|| TimeStringError::MissingSuffix {
            input: trimmed.to_string(),
        })?;
    let ms = match calendar {
        Calendar::Erinn => erinn_duration_ms(body),
        Calendar::Real => real_duration_ms(body),
    }
    .ok_or_else(|| TimeStringError::InvalidDuration {
        input: trimmed.to_string(),
        calendar,
    })?;
    Ok(CalendarDuration { calendar, ms })
}

/// Parse a `yyyy-mm-ddThh[:mm[:ss[.sss]]]S` server date-time; missing
/// trailing fields are zero.
///
/// # Errors
/// [`TimeStringError::InvalidDateTime`] for anything that is not a
/// well-formed, calendar-valid wall-clock value.
pub fn parse_server_date_time(input: &str) -> Result<ServerDateTime, TimeStringError> {
    let trimmed = input.trim();
    date_time_inner(trimmed).ok_or_else(|| TimeStringError::InvalidDateTime {
        input: trimmed.to_string(),
    })
}

/// `true` when `input` is a valid time of day in exactly this calendar.
pub fn is_valid_time_of_day(input: &str, calendar: Calendar) -> bool {
    matches!(parse_time_of_day(input), Ok(t) if t.calendar == calendar)
}

/// `true` when `input` is a valid duration in exactly this calendar.
pub fn is_valid_duration(input: &str, calendar: Calendar) -> bool {
    matches!(parse_duration(input), Ok(d) if d.calendar == calendar)
}

// ── Calendar helpers ──────────────────────────────────────────────────────────

/// Gregorian leap-year rule: divisible by 4, except centuries, except every
/// fourth century.
pub(crate) fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Day count of a month (`0` for an invalid month number).
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

// ── Field-level parsing ───────────────────────────────────────────────────────

fn strip_calendar_suffix(input: &str) -> Option<(&str, Calendar)> {
    if let Some(body) = input.strip_suffix(|c: char| matches!(c, 's' | 'S')) {
        return Some((body, Calendar::Real));
    }
    input
        .strip_suffix(|c: char| matches!(c, 'e' | 'E'))
        .map(|body| (body, Calendar::Erinn))
}

/// All-digit field, at most `max_digits` long, value at most `max_value`.
fn bounded(field: &str, max_digits: usize, max_value: i64) -> Option<i64> {
    if field.is_empty() || field.len() > max_digits || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let v = field.parse::<i64>().ok()?;
    (v <= max_value).then_some(v)
}

/// All-digit field of any length; `None` only when malformed or past `i64`.
fn unbounded(field: &str) -> Option<i64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse::<i64>().ok()
}

/// Split a clock body into colon fields and the optional `.ms` tail.
/// The tail is only legal on the three-field shape.
fn clock_fields(body: &str) -> Option<(&str, &str, Option<&str>, Option<&str>)> {
    let (clock, milli) = match body.split_once('.') {
        Some((c, m)) => (c, Some(m)),
        None => (body, None),
    };
    let fields: Vec<&str> = clock.split(':').collect();
    match fields.as_slice() {
        [h, m] if milli.is_none() => Some((*h, *m, None, None)),
        [h, m, s] => Some((*h, *m, Some(*s), milli)),
        _ => None,
    }
}

fn erinn_time_of_day_ms(body: &str) -> Option<i64> {
    let (h, m, s, milli) = clock_fields(body)?;
    if s.is_some() || milli.is_some() {
        return None;
    }
    let h = bounded(h, 2, 23)?;
    let m = bounded(m, 2, 59)?;
    Some((h * 60 + m) * ERINN_MINUTE_MS)
}

fn real_time_of_day_ms(body: &str) -> Option<i64> {
    let (h, m, s, milli) = clock_fields(body)?;
    let h = bounded(h, 2, 23)?;
    let m = bounded(m, 2, 59)?;
    let s = match s {
        Some(s) => bounded(s, 2, 59)?,
        None => 0,
    };
    let milli = match milli {
        Some(ms) => bounded(ms, 3, 999)?,
        None => 0,
    };
    let ms = h * 3_600_000 + m * 60_000 + s * 1_000 + milli;
    debug_assert!((0..REAL_DAY_MS).contains(&ms));
    Some(ms)
}

fn erinn_duration_ms(body: &str) -> Option<i64> {
    let (h, m, s, milli) = clock_fields(body)?;
    if s.is_some() || milli.is_some() {
        return None;
    }
    unbounded(h)?
        .checked_mul(60)?
        .checked_add(unbounded(m)?)?
        .checked_mul(ERINN_MINUTE_MS)
}

fn real_duration_ms(body: &str) -> Option<i64> {
    let (h, m, s, milli) = clock_fields(body)?;
    let mut total = unbounded(h)?.checked_mul(3_600_000)?;
    total = total.checked_add(unbounded(m)?.checked_mul(60_000)?)?;
    if let Some(s) = s {
        total = total.checked_add(unbounded(s)?.checked_mul(1_000)?)?;
    }
    if let Some(milli) = milli {
        total = total.checked_add(unbounded(milli)?)?;
    }
    Some(total)
}

fn date_time_inner(input: &str) -> Option<ServerDateTime> {
    let body = input.strip_suffix(|c: char| matches!(c, 's' | 'S'))?;
    let (date_part, time_part) = body.split_once(|c: char| matches!(c, 't' | 'T'))?;

    let mut dp = date_part.split('-');
    let year = bounded(dp.next()?, 4, 9999)? as i32;
    let month = bounded(dp.next()?, 2, 12)? as u32;
    let day = bounded(dp.next()?, 2, 31)? as u32;
    if dp.next().is_some() || month == 0 || day == 0 || day > days_in_month(year, month) {
        return None;
    }

    // minute and second are optional beyond the hour; the ms tail is only
    // legal on the full three-field shape
    let (clock, milli) = match time_part.split_once('.') {
        Some((c, m)) => (c, Some(m)),
        None => (time_part, None),
    };
    let fields: Vec<&str> = clock.split(':').collect();
    let (h, m, s) = match fields.as_slice() {
        [h] if milli.is_none() => (*h, None, None),
        [h, m] if milli.is_none() => (*h, Some(*m), None),
        [h, m, s] => (*h, Some(*m), Some(*s)),
        _ => return None,
    };
    let hour = bounded(h, 2, 23)? as u32;
    let minute = match m {
        Some(m) => bounded(m, 2, 59)? as u32,
        None => 0,
    };
    let second = match s {
        Some(s) => bounded(s, 2, 59)? as u32,
        None => 0,
    };
    let milli = match milli {
        Some(ms) => bounded(ms, 3, 999)? as u32,
        None => 0,
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, milli)?;
    let instant_ms = resolve_server_local(NaiveDateTime::new(date, time))?;

    Some(ServerDateTime {
        year,
        month,
        day,
        hour,
        minute,
        second,
        milli,
        instant_ms,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ERINN_DAY_MS, ERINN_HOUR_MS};

    // ── time of day, Erinn ────────────────────────────────────────────────────

    #[test]
    fn erinn_time_of_day_basic() {
        let t = parse_time_of_day("6:00E").unwrap();
        assert_eq!(t.calendar, Calendar::Erinn);
        assert_eq!(t.ms, 6 * ERINN_HOUR_MS);
    }

    #[test]
    fn erinn_suffix_is_case_insensitive() {
        assert_eq!(
            parse_time_of_day("18:00e").unwrap().ms,
            18 * ERINN_HOUR_MS
        );
    }

    #[test]
    fn erinn_last_minute_of_day() {
        let t = parse_time_of_day("23:59E").unwrap();
        assert_eq!(t.ms, ERINN_DAY_MS - ERINN_MINUTE_MS);
    }

    #[test]
    fn erinn_time_of_day_rejects_out_of_range() {
        assert!(parse_time_of_day("24:00E").is_err());
        assert!(parse_time_of_day("0:60E").is_err());
    }

    #[test]
    fn erinn_time_of_day_rejects_seconds_field() {
        assert!(parse_time_of_day("6:00:00E").is_err());
    }

    // ── time of day, Real ─────────────────────────────────────────────────────

    #[test]
    fn real_time_of_day_shapes() {
        assert_eq!(parse_time_of_day("6:00S").unwrap().ms, 21_600_000);
        assert_eq!(parse_time_of_day("6:00:30S").unwrap().ms, 21_630_000);
        assert_eq!(parse_time_of_day("6:00:30.250S").unwrap().ms, 21_630_250);
    }

    #[test]
    fn real_time_of_day_single_digit_fields() {
        assert_eq!(parse_time_of_day("7:5S").unwrap().ms, 7 * 3_600_000 + 5 * 60_000);
    }

    #[test]
    fn real_time_of_day_last_ms_of_day() {
        assert_eq!(parse_time_of_day("23:59:59.999S").unwrap().ms, 86_399_999);
    }

    #[test]
    fn milli_field_converts_by_integer_value() {
        // ".5" is five milliseconds, not half a second
        assert_eq!(parse_time_of_day("0:00:00.5S").unwrap().ms, 5);
        assert_eq!(parse_time_of_day("0:00:00.50S").unwrap().ms, 50);
    }

    #[test]
    fn real_time_of_day_rejects_bad_fields() {
        assert!(parse_time_of_day("24:00S").is_err());
        assert!(parse_time_of_day("6:60S").is_err());
        assert!(parse_time_of_day("6:00:60S").is_err());
        assert!(parse_time_of_day("6:00:00.1234S").is_err());
        assert!(parse_time_of_day("6:00.5S").is_err(), "ms needs a seconds field");
        assert!(parse_time_of_day("123:00S").is_err(), "hour is at most 2 digits");
    }

    #[test]
    fn missing_suffix_is_its_own_error() {
        assert!(matches!(
            parse_time_of_day("12:00"),
            Err(TimeStringError::MissingSuffix { .. })
        ));
    }

    #[test]
    fn junk_around_the_body_is_rejected() {
        assert!(parse_time_of_day("x6:00S").is_err());
        assert!(parse_time_of_day("6:00Sx").is_err());
        assert!(parse_time_of_day("6::00S").is_err());
        assert!(parse_time_of_day("S").is_err());
        assert!(parse_time_of_day("").is_err());
    }

    // ── durations ─────────────────────────────────────────────────────────────

    #[test]
    fn durations_are_not_range_checked() {
        assert_eq!(parse_duration("0:90S").unwrap().ms, 5_400_000);
        assert_eq!(parse_duration("100:00S").unwrap().ms, 360_000_000);
        assert_eq!(parse_duration("24:00E").unwrap().ms, ERINN_DAY_MS);
    }

    #[test]
    fn duration_full_shape() {
        assert_eq!(parse_duration("1:30:15.250S").unwrap().ms, 5_415_250);
    }

    #[test]
    fn duration_milli_digits_are_unbounded() {
        assert_eq!(parse_duration("0:00:00.1234S").unwrap().ms, 1_234);
    }

    #[test]
    fn zero_duration_parses() {
        // rejecting a zero interval is the rule's job, not the grammar's
        assert_eq!(parse_duration("0:00S").unwrap().ms, 0);
    }

    #[test]
    fn duration_overflow_is_an_error() {
        let huge = format!("{}:00S", i64::MAX);
        assert!(matches!(
            parse_duration(&huge),
            Err(TimeStringError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn erinn_duration_uses_erinn_rate() {
        // one Erinn minute is 1.5 real seconds
        assert_eq!(parse_duration("0:01E").unwrap().ms, 1_500);
    }

    // ── date-times ────────────────────────────────────────────────────────────

    #[test]
    fn date_time_round_trips_fields() {
        let dt = parse_server_date_time("2024-1-15T13:45:30.250S").unwrap();
        assert_eq!(
            (dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second, dt.milli),
            (2024, 1, 15, 13, 45, 30, 250)
        );
        assert_eq!(crate::clock::real_ms_after_midnight(dt.instant_ms), 49_530_250);
    }

    #[test]
    fn date_time_t_and_s_case_insensitive() {
        let a = parse_server_date_time("2024-01-01T00:00:00S").unwrap();
        let b = parse_server_date_time("2024-01-01t00:00:00s").unwrap();
        assert_eq!(a.instant_ms, b.instant_ms);
    }

    #[test]
    fn thirteenth_month_is_rejected() {
        assert!(parse_server_date_time("2024-13-01T00:00:00S").is_err());
    }

    #[test]
    fn leap_day_validation() {
        assert!(parse_server_date_time("2024-2-29T0:0:0S").is_ok());
        assert!(parse_server_date_time("2023-2-29T0:0:0S").is_err());
        assert!(parse_server_date_time("2000-2-29T0:0:0S").is_ok());
        assert!(parse_server_date_time("1900-2-29T0:0:0S").is_err());
    }

    #[test]
    fn date_time_minute_and_second_are_optional() {
        let full = parse_server_date_time("2024-01-01T06:00:00S").unwrap();
        let no_second = parse_server_date_time("2024-01-01T06:00S").unwrap();
        let hour_only = parse_server_date_time("2024-01-01T6S").unwrap();

        assert_eq!(no_second.instant_ms, full.instant_ms);
        assert_eq!(hour_only.instant_ms, full.instant_ms);
        assert_eq!(
            (hour_only.hour, hour_only.minute, hour_only.second, hour_only.milli),
            (6, 0, 0, 0)
        );
    }

    #[test]
    fn date_time_milliseconds_need_the_full_shape() {
        assert!(parse_server_date_time("2024-01-01T00:00.5S").is_err());
        assert!(parse_server_date_time("2024-01-01T0.5S").is_err());
    }

    #[test]
    fn date_time_rejects_zero_month_and_day() {
        assert!(parse_server_date_time("2024-0-01T00:00:00S").is_err());
        assert!(parse_server_date_time("2024-01-0T00:00:00S").is_err());
    }

    #[test]
    fn date_times_order_by_instant() {
        let a = parse_server_date_time("2024-01-01T00:00:00S").unwrap();
        let b = parse_server_date_time("2024-01-01T01:00:00S").unwrap();
        assert_eq!(b.instant_ms - a.instant_ms, 3_600_000);
    }

    // ── validation views ──────────────────────────────────────────────────────

    #[test]
    fn validity_checks_pin_the_calendar() {
        assert!(is_valid_time_of_day("6:00E", Calendar::Erinn));
        assert!(!is_valid_time_of_day("6:00E", Calendar::Real));
        assert!(is_valid_duration("0:90S", Calendar::Real));
        assert!(!is_valid_duration("0:90S", Calendar::Erinn));
    }

    // ── calendar helpers ──────────────────────────────────────────────────────

    #[test]
    fn leap_year_rule() {
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 1), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 13), 0);
    }
}
