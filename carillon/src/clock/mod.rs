//! The two calendars every rotation runs against.
//!
//! ```text
//! Real   – wall-clock time in the fixed server zone (America/Los_Angeles),
//!          DST-aware.  One day is 24 real hours except on transition days.
//! Erinn  – synthetic game calendar running at a fixed rate against real
//!          time.  One Erinn minute is 1.5 real seconds, so a full Erinn
//!          day (24 × 60 minutes) passes every 36 real minutes.
//! ```
//!
//! All instants are unix-epoch milliseconds (`i64`).  Erinn arithmetic is
//! pure modular math over those instants; Real arithmetic goes through the
//! wall clock of [`SERVER_TZ`] so DST transitions land where players see
//! them, not where elapsed-ms division would put them.
//!
//! Submodules:
//! * [`parse`]  – the time-string grammar (times of day, durations, epochs)
//! * [`format`] – normalised duration / clock rendering

pub mod format;
pub mod parse;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

// ── Calendar constants ────────────────────────────────────────────────────────

/// One Erinn minute in real milliseconds.
pub const ERINN_MINUTE_MS: i64 = 1_500;

/// One Erinn hour (60 Erinn minutes) in real milliseconds.
pub const ERINN_HOUR_MS: i64 = 60 * ERINN_MINUTE_MS;

/// One Erinn day (24 Erinn hours) in real milliseconds: 36 real minutes.
pub const ERINN_DAY_MS: i64 = 24 * ERINN_HOUR_MS;

/// Phase offset between the unix epoch and Erinn midnight.
///
/// Added to a real instant before taking it modulo [`ERINN_DAY_MS`]; the unix
/// epoch itself lands at 08:00 Erinn.  The offset is fixed, so Erinn time is
/// completely independent of timezones and DST.
pub const ERINN_OFFSET_MS: i64 = 8 * ERINN_HOUR_MS;

/// One real day in milliseconds (DST transition days excepted).
pub const REAL_DAY_MS: i64 = 24 * 60 * 60 * 1_000;

/// The fixed wall clock all Real-calendar times refer to.
pub const SERVER_TZ: Tz = chrono_tz::America::Los_Angeles;

// ── Calendar selector ─────────────────────────────────────────────────────────

/// Which calendar a time-of-day, duration or trigger belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Calendar {
    /// Synthetic game calendar (suffix `E`).
    Erinn,
    /// Server wall-clock calendar (suffix `S`).
    Real,
}

impl Calendar {
    /// Nominal day length in real milliseconds.
    pub fn day_ms(self) -> i64 {
        match self {
            Calendar::Erinn => ERINN_DAY_MS,
            Calendar::Real => REAL_DAY_MS,
        }
    }
}

impl std::fmt::Display for Calendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Calendar::Erinn => write!(f, "Erinn"),
            Calendar::Real => write!(f, "Real"),
        }
    }
}

// ── Erinn clock ───────────────────────────────────────────────────────────────

/// Position of an instant within its Erinn day, in real-equivalent ms
/// (`0..ERINN_DAY_MS`).
///
/// Euclidean remainder keeps the result in range for pre-epoch instants too.
pub fn erinn_ms_after_midnight(instant_ms: i64) -> i64 {
    (instant_ms + ERINN_OFFSET_MS).rem_euclid(ERINN_DAY_MS)
}

/// Index of the Erinn day containing an instant (day 0 starts at the Erinn
/// midnight at or before the unix epoch).
pub fn erinn_day_index(instant_ms: i64) -> i64 {
    (instant_ms + ERINN_OFFSET_MS).div_euclid(ERINN_DAY_MS)
}

// ── Real (server wall-clock) clock ────────────────────────────────────────────

/// The instant rendered on the server wall clock.
///
/// Instants outside chrono's representable range clamp to the unix epoch;
/// every instant produced by the parsers or the trigger math is in range.
pub fn server_datetime(instant_ms: i64) -> DateTime<Tz> {
    DateTime::from_timestamp_millis(instant_ms)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .with_timezone(&SERVER_TZ)
}

/// Server-zone civil date containing an instant.
pub fn server_date(instant_ms: i64) -> NaiveDate {
    server_datetime(instant_ms).date_naive()
}

/// Position of an instant within its server-zone day, in ms
/// (`0..REAL_DAY_MS`).
///
/// Derived from the wall-clock fields, never from elapsed time since the
/// midnight instant: on a DST transition day the two disagree by the shifted
/// hour, and every Real-calendar comparison in the engine works on what the
/// wall clock shows.
pub fn real_ms_after_midnight(instant_ms: i64) -> i64 {
    let t = server_datetime(instant_ms).time();
    i64::from(t.num_seconds_from_midnight()) * 1_000 + i64::from(t.nanosecond() / 1_000_000)
}

/// Whole civil days from the server-zone date of `from_ms` to the date of
/// `to_ms` (negative when `to_ms` is on an earlier date).
pub fn server_days_between(from_ms: i64, to_ms: i64) -> i64 {
    server_date(to_ms)
        .signed_duration_since(server_date(from_ms))
        .num_days()
}

/// Map a server-zone wall-clock time to an absolute instant.
///
/// * unambiguous   → that instant
/// * DST fall-back → the earliest of the two matching instants
/// * DST gap       → shifted forward one hour (the position the wall clock
///   actually shows once it jumps), earliest mapping of the shifted time
///
/// `None` only for wall-clock values no shift can resolve.
pub fn resolve_server_local(naive: NaiveDateTime) -> Option<i64> {
    match SERVER_TZ.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.timestamp_millis()),
        LocalResult::Ambiguous(earliest, _latest) => Some(earliest.timestamp_millis()),
        LocalResult::None => SERVER_TZ
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp_millis()),
    }
}

/// Build a `NaiveTime` from a ms-after-midnight position.
///
/// `None` when the position is outside `0..REAL_DAY_MS`.
pub fn naive_time_from_ms(tod_ms: i64) -> Option<NaiveTime> {
    if !(0..REAL_DAY_MS).contains(&tod_ms) {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(
        (tod_ms / 1_000) as u32,
        ((tod_ms % 1_000) * 1_000_000) as u32,
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
