//! Monthly reset scheduling.
//!
//! Reset days are clamped to `1..=28` so every month has one, and resets
//! always happen at local midnight of that day in the month after `now`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone};

pub const MIN_RESET_DAY: u32 = 1;
pub const MAX_RESET_DAY: u32 = 28;

/// Granularity used to step over a DST gap at midnight.
const GAP_STEP_MINUTES: i64 = 15;

/// Longest run of nonexistent local time searched past midnight.
const MAX_GAP_HOURS: i64 = 48;

pub fn clamp_reset_day(reset_day: i32) -> u32 {
    reset_day.clamp(MIN_RESET_DAY as i32, MAX_RESET_DAY as i32) as u32
}

/// Returns the reset instant in the calendar month following `now`'s month.
pub fn next_reset_after<Tz: TimeZone>(now: &DateTime<Tz>, reset_day: i32) -> DateTime<Tz> {
    let day = clamp_reset_day(reset_day);
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .expect("reset day is clamped to a day present in every month");

    start_of_local_day(&now.timezone(), date)
}

/// A reset is due strictly after the scheduled instant.
pub fn is_reset_due<Tz: TimeZone>(now: &DateTime<Tz>, next_reset_at: &DateTime<Tz>) -> bool {
    now > next_reset_at
}

/// "YYYY-MM" label of the month containing `now`.
pub fn period_label<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y-%m").to_string()
}

/// First existing local instant at or after midnight of `date`. Some DST
/// transitions skip midnight, and a zone may drop a whole calendar day, in
/// which case the period starts on the next day.
fn start_of_local_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    let limit = midnight + Duration::hours(MAX_GAP_HOURS);
    let mut candidate = midnight;
    while candidate < limit {
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant;
        }
        candidate += Duration::minutes(GAP_STEP_MINUTES);
    }
    // Only reachable for a zone missing two days of local time: read the
    // midnight as UTC instead of failing.
    tz.from_utc_datetime(&midnight)
}
