//! Reference-timezone day boundaries (US Central time) used for leaderboards and daily sequences.
//!
//! The offsets follow the IANA `America/Chicago` zone. Central time is UTC-6, or UTC-5 while
//! daylight saving is in effect. The daylight window is the fixed US rule in force since 2007:
//! from 02:00 local on the second Sunday of March until 02:00 local on the first Sunday of
//! November. Dates before 2007 or after a future change in US law are not handled.

use time::{
    Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, Weekday,
    format_description::well_known::Rfc3339, macros::format_description,
};

const STANDARD_OFFSET_HOURS: i8 = -6;
const DAYLIGHT_OFFSET_HOURS: i8 = -5;
/// Local hour at which the daylight saving switch happens.
const SWITCH_HOUR: u8 = 2;

/// Date whose `nth` (1-based) Sunday in `month` falls on.
fn nth_sunday(year: i32, month: Month, nth: u8) -> Option<Date> {
    let first = Date::from_calendar_date(year, month, 1).ok()?;
    let offset = (7 - first.weekday().number_days_from_sunday()) % 7;
    let day = 1 + offset + 7 * (nth - 1);
    Date::from_calendar_date(year, month, day).ok()
}

/// Daylight saving window of `year`, as UTC instants.
fn daylight_window(year: i32) -> Option<(OffsetDateTime, OffsetDateTime)> {
    let switch = Time::from_hms(SWITCH_HOUR, 0, 0).ok()?;
    let starts = PrimitiveDateTime::new(nth_sunday(year, Month::March, 2)?, switch)
        .assume_offset(UtcOffset::from_hms(STANDARD_OFFSET_HOURS, 0, 0).ok()?);
    let ends = PrimitiveDateTime::new(nth_sunday(year, Month::November, 1)?, switch)
        .assume_offset(UtcOffset::from_hms(DAYLIGHT_OFFSET_HOURS, 0, 0).ok()?);
    Some((starts, ends))
}

fn offset_hours(dst: bool) -> i8 {
    if dst {
        DAYLIGHT_OFFSET_HOURS
    } else {
        STANDARD_OFFSET_HOURS
    }
}

/// UTC offset of the reference timezone at instant `at`.
pub fn reference_offset(at: OffsetDateTime) -> UtcOffset {
    let dst = daylight_window(at.year()).is_some_and(|(starts, ends)| at >= starts && at < ends);
    UtcOffset::from_hms(offset_hours(dst), 0, 0).unwrap_or(UtcOffset::UTC)
}

/// Calendar day of `at` in the reference timezone.
pub fn reference_date(at: OffsetDateTime) -> Date {
    at.to_offset(reference_offset(at)).date()
}

/// Today's reference day.
pub fn today() -> Date {
    reference_date(OffsetDateTime::now_utc())
}

/// UTC instant of local midnight starting `date`.
///
/// Midnight never falls inside a switch hour, so the offset of the whole night is the one of
/// the day itself.
pub fn day_start(date: Date) -> OffsetDateTime {
    let dst = match (
        nth_sunday(date.year(), Month::March, 2),
        nth_sunday(date.year(), Month::November, 1),
    ) {
        (Some(starts), Some(ends)) => date > starts && date <= ends,
        _ => false,
    };
    let offset = UtcOffset::from_hms(offset_hours(dst), 0, 0).unwrap_or(UtcOffset::UTC);
    PrimitiveDateTime::new(date, Time::MIDNIGHT)
        .assume_offset(offset)
        .to_offset(UtcOffset::UTC)
}

/// Half-open UTC range `[start, end)` covering the reference day `date`.
pub fn day_range(date: Date) -> (OffsetDateTime, OffsetDateTime) {
    let end = date
        .next_day()
        .map(day_start)
        .unwrap_or_else(|| day_start(date) + Duration::days(1));
    (day_start(date), end)
}

/// Storage key of a reference day: the same calendar date at midnight UTC.
pub fn normalized(date: Date) -> OffsetDateTime {
    PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc()
}

/// Parse either `YYYY-MM-DD` (taken as a reference-day date) or an RFC 3339 instant.
pub fn parse_day(input: &str) -> Option<Date> {
    let trimmed = input.trim();
    if let Ok(date) = Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
        return Some(date);
    }
    OffsetDateTime::parse(trimmed, &Rfc3339)
        .ok()
        .map(reference_date)
}

/// Current instant truncated to whole milliseconds, the precision every backend keeps.
pub fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_millisecond(now.millisecond()).unwrap_or(now)
}
