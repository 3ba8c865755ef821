// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Date helpers.
//!
//! "Today" is evaluated in US Eastern time with the US daylight-saving
//! rules. Display formatting uses a fixed UTC-5 offset labelled `EST`.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Utc, Weekday,
};

use crate::models::parse_timestamp;

const HOUR: i32 = 3600;

/// The `n`th occurrence of `weekday` in a month
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

/// UTC instants bounding daylight time in `year`: 2:00 EST on the second
/// Sunday of March and 2:00 EDT on the first Sunday of November.
fn dst_bounds(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let two_am = NaiveTime::from_hms_opt(2, 0, 0)?;
    let start = nth_weekday(year, 3, Weekday::Sun, 2)?.and_time(two_am) + Duration::hours(5);
    let end = nth_weekday(year, 11, Weekday::Sun, 1)?.and_time(two_am) + Duration::hours(4);
    Some((Utc.from_utc_datetime(&start), Utc.from_utc_datetime(&end)))
}

/// America/New_York offset at the given instant
pub fn eastern_offset(at: DateTime<Utc>) -> FixedOffset {
    let in_dst = dst_bounds(at.year())
        .map(|(start, end)| at >= start && at < end)
        .unwrap_or(false);
    let hours = if in_dst { -4 } else { -5 };
    FixedOffset::east_opt(hours * HOUR).unwrap_or_else(|| Utc.fix())
}

pub fn to_eastern(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.with_timezone(&eastern_offset(at))
}

pub fn now_eastern() -> DateTime<FixedOffset> {
    to_eastern(Utc::now())
}

pub fn today_eastern() -> NaiveDate {
    now_eastern().date_naive()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD format.", value))
}

/// Inclusive window of `days` days ending at `end_date` (default: today, Eastern)
pub fn date_range(days: u32, end_date: Option<&str>) -> Result<(NaiveDate, NaiveDate), String> {
    let end = match end_date {
        Some(value) if !value.trim().is_empty() => parse_date(value)?,
        _ => today_eastern(),
    };
    let span = i64::from(days.max(1)) - 1;
    let start = end
        .checked_sub_signed(Duration::days(span))
        .ok_or_else(|| format!("Invalid date '{}'. Date is out of range.", end))?;
    Ok((start, end))
}

/// `start`/`end` query values covering a whole UTC day
pub fn day_bounds(date: &str) -> (String, String) {
    (format!("{}T00:00:00Z", date), format!("{}T23:59:59Z", date))
}

fn fixed_est() -> FixedOffset {
    FixedOffset::west_opt(5 * HOUR).unwrap_or_else(|| Utc.fix())
}

/// "Monday, Jan 15, 2024", optionally followed by " - 10:30 PM EST".
/// `Unknown` and unparseable values pass through unchanged.
pub fn format_date_est(value: &str, include_time: bool) -> String {
    let Some(utc) = parse_timestamp(value) else {
        return value.to_string();
    };
    let local = utc.with_timezone(&fixed_est());
    let date = local.format("%A, %b %d, %Y").to_string();

    if include_time {
        format!("{} - {}", date, local.format("%I:%M %p EST"))
    } else {
        date
    }
}

/// Formats an optional timestamp, using `missing` when absent
pub fn format_optional(value: Option<&str>, include_time: bool, missing: &str) -> String {
    match value {
        Some(v) if v != "Unknown" => format_date_est(v, include_time),
        _ => missing.to_string(),
    }
}

/// "1h 5m" or "45m"
pub fn format_duration_minutes(minutes: f64) -> String {
    let hours = (minutes / 60.0).trunc() as i64;
    let mins = (minutes % 60.0).trunc() as i64;
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

pub fn format_duration_millis(millis: f64) -> String {
    format_duration_minutes(millis / 60_000.0)
}

/// Naive Eastern wall-clock time for an instant, used in tests and summaries
pub fn eastern_naive(at: DateTime<Utc>) -> NaiveDateTime {
    to_eastern(at).naive_local()
}
