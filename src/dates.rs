use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, Weekday};
use std::ops::RangeInclusive;

/// Years a parsed date may fall in. Dates outside are treated as unparseable.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1900..=9999;

pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a calendar date out of a persisted string.
///
/// Accepts plain `YYYY-MM-DD`, RFC 3339 timestamps (the offset is kept, so
/// `2024-01-01T23:30:00-05:00` is January 1st) and naive `YYYY-MM-DDTHH:MM:SS`
/// values. Anything else, including years outside [`SUPPORTED_YEARS`], yields `None`.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    parse_any_date(raw.trim()).filter(|date| SUPPORTED_YEARS.contains(&date.year()))
}

fn parse_any_date(trimmed: &str) -> Option<NaiveDate> {
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.date_naive());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|stamp| stamp.date())
}

/// 1970-01-01, the fallback when nothing else resolves.
pub fn epoch() -> NaiveDate {
    NaiveDate::default()
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = Duration::days(date.weekday().num_days_from_monday() as i64);
    date.checked_sub_signed(back).unwrap_or(NaiveDate::MIN)
}

/// Whole Monday-start weeks from `from` to `to`; negative when `to` is earlier.
pub fn weeks_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (week_start(to) - week_start(from)).num_days() / 7
}

pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + (to.month0() as i64 - from.month0() as i64)
}

/// 0 = Sunday .. 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

pub fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{}", iso.year(), iso.week())
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let start = month_start(date);
    start
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX)
}

pub fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

pub fn next_year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year() + 1, 1, 1).unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordinal {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Last,
}

impl Ordinal {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "first" => Some(Self::First),
            "second" => Some(Self::Second),
            "third" => Some(Self::Third),
            "fourth" => Some(Self::Fourth),
            "fifth" => Some(Self::Fifth),
            "last" => Some(Self::Last),
            _ => None,
        }
    }

    fn position(self) -> Option<u32> {
        match self {
            Self::First => Some(1),
            Self::Second => Some(2),
            Self::Third => Some(3),
            Self::Fourth => Some(4),
            Self::Fifth => Some(5),
            Self::Last => None,
        }
    }
}

pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "sunday" | "sun" => Some(Weekday::Sun),
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        _ => None,
    }
}

/// `last` holds when a week later falls in another month; `first..fifth`
/// hold when the day sits in that seven-day block of the month.
pub fn is_nth_weekday_of_month(date: NaiveDate, ordinal: Ordinal) -> bool {
    match ordinal.position() {
        None => date
            .checked_add_signed(Duration::days(7))
            .is_none_or(|later| later.month() != date.month()),
        Some(n) => (date.day() - 1) / 7 + 1 == n,
    }
}
