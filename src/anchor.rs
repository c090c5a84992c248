use chrono::NaiveDate;

use crate::dates::{epoch, parse_calendar_date};
use crate::migrate::legacy_created_at;
use crate::models::Habit;

/// Reference date for biweekly parity and month/year intervals.
///
/// `anchorDate`, then `createdAt`, then the timestamp embedded in a legacy id,
/// then 1970-01-01. Never consults the clock.
pub fn resolve_anchor(habit: &Habit) -> NaiveDate {
    habit
        .anchor_date
        .as_deref()
        .and_then(parse_calendar_date)
        .or_else(|| habit.created_at.as_deref().and_then(parse_calendar_date))
        .or_else(|| legacy_created_at(&habit.id))
        .unwrap_or_else(epoch)
}

/// First day of history for statistics. Unlike the anchor this ignores
/// `anchorDate` and falls back to `today`, which reports an empty history.
pub fn history_start(habit: &Habit, today: NaiveDate) -> NaiveDate {
    habit
        .created_at
        .as_deref()
        .and_then(parse_calendar_date)
        .or_else(|| legacy_created_at(&habit.id))
        .unwrap_or(today)
}
