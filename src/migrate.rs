use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tracing::debug;

use crate::dates::{day_key, parse_calendar_date};
use crate::models::Habit;

fn legacy_id_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let prefix = id.get(..13)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let millis: i64 = prefix.parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Creation date embedded in legacy ids: the first 13 characters as Unix milliseconds.
pub fn legacy_created_at(id: &str) -> Option<NaiveDate> {
    legacy_id_timestamp(id).map(|stamp| stamp.date_naive())
}

/// Writes an explicit `createdAt` for habits that only carry a timestamped id.
/// Returns true when the habit was changed.
pub fn backfill_created_at(habit: &mut Habit) -> bool {
    let has_valid = habit
        .created_at
        .as_deref()
        .and_then(parse_calendar_date)
        .is_some();
    if has_valid {
        return false;
    }
    match legacy_id_timestamp(&habit.id) {
        Some(stamp) => {
            let stamp = stamp.to_rfc3339_opts(SecondsFormat::Millis, true);
            debug!(habit_id = %habit.id, created_at = %stamp, "backfilled createdAt from id");
            habit.created_at = Some(stamp);
            true
        }
        None => false,
    }
}

/// Normalizes a habit loaded from disk so the engine never sees half-shaped records.
pub fn ensure_habit_integrity(habit: &mut Habit) {
    backfill_created_at(habit);

    let mut skipped: Vec<String> = habit
        .skipped_dates
        .iter()
        .filter_map(|raw| parse_calendar_date(raw))
        .map(day_key)
        .collect();
    skipped.sort();
    skipped.dedup();
    habit.skipped_dates = skipped;

    let ceiling = habit.target_value();
    habit.progress.retain(|_, value| value.is_finite());
    for value in habit.progress.values_mut() {
        *value = value.max(0.0);
        if let Some(target) = ceiling {
            *value = value.min(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_thirteen_digit_prefix() {
        let date = legacy_created_at("1704067200000abc").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(legacy_created_at("170406720000"), None);
        assert_eq!(legacy_created_at("habit-1704067200000"), None);
    }

    #[test]
    fn backfill_keeps_existing_created_at() {
        let mut habit = Habit {
            id: "1704067200000".to_string(),
            created_at: Some("2023-05-05".to_string()),
            ..Habit::default()
        };
        assert!(!backfill_created_at(&mut habit));
        assert_eq!(habit.created_at.as_deref(), Some("2023-05-05"));
    }

    #[test]
    fn backfill_replaces_garbage_created_at() {
        let mut habit = Habit {
            id: "1704067200000".to_string(),
            created_at: Some("yesterday".to_string()),
            ..Habit::default()
        };
        assert!(backfill_created_at(&mut habit));
        assert_eq!(
            habit.created_at.as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn integrity_normalizes_skips_and_progress() {
        let mut habit = Habit {
            id: "custom".to_string(),
            target: Some(3.0),
            skipped_dates: vec![
                "2024-03-02".to_string(),
                "garbage".to_string(),
                "2024-03-01".to_string(),
                "2024-03-02".to_string(),
            ],
            ..Habit::default()
        };
        habit.progress.insert("2024-03-01".to_string(), 7.0);
        habit.progress.insert("2024-03-02".to_string(), -1.0);
        habit.progress.insert("2024-03-03".to_string(), f64::NAN);

        ensure_habit_integrity(&mut habit);

        assert_eq!(habit.skipped_dates, vec!["2024-03-01", "2024-03-02"]);
        assert_eq!(habit.progress.get("2024-03-01"), Some(&3.0));
        assert_eq!(habit.progress.get("2024-03-02"), Some(&0.0));
        assert!(!habit.progress.contains_key("2024-03-03"));
        assert_eq!(habit.created_at, None);
    }
}
