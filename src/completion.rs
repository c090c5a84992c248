use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::anchor::resolve_anchor;
use crate::dates::day_key;
use crate::models::{Completion, Habit};
use crate::schedule::period_key;

pub fn is_completed(habit: &Habit, date: NaiveDate) -> bool {
    match &habit.completed {
        Completion::AlwaysTrue => true,
        Completion::PerPeriod(map) => map.get(&period_key(habit, date)).copied().unwrap_or(false),
    }
}

/// Writes the completion flag for the period containing `date`.
///
/// A legacy always-completed habit is first expanded into a per-period map
/// covering every period from its anchor through `date`.
pub fn set_completed(habit: &mut Habit, date: NaiveDate, value: bool) {
    let key = period_key(habit, date);
    if matches!(habit.completed, Completion::AlwaysTrue) {
        let upgraded = legacy_history(habit, date);
        debug!(
            habit_id = %habit.id,
            periods = upgraded.len(),
            "upgraded legacy completion flag"
        );
        habit.completed = Completion::PerPeriod(upgraded);
    }
    if let Completion::PerPeriod(map) = &mut habit.completed {
        map.insert(key, value);
    }
}

fn legacy_history(habit: &Habit, through: NaiveDate) -> BTreeMap<String, bool> {
    resolve_anchor(habit)
        .iter_days()
        .take_while(|day| *day <= through)
        .map(|day| (period_key(habit, day), true))
        .collect()
}

/// Read, negate, write. Callers serialize access; returns the new value.
pub fn toggle_completed(habit: &mut Habit, date: NaiveDate) -> bool {
    let next = !is_completed(habit, date);
    set_completed(habit, date, next);
    next
}

/// Skips are per calendar day whatever the habit's frequency.
pub fn is_skipped_on_date(habit: &Habit, date: NaiveDate) -> bool {
    let key = day_key(date);
    habit.skipped_dates.iter().any(|skipped| *skipped == key)
}

pub fn skip_date(habit: &mut Habit, date: NaiveDate) -> bool {
    if is_skipped_on_date(habit, date) {
        return false;
    }
    habit.skipped_dates.push(day_key(date));
    habit.skipped_dates.sort();
    true
}

pub fn restore_skipped(habit: &mut Habit, date: NaiveDate) -> bool {
    let key = day_key(date);
    let before = habit.skipped_dates.len();
    habit.skipped_dates.retain(|skipped| *skipped != key);
    habit.skipped_dates.len() != before
}

pub fn progress_for(habit: &Habit, date: NaiveDate) -> f64 {
    habit
        .progress
        .get(&period_key(habit, date))
        .copied()
        .unwrap_or(0.0)
}

/// Stores `value` for the period containing `date`, clamped to `[0, target]`.
pub fn set_progress(habit: &mut Habit, date: NaiveDate, value: f64) -> f64 {
    let mut clamped = if value.is_finite() { value.max(0.0) } else { 0.0 };
    if let Some(target) = habit.target_value() {
        clamped = clamped.min(target);
    }
    let key = period_key(habit, date);
    habit.progress.insert(key, clamped);
    clamped
}

/// Adds `delta` to the period's progress. Never touches `completed`.
pub fn add_progress(habit: &mut Habit, date: NaiveDate, delta: f64) -> f64 {
    let current = progress_for(habit, date);
    set_progress(habit, date, current + delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekly() -> Habit {
        Habit {
            id: "w".to_string(),
            created_at: Some("2024-01-01".to_string()),
            frequency: Some(Frequency::Weekly),
            ..Habit::default()
        }
    }

    #[test]
    fn set_then_read_completion() {
        let mut habit = weekly();
        let date = ymd(2024, 3, 13);
        assert!(!is_completed(&habit, date));
        set_completed(&mut habit, date, true);
        assert!(is_completed(&habit, date));
        // Same ISO week shares the key.
        assert!(is_completed(&habit, ymd(2024, 3, 17)));
        assert!(!is_completed(&habit, ymd(2024, 3, 18)));
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut habit = weekly();
        let date = ymd(2024, 3, 13);
        assert!(toggle_completed(&mut habit, date));
        assert!(!toggle_completed(&mut habit, date));
        assert!(!is_completed(&habit, date));
    }

    #[test]
    fn legacy_always_true_upgrades_on_write() {
        let mut habit = Habit {
            id: "legacy".to_string(),
            created_at: Some("2024-03-01".to_string()),
            completed: Completion::AlwaysTrue,
            ..Habit::default()
        };
        assert!(is_completed(&habit, ymd(1999, 1, 1)));

        set_completed(&mut habit, ymd(2024, 3, 5), false);

        assert!(matches!(habit.completed, Completion::PerPeriod(_)));
        assert!(is_completed(&habit, ymd(2024, 3, 1)));
        assert!(is_completed(&habit, ymd(2024, 3, 4)));
        assert!(!is_completed(&habit, ymd(2024, 3, 5)));
        assert!(!is_completed(&habit, ymd(2024, 3, 6)));
    }

    #[test]
    fn skip_is_day_granular() {
        let mut habit = weekly();
        assert!(skip_date(&mut habit, ymd(2024, 3, 13)));
        assert!(!skip_date(&mut habit, ymd(2024, 3, 13)));
        assert!(is_skipped_on_date(&habit, ymd(2024, 3, 13)));
        assert!(!is_skipped_on_date(&habit, ymd(2024, 3, 14)));
        assert!(restore_skipped(&mut habit, ymd(2024, 3, 13)));
        assert!(!restore_skipped(&mut habit, ymd(2024, 3, 13)));
        assert!(habit.skipped_dates.is_empty());
    }

    #[test]
    fn progress_clamps_and_does_not_complete() {
        let mut habit = Habit {
            id: "water".to_string(),
            target: Some(3.0),
            target_frequency: Some(Frequency::Daily),
            ..Habit::default()
        };
        let date = ymd(2024, 3, 1);
        assert_eq!(set_progress(&mut habit, date, 2.0), 2.0);
        assert_eq!(add_progress(&mut habit, date, 1.0), 3.0);
        assert!(!is_completed(&habit, date));
        assert_eq!(add_progress(&mut habit, date, 5.0), 3.0);
        assert_eq!(add_progress(&mut habit, date, -10.0), 0.0);
        assert_eq!(progress_for(&habit, ymd(2024, 3, 2)), 0.0);
    }
}
