//! Recurrence rules: whether a habit occurs on a date, and which
//! completion period a date belongs to.
//!
//! Both functions are pure. The only input besides the habit and the date is
//! the holiday table, which the caller owns.

use chrono::{Datelike, Duration, NaiveDate};

use crate::anchor::resolve_anchor;
use crate::dates::{
    Ordinal, day_key, day_of_week, is_nth_weekday_of_month, iso_week_number, months_between,
    parse_weekday, week_label, weeks_between,
};
use crate::models::{Frequency, HolidayCalendar, Habit, MonthlyMode, MonthlyRule};

pub fn is_scheduled_on_date(habit: &Habit, date: NaiveDate, holidays: &HolidayCalendar) -> bool {
    if habit.paused {
        return false;
    }

    let frequency = habit.effective_frequency();

    // Target habits are in scope for every day of their period; only
    // biweekly ones filter, by week parity.
    if habit.is_target() {
        return match frequency {
            Frequency::Biweekly => weeks_between(resolve_anchor(habit), date).rem_euclid(2) == 0,
            _ => true,
        };
    }

    match frequency {
        Frequency::Daily => habit.active_on_holidays || !holidays.is_holiday(date),
        Frequency::Weekly => habit.days.is_empty() || habit.days.contains(&day_of_week(date)),
        Frequency::Biweekly => scheduled_biweekly(habit, date),
        Frequency::Monthly => scheduled_monthly(habit, date),
        Frequency::Yearly => scheduled_yearly(habit, date),
        Frequency::Unknown(_) => true,
    }
}

fn scheduled_biweekly(habit: &Habit, date: NaiveDate) -> bool {
    let dow = day_of_week(date);
    if !habit.days.is_empty() && !habit.days.contains(&dow) {
        return false;
    }

    let anchor = resolve_anchor(habit);
    let week_diff = weeks_between(anchor, date);
    if week_diff.rem_euclid(2) != 0 {
        return false;
    }
    // Weeks are Monday-start here but the weekday comparison is Sunday-first,
    // so a Sunday in the anchor's week always counts as "before" the anchor.
    if week_diff == 0 && dow < day_of_week(anchor) {
        return false;
    }
    true
}

fn scheduled_monthly(habit: &Habit, date: NaiveDate) -> bool {
    let fallback = MonthlyRule::default();
    let rule = habit.monthly.as_ref().unwrap_or(&fallback);
    let interval = rule.interval.unwrap_or(1).max(1) as i64;
    let month_diff = months_between(resolve_anchor(habit), date);
    if month_diff.rem_euclid(interval) != 0 {
        return false;
    }

    match rule.mode {
        MonthlyMode::On => matches_combinations(rule, date),
        MonthlyMode::Each | MonthlyMode::Unrecognized => {
            rule.dates.is_empty() || rule.dates.contains(&date.day())
        }
    }
}

fn matches_combinations(rule: &MonthlyRule, date: NaiveDate) -> bool {
    if rule.combinations.is_empty() {
        return true;
    }
    rule.combinations
        .iter()
        .filter_map(|raw| parse_combination(raw))
        .any(|(ordinal, weekday)| {
            weekday == date.weekday() && is_nth_weekday_of_month(date, ordinal)
        })
}

/// `"first-monday"` style entries; malformed ones never match.
pub fn parse_combination(raw: &str) -> Option<(Ordinal, chrono::Weekday)> {
    let (ordinal, weekday) = raw.split_once('-')?;
    Some((Ordinal::parse(ordinal)?, parse_weekday(weekday)?))
}

fn scheduled_yearly(habit: &Habit, date: NaiveDate) -> bool {
    let interval = habit.year_interval.unwrap_or(1).max(1) as i64;
    let year_diff = date.year() as i64 - resolve_anchor(habit).year() as i64;
    if year_diff.rem_euclid(interval) != 0 {
        return false;
    }
    if !habit.months.is_empty() && !habit.months.contains(&date.month0()) {
        return false;
    }
    if !habit.yearly_dates.is_empty() && !habit.yearly_dates.contains(&date.day()) {
        return false;
    }
    true
}

/// Key of the completion/progress bucket `date` falls into.
///
/// Weekly keys carry the ISO week-numbering year so the days of one ISO week
/// always share a key, including around New Year.
pub fn period_key(habit: &Habit, date: NaiveDate) -> String {
    match habit.effective_frequency() {
        Frequency::Daily => day_key(date),
        Frequency::Weekly => week_label(date),
        Frequency::Monthly => date.format("%Y-%m").to_string(),
        Frequency::Yearly => date.format("%Y").to_string(),
        Frequency::Biweekly => {
            let start = biweekly_period_start(habit, date);
            format!("{}-BW{}", start.iso_week().year(), iso_week_number(start))
        }
        Frequency::Unknown(_) => day_key(date),
    }
}

/// Start of the anchor-aligned fourteen-day window containing `date`.
pub fn biweekly_period_start(habit: &Habit, date: NaiveDate) -> NaiveDate {
    let anchor = resolve_anchor(habit);
    let pairs = weeks_between(anchor, date).div_euclid(2);
    anchor
        .checked_add_signed(Duration::days(pairs * 14))
        .unwrap_or(anchor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn habit(frequency: &str) -> Habit {
        Habit {
            id: "h".to_string(),
            name: "test".to_string(),
            created_at: Some("2024-01-01".to_string()),
            frequency: Some(Frequency::from(frequency)),
            ..Habit::default()
        }
    }

    fn no_holidays() -> HolidayCalendar {
        HolidayCalendar::new()
    }

    #[test]
    fn paused_is_never_scheduled() {
        for frequency in ["daily", "weekly", "biweekly", "monthly", "yearly", "whenever"] {
            let mut h = habit(frequency);
            h.paused = true;
            h.target = Some(2.0);
            for offset in 0..30 {
                let date = ymd(2024, 1, 1) + Duration::days(offset);
                assert!(!is_scheduled_on_date(&h, date, &no_holidays()));
            }
        }
    }

    #[test]
    fn daily_respects_holidays_unless_opted_in() {
        let holidays: HolidayCalendar = [ymd(2024, 12, 25)].into_iter().collect();
        let mut h = habit("daily");
        assert!(!is_scheduled_on_date(&h, ymd(2024, 12, 25), &holidays));
        assert!(is_scheduled_on_date(&h, ymd(2024, 12, 26), &holidays));
        h.active_on_holidays = true;
        assert!(is_scheduled_on_date(&h, ymd(2024, 12, 25), &holidays));
    }

    #[test]
    fn holidays_only_affect_daily_frequency() {
        let holidays: HolidayCalendar = [ymd(2024, 12, 25)].into_iter().collect();
        let h = habit("weekly");
        assert!(is_scheduled_on_date(&h, ymd(2024, 12, 25), &holidays));
        let mut target = habit("daily");
        target.target = Some(5.0);
        assert!(is_scheduled_on_date(&target, ymd(2024, 12, 25), &holidays));
    }

    #[test]
    fn frequency_is_case_insensitive() {
        let mut h = habit("WEEKLY");
        h.days = vec![1];
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 8), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 1, 9), &no_holidays()));
    }

    #[test]
    fn weekly_without_days_is_every_day() {
        let h = habit("weekly");
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 13), &no_holidays()));
    }

    #[test]
    fn biweekly_parity_from_anchor() {
        let mut h = habit("biweekly");
        h.created_at = Some("2024-01-03".to_string());
        let anchor = ymd(2024, 1, 3);
        assert!(is_scheduled_on_date(&h, anchor, &no_holidays()));
        assert!(!is_scheduled_on_date(&h, anchor + Duration::days(7), &no_holidays()));
        assert!(is_scheduled_on_date(&h, anchor + Duration::days(14), &no_holidays()));
    }

    #[test]
    fn biweekly_week_zero_uses_sunday_first_comparison() {
        let mut h = habit("biweekly");
        h.created_at = Some("2024-01-03".to_string());
        // Tuesday before the Wednesday anchor.
        assert!(!is_scheduled_on_date(&h, ymd(2024, 1, 2), &no_holidays()));
        // Sunday closing the anchor's Monday-start week sorts first.
        assert!(!is_scheduled_on_date(&h, ymd(2024, 1, 7), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 6), &no_holidays()));
        // Two weeks later every weekday is in.
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 15), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 21), &no_holidays()));
    }

    #[test]
    fn biweekly_with_days_restriction() {
        let mut h = habit("biweekly");
        h.days = vec![1];
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 1), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 1, 8), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 15), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 1, 16), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 29), &no_holidays()));
    }

    #[test]
    fn target_biweekly_uses_parity_only() {
        let mut h = habit("daily");
        h.target = Some(4.0);
        h.target_frequency = Some(Frequency::Biweekly);
        h.days = vec![3];
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 1), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 7), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 1, 8), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2023, 12, 18), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2023, 12, 25), &no_holidays()));
    }

    #[test]
    fn target_habits_ignore_day_filters() {
        let mut h = habit("weekly");
        h.target = Some(10.0);
        h.days = vec![1];
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 2), &no_holidays()));
        h.target_frequency = Some(Frequency::Yearly);
        h.months = vec![5];
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 2), &no_holidays()));
    }

    #[test]
    fn monthly_each_with_dates_and_interval() {
        let mut h = habit("monthly");
        h.monthly = Some(MonthlyRule {
            interval: Some(2),
            dates: vec![1, 15],
            ..MonthlyRule::default()
        });
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 15), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 1, 16), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 2, 15), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2024, 3, 1), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2023, 11, 1), &no_holidays()));
    }

    #[test]
    fn monthly_without_rule_is_every_day() {
        let h = habit("monthly");
        assert!(is_scheduled_on_date(&h, ymd(2024, 2, 29), &no_holidays()));
        let mut zero = habit("monthly");
        zero.monthly = Some(MonthlyRule {
            interval: Some(0),
            ..MonthlyRule::default()
        });
        assert!(is_scheduled_on_date(&zero, ymd(2024, 5, 9), &no_holidays()));
    }

    #[test]
    fn monthly_first_monday_only() {
        let mut h = habit("monthly");
        h.created_at = Some("2023-07-19".to_string());
        h.monthly = Some(MonthlyRule {
            interval: Some(1),
            mode: MonthlyMode::On,
            combinations: vec!["first-monday".to_string()],
            ..MonthlyRule::default()
        });
        let mut date = ymd(2024, 1, 1);
        while date < ymd(2025, 1, 1) {
            let expected = date.weekday() == chrono::Weekday::Mon && date.day() <= 7;
            assert_eq!(
                is_scheduled_on_date(&h, date, &no_holidays()),
                expected,
                "{date}"
            );
            date += Duration::days(1);
        }
    }

    #[test]
    fn monthly_last_friday_and_bad_entries() {
        let mut h = habit("monthly");
        h.monthly = Some(MonthlyRule {
            mode: MonthlyMode::On,
            combinations: vec!["last-friday".to_string(), "sometimes-never".to_string()],
            ..MonthlyRule::default()
        });
        assert!(is_scheduled_on_date(&h, ymd(2024, 3, 29), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 3, 22), &no_holidays()));
    }

    #[test]
    fn yearly_month_filter() {
        let mut h = habit("yearly");
        h.months = vec![5];
        h.year_interval = Some(1);
        assert!(is_scheduled_on_date(&h, ymd(2024, 6, 1), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2031, 6, 30), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 7, 1), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 5, 31), &no_holidays()));
    }

    #[test]
    fn yearly_interval_and_dates() {
        let mut h = habit("yearly");
        h.year_interval = Some(2);
        h.months = vec![0];
        h.yearly_dates = vec![10];
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 10), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2024, 1, 11), &no_holidays()));
        assert!(!is_scheduled_on_date(&h, ymd(2025, 1, 10), &no_holidays()));
        assert!(is_scheduled_on_date(&h, ymd(2026, 1, 10), &no_holidays()));
    }

    #[test]
    fn unknown_frequency_defaults_to_scheduled() {
        let h = habit("whenever");
        assert!(is_scheduled_on_date(&h, ymd(2024, 1, 5), &no_holidays()));
        assert_eq!(period_key(&h, ymd(2024, 1, 5)), "2024-01-05");
    }

    #[test]
    fn period_keys_by_frequency() {
        let date = ymd(2024, 3, 14);
        assert_eq!(period_key(&habit("daily"), date), "2024-03-14");
        assert_eq!(period_key(&habit("weekly"), date), "2024-W11");
        assert_eq!(period_key(&habit("monthly"), date), "2024-03");
        assert_eq!(period_key(&habit("yearly"), date), "2024");
    }

    #[test]
    fn target_frequency_drives_period_key() {
        let mut h = habit("daily");
        h.target = Some(3.0);
        h.target_frequency = Some(Frequency::Monthly);
        assert_eq!(period_key(&h, ymd(2024, 3, 14)), "2024-03");
    }

    #[test]
    fn weekly_key_is_shared_within_iso_week() {
        let h = habit("weekly");
        let monday = ymd(2024, 12, 30);
        for offset in 0..7 {
            assert_eq!(
                period_key(&h, monday + Duration::days(offset)),
                period_key(&h, monday)
            );
        }
        assert_ne!(
            period_key(&h, monday),
            period_key(&h, monday + Duration::days(7))
        );
        assert_ne!(
            period_key(&h, monday),
            period_key(&h, monday - Duration::days(1))
        );
    }

    #[test]
    fn biweekly_key_spans_two_weeks() {
        let h = habit("biweekly");
        let first = period_key(&h, ymd(2024, 1, 1));
        assert_eq!(first, "2024-BW1");
        assert_eq!(period_key(&h, ymd(2024, 1, 10)), first);
        assert_eq!(period_key(&h, ymd(2024, 1, 14)), first);
        assert_eq!(period_key(&h, ymd(2024, 1, 15)), "2024-BW3");
        assert_eq!(period_key(&h, ymd(2023, 12, 31)), "2023-BW51");
    }
}
