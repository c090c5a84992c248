use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::anchor::history_start;
use crate::completion::{is_completed, is_skipped_on_date};
use crate::dates::{
    day_key, month_start, next_month_start, next_year_start, week_start, year_start,
};
use crate::groups::belongs_to_group;
use crate::models::{Frequency, Group, GroupProgress, Habit, HolidayCalendar};
use crate::schedule::is_scheduled_on_date;

const SHORT_WINDOW: usize = 7;
const LONG_WINDOW: usize = 30;

/// Step size used when walking a habit's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Day,
    Week,
    Month,
    Year,
}

impl Cadence {
    /// Schedule habits are judged day by day; target habits once per target period.
    pub fn for_habit(habit: &Habit) -> Self {
        if !habit.is_target() {
            return Self::Day;
        }
        match habit.effective_frequency() {
            Frequency::Weekly | Frequency::Biweekly => Self::Week,
            Frequency::Monthly => Self::Month,
            Frequency::Yearly => Self::Year,
            Frequency::Daily | Frequency::Unknown(_) => Self::Day,
        }
    }

    pub fn for_group(group: Group) -> Self {
        match group {
            Group::Daily => Self::Day,
            Group::Weekly => Self::Week,
            Group::Monthly => Self::Month,
            Group::Yearly => Self::Year,
        }
    }

    pub fn start_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => week_start(date),
            Self::Month => month_start(date),
            Self::Year => year_start(date),
        }
    }

    /// Start of the following period; `None` past the end of the calendar.
    pub fn next(self, start: NaiveDate) -> Option<NaiveDate> {
        let next = match self {
            Self::Day => start.checked_add_signed(Duration::days(1)),
            Self::Week => start.checked_add_signed(Duration::weeks(1)),
            Self::Month => Some(next_month_start(start)),
            Self::Year => Some(next_year_start(start)),
        };
        next.filter(|next| *next > start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct PeriodOutcome {
    scheduled: bool,
    completed: bool,
}

fn outcome(
    habit: &Habit,
    cadence: Cadence,
    start: NaiveDate,
    holidays: &HolidayCalendar,
) -> PeriodOutcome {
    let mut scheduled = is_scheduled_on_date(habit, start, holidays);
    if cadence == Cadence::Day && is_skipped_on_date(habit, start) {
        scheduled = false;
    }
    PeriodOutcome {
        scheduled,
        completed: scheduled && is_completed(habit, start),
    }
}

/// One outcome per period from the habit's start through the period holding `today`.
fn history(habit: &Habit, today: NaiveDate, holidays: &HolidayCalendar) -> Vec<PeriodOutcome> {
    let cadence = Cadence::for_habit(habit);
    let start = history_start(habit, today);
    if start > today {
        return Vec::new();
    }
    let last = cadence.start_of(today);
    let mut cursor = cadence.start_of(start);
    let mut outcomes = Vec::new();
    while cursor <= last {
        outcomes.push(outcome(habit, cadence, cursor, holidays));
        match cadence.next(cursor) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    outcomes
}

fn rate_of(outcomes: &[PeriodOutcome]) -> f64 {
    let scheduled = outcomes.iter().filter(|o| o.scheduled).count();
    if scheduled == 0 {
        return 0.0;
    }
    let completed = outcomes.iter().filter(|o| o.completed).count();
    completed as f64 / scheduled as f64 * 100.0
}

fn tail(outcomes: &[PeriodOutcome], periods: usize) -> &[PeriodOutcome] {
    &outcomes[outcomes.len().saturating_sub(periods)..]
}

fn current_streak_of(outcomes: &[PeriodOutcome]) -> u32 {
    let mut streak = 0;
    for outcome in outcomes.iter().rev() {
        if !outcome.scheduled {
            continue;
        }
        if !outcome.completed {
            break;
        }
        streak += 1;
    }
    streak
}

fn longest_streak_of(outcomes: &[PeriodOutcome]) -> u32 {
    let mut best = 0;
    let mut run = 0;
    for outcome in outcomes.iter().filter(|o| o.scheduled) {
        if outcome.completed {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

fn rolling_rate_of(outcomes: &[PeriodOutcome], periods: usize) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    if outcomes.len() >= periods {
        return rate_of(tail(outcomes, periods));
    }
    let Some((current, earlier)) = outcomes.split_last() else {
        return 0.0;
    };

    let mut window: Vec<PeriodOutcome> = Vec::with_capacity(periods);
    if current.scheduled {
        window.push(*current);
    }
    let room = periods - window.len();
    window.extend(
        earlier
            .iter()
            .rev()
            .filter(|o| o.scheduled && o.completed)
            .take(room)
            .copied(),
    );
    if window.is_empty() {
        return 0.0;
    }
    rate_of(&window)
}

/// Share of scheduled periods completed among the trailing `periods`
/// (days for schedule habits, target periods otherwise), never reaching back
/// before the habit's start. 0 when nothing was scheduled.
pub fn completion_rate(
    habit: &Habit,
    periods: usize,
    today: NaiveDate,
    holidays: &HolidayCalendar,
) -> f64 {
    rate_of(tail(&history(habit, today, holidays), periods))
}

/// Walks back from `today`; unscheduled periods are passed over, the first
/// scheduled-but-incomplete one ends the streak.
pub fn current_streak(habit: &Habit, today: NaiveDate, holidays: &HolidayCalendar) -> u32 {
    current_streak_of(&history(habit, today, holidays))
}

pub fn longest_streak(habit: &Habit, today: NaiveDate, holidays: &HolidayCalendar) -> u32 {
    longest_streak_of(&history(habit, today, holidays))
}

/// Completion rate that does not dip for young habits.
///
/// Until the habit has `periods` periods of history the window is the current
/// period (when scheduled) plus the most recent completed earlier ones; after
/// that it is the plain trailing completion rate.
pub fn rolling_completion_rate(
    habit: &Habit,
    periods: usize,
    today: NaiveDate,
    holidays: &HolidayCalendar,
) -> f64 {
    rolling_rate_of(&history(habit, today, holidays), periods)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStatistics {
    pub habit_id: String,
    pub name: String,
    pub cadence: Cadence,
    pub start_date: String,
    pub as_of: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub completion_rate_7: f64,
    pub completion_rate_30: f64,
    pub rolling_rate: f64,
    pub overall_rate: f64,
    pub scheduled_periods: u32,
    pub completed_periods: u32,
}

pub fn habit_statistics(habit: &Habit, holidays: &HolidayCalendar) -> HabitStatistics {
    habit_statistics_at(habit, Local::now().date_naive(), holidays)
}

pub fn habit_statistics_at(
    habit: &Habit,
    today: NaiveDate,
    holidays: &HolidayCalendar,
) -> HabitStatistics {
    let outcomes = history(habit, today, holidays);
    let scheduled = outcomes.iter().filter(|o| o.scheduled).count() as u32;
    let completed = outcomes.iter().filter(|o| o.completed).count() as u32;

    HabitStatistics {
        habit_id: habit.id.clone(),
        name: habit.name.clone(),
        cadence: Cadence::for_habit(habit),
        start_date: day_key(history_start(habit, today)),
        as_of: day_key(today),
        current_streak: current_streak_of(&outcomes),
        longest_streak: longest_streak_of(&outcomes),
        completion_rate_7: round_rate(rate_of(tail(&outcomes, SHORT_WINDOW))),
        completion_rate_30: round_rate(rate_of(tail(&outcomes, LONG_WINDOW))),
        rolling_rate: round_rate(rolling_rate_of(&outcomes, SHORT_WINDOW)),
        overall_rate: round_rate(rate_of(&outcomes)),
        scheduled_periods: scheduled,
        completed_periods: completed,
    }
}

fn round_rate(rate: f64) -> f64 {
    (rate * 10.0).round() / 10.0
}

pub fn group_progress(
    habits: &[Habit],
    group: Group,
    date: NaiveDate,
    holidays: &HolidayCalendar,
) -> GroupProgress {
    group_progress_at(habits, group, date, Local::now().date_naive(), holidays)
}

/// Completed versus active occurrences for one group within the day, ISO
/// week, month or year containing `date`.
///
/// A target habit adds at most one to each side (its target was hit on some
/// scheduled day of the period, or not). A schedule habit adds one active per
/// scheduled, unskipped day and one completed per such day that is complete.
/// Days before a habit's start are not counted.
pub fn group_progress_at(
    habits: &[Habit],
    group: Group,
    date: NaiveDate,
    today: NaiveDate,
    holidays: &HolidayCalendar,
) -> GroupProgress {
    let cadence = Cadence::for_group(group);
    let period_start = cadence.start_of(date);
    let period_last = cadence
        .next(period_start)
        .and_then(|end| end.pred_opt())
        .unwrap_or(NaiveDate::MAX);

    let mut active = 0u32;
    let mut completed = 0u32;

    for habit in habits.iter().filter(|h| belongs_to_group(h, group)) {
        let first = period_start.max(history_start(habit, today));
        let days = first
            .iter_days()
            .take_while(|day| *day <= period_last)
            .filter(|day| {
                is_scheduled_on_date(habit, *day, holidays) && !is_skipped_on_date(habit, *day)
            });
        if habit.is_target() {
            let mut any_active = false;
            let mut any_completed = false;
            for day in days {
                any_active = true;
                if is_completed(habit, day) {
                    any_completed = true;
                    break;
                }
            }
            active += u32::from(any_active);
            completed += u32::from(any_completed);
        } else {
            for day in days {
                active += 1;
                if is_completed(habit, day) {
                    completed += 1;
                }
            }
        }
    }

    let percentage = if active == 0 {
        0
    } else {
        ((completed as f64 / active as f64) * 100.0).round().min(100.0) as u32
    };

    GroupProgress {
        percentage,
        completed,
        active,
    }
}
