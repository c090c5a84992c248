use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use tracing::{debug, info};

use crate::completion::{
    add_progress, is_completed, is_skipped_on_date, progress_for, restore_skipped, set_completed,
    skip_date, toggle_completed,
};
use crate::errors::StoreError;
use crate::groups::belongs_to_group;
use crate::models::{
    AppData, Category, Group, GroupProgress, Habit, HolidayCalendar, NewCategory, NewHabit,
    ScheduledHabit,
};
use crate::schedule::{is_scheduled_on_date, period_key};
use crate::stats::{HabitStatistics, group_progress_at, habit_statistics_at};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    HabitAdded { habit_id: String },
    HabitUpdated { habit_id: String },
    HabitRemoved { habit_id: String },
    CompletionChanged { habit_id: String, period_key: String, completed: bool },
    ProgressChanged { habit_id: String, period_key: String, progress: f64 },
    SkipChanged { habit_id: String, date: NaiveDate, skipped: bool },
    CategoryAdded { category_id: String },
    HolidaysChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// Progress recorded for one period, and whether that period now counts as complete.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub period_key: String,
    pub progress: f64,
    pub target: f64,
    pub completed: bool,
}

/// Owns the application data. Every mutation runs to completion before
/// observers hear about it.
#[derive(Default)]
pub struct HabitStore {
    data: AppData,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl HabitStore {
    pub fn new(data: AppData) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn habits(&self) -> &[Habit] {
        &self.data.habits
    }

    pub fn categories(&self) -> &[Category] {
        &self.data.categories
    }

    pub fn holidays(&self) -> &HolidayCalendar {
        &self.data.holidays
    }

    pub fn habit(&self, habit_id: &str) -> Result<&Habit, StoreError> {
        self.data
            .habits
            .iter()
            .find(|habit| habit.id == habit_id)
            .ok_or_else(|| StoreError::HabitNotFound(habit_id.to_string()))
    }

    fn habit_mut(&mut self, habit_id: &str) -> Result<&mut Habit, StoreError> {
        self.data
            .habits
            .iter_mut()
            .find(|habit| habit.id == habit_id)
            .ok_or_else(|| StoreError::HabitNotFound(habit_id.to_string()))
    }

    pub fn subscribe(
        &mut self,
        observer: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    fn notify(&self, event: StoreEvent) {
        for (_, observer) in &self.observers {
            observer(&event);
        }
    }

    /// Creates a habit whose id starts with the 13-digit creation timestamp.
    pub fn add_habit(
        &mut self,
        new: NewHabit,
        now: DateTime<FixedOffset>,
    ) -> Result<Habit, StoreError> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::InvalidHabit("name must not be empty".to_string()));
        }

        let mut millis = now.timestamp_millis();
        while self.habit(&millis.to_string()).is_ok() {
            millis += 1;
        }

        let habit = Habit {
            id: millis.to_string(),
            name,
            created_at: Some(now.to_rfc3339_opts(SecondsFormat::Millis, false)),
            ..Habit::default()
        };
        let habit = apply_fields(habit, new);
        info!(habit_id = %habit.id, name = %habit.name, "habit created");
        self.data.habits.push(habit.clone());
        self.notify(StoreEvent::HabitAdded {
            habit_id: habit.id.clone(),
        });
        Ok(habit)
    }

    /// Replaces the editable fields; id, createdAt and history are kept.
    pub fn update_habit(&mut self, habit_id: &str, edit: NewHabit) -> Result<Habit, StoreError> {
        if edit.name.trim().is_empty() {
            return Err(StoreError::InvalidHabit("name must not be empty".to_string()));
        }
        let habit = self.habit_mut(habit_id)?;
        let updated = apply_fields(habit.clone(), edit);
        *habit = updated.clone();
        self.notify(StoreEvent::HabitUpdated {
            habit_id: habit_id.to_string(),
        });
        Ok(updated)
    }

    /// Deletes the habit and its completion history.
    pub fn remove_habit(&mut self, habit_id: &str) -> Result<Habit, StoreError> {
        let index = self
            .data
            .habits
            .iter()
            .position(|habit| habit.id == habit_id)
            .ok_or_else(|| StoreError::HabitNotFound(habit_id.to_string()))?;
        let removed = self.data.habits.remove(index);
        info!(habit_id = %removed.id, "habit removed");
        self.notify(StoreEvent::HabitRemoved {
            habit_id: removed.id.clone(),
        });
        Ok(removed)
    }

    pub fn toggle_completion(
        &mut self,
        habit_id: &str,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let habit = self.habit_mut(habit_id)?;
        let completed = toggle_completed(habit, date);
        let key = period_key(habit, date);
        self.notify(StoreEvent::CompletionChanged {
            habit_id: habit_id.to_string(),
            period_key: key,
            completed,
        });
        Ok(completed)
    }

    pub fn set_completion(
        &mut self,
        habit_id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<(), StoreError> {
        let habit = self.habit_mut(habit_id)?;
        set_completed(habit, date, completed);
        let key = period_key(habit, date);
        self.notify(StoreEvent::CompletionChanged {
            habit_id: habit_id.to_string(),
            period_key: key,
            completed,
        });
        Ok(())
    }

    /// Adds `amount` to the period's progress, then marks the period complete
    /// when the target is reached and incomplete when it falls below.
    pub fn record_progress(
        &mut self,
        habit_id: &str,
        date: NaiveDate,
        amount: Option<f64>,
    ) -> Result<ProgressUpdate, StoreError> {
        let habit = self.habit_mut(habit_id)?;
        let Some(target) = habit.target_value() else {
            return Err(StoreError::NotTargetHabit(habit_id.to_string()));
        };
        let delta = amount
            .or(habit.default_increment)
            .filter(|value| value.is_finite())
            .unwrap_or(1.0);

        let was_completed = is_completed(habit, date);
        let progress = add_progress(habit, date, delta);
        let reached = progress >= target;
        if reached != was_completed {
            set_completed(habit, date, reached);
        }
        let update = ProgressUpdate {
            period_key: period_key(habit, date),
            progress,
            target,
            completed: is_completed(habit, date),
        };

        self.notify(StoreEvent::ProgressChanged {
            habit_id: habit_id.to_string(),
            period_key: update.period_key.clone(),
            progress,
        });
        if reached != was_completed {
            self.notify(StoreEvent::CompletionChanged {
                habit_id: habit_id.to_string(),
                period_key: update.period_key.clone(),
                completed: update.completed,
            });
        }
        Ok(update)
    }

    pub fn skip(&mut self, habit_id: &str, date: NaiveDate) -> Result<bool, StoreError> {
        let changed = skip_date(self.habit_mut(habit_id)?, date);
        if changed {
            self.notify(StoreEvent::SkipChanged {
                habit_id: habit_id.to_string(),
                date,
                skipped: true,
            });
        }
        Ok(changed)
    }

    pub fn restore(&mut self, habit_id: &str, date: NaiveDate) -> Result<bool, StoreError> {
        let changed = restore_skipped(self.habit_mut(habit_id)?, date);
        if changed {
            self.notify(StoreEvent::SkipChanged {
                habit_id: habit_id.to_string(),
                date,
                skipped: false,
            });
        }
        Ok(changed)
    }

    pub fn add_category(&mut self, new: NewCategory) -> Result<Category, StoreError> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::InvalidCategory("name must not be empty".to_string()));
        }
        let mut suffix = self.data.categories.len() + 1;
        while self
            .data
            .categories
            .iter()
            .any(|category| category.id == format!("cat-{suffix}"))
        {
            suffix += 1;
        }
        let category = Category {
            id: format!("cat-{suffix}"),
            name,
            color: new.color,
        };
        self.data.categories.push(category.clone());
        self.notify(StoreEvent::CategoryAdded {
            category_id: category.id.clone(),
        });
        Ok(category)
    }

    pub fn add_holiday(&mut self, date: NaiveDate) -> bool {
        let changed = self.data.holidays.insert(date);
        if changed {
            self.notify(StoreEvent::HolidaysChanged);
        }
        changed
    }

    pub fn remove_holiday(&mut self, date: NaiveDate) -> bool {
        let changed = self.data.holidays.remove(date);
        if changed {
            self.notify(StoreEvent::HolidaysChanged);
        }
        changed
    }

    pub fn statistics(
        &self,
        habit_id: &str,
        today: NaiveDate,
    ) -> Result<HabitStatistics, StoreError> {
        let habit = self.habit(habit_id)?;
        Ok(habit_statistics_at(habit, today, &self.data.holidays))
    }

    pub fn group_progress(&self, group: Group, date: NaiveDate, today: NaiveDate) -> GroupProgress {
        group_progress_at(&self.data.habits, group, date, today, &self.data.holidays)
    }

    /// Habits occurring on `date`, optionally restricted to one group.
    pub fn scheduled_on(&self, date: NaiveDate, group: Option<Group>) -> Vec<ScheduledHabit> {
        self.data
            .habits
            .iter()
            .filter(|habit| group.is_none_or(|group| belongs_to_group(habit, group)))
            .filter(|habit| is_scheduled_on_date(habit, date, &self.data.holidays))
            .map(|habit| ScheduledHabit {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                period_key: period_key(habit, date),
                completed: is_completed(habit, date),
                skipped: is_skipped_on_date(habit, date),
                progress: habit.target_value().map(|_| progress_for(habit, date)),
                target: habit.target_value(),
            })
            .collect()
    }
}

fn apply_fields(mut habit: Habit, fields: NewHabit) -> Habit {
    habit.name = fields.name.trim().to_string();
    habit.category_id = fields.category_id;
    habit.anchor_date = fields.anchor_date;
    habit.frequency = fields.frequency;
    habit.target_frequency = fields.target_frequency;
    habit.target = fields.target;
    habit.target_unit = fields.target_unit;
    habit.default_increment = fields.default_increment;
    habit.days = fields.days;
    habit.monthly = fields.monthly;
    habit.months = fields.months;
    habit.year_interval = fields.year_interval;
    habit.yearly_dates = fields.yearly_dates;
    habit.paused = fields.paused;
    habit.active_on_holidays = fields.active_on_holidays;
    debug!(habit_id = %habit.id, frequency = %habit.effective_frequency(), "habit fields applied");
    habit
}

/// Logs every store event at debug level.
pub fn log_events(event: &StoreEvent) {
    debug!(?event, "store event");
}
