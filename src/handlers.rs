use crate::dates::{day_key, parse_calendar_date};
use crate::errors::AppError;
use crate::models::{
    Category, CompletionResponse, DateRequest, GroupProgress, GroupSummary, Group, Habit,
    NewCategory, NewHabit, ProgressRequest, ProgressResponse, ScheduleQuery, ScheduledHabit,
    SkipResponse, TodayResponse,
};
use crate::schedule::period_key;
use crate::state::AppState;
use crate::stats::HabitStatistics;
use crate::storage::persist_data;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Local, NaiveDate};

pub async fn get_today(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let today = today();
    let store = state.store.lock().await;
    let groups = Group::ALL
        .into_iter()
        .map(|group| GroupSummary {
            group,
            progress: store.group_progress(group, today, today),
        })
        .collect();

    Ok(Json(TodayResponse {
        date: day_key(today),
        groups,
    }))
}

pub async fn list_habits(State(state): State<AppState>) -> Json<Vec<Habit>> {
    let store = state.store.lock().await;
    Json(store.habits().to_vec())
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(payload): Json<NewHabit>,
) -> Result<(StatusCode, Json<Habit>), AppError> {
    let mut store = state.store.lock().await;
    let habit = store.add_habit(payload, Local::now().fixed_offset())?;
    persist_data(&state.data_path, store.data()).await?;
    Ok((StatusCode::CREATED, Json(habit)))
}

pub async fn get_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
) -> Result<Json<Habit>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(store.habit(&habit_id)?.clone()))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Json(payload): Json<NewHabit>,
) -> Result<Json<Habit>, AppError> {
    let mut store = state.store.lock().await;
    let habit = store.update_habit(&habit_id, payload)?;
    persist_data(&state.data_path, store.data()).await?;
    Ok(Json(habit))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    store.remove_habit(&habit_id)?;
    persist_data(&state.data_path, store.data()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Json(payload): Json<DateRequest>,
) -> Result<Json<CompletionResponse>, AppError> {
    let date = resolve_date(payload.date.as_deref())?;
    let mut store = state.store.lock().await;
    let completed = store.toggle_completion(&habit_id, date)?;
    persist_data(&state.data_path, store.data()).await?;

    let habit = store.habit(&habit_id)?;
    Ok(Json(CompletionResponse {
        habit_id,
        date: day_key(date),
        period_key: period_key(habit, date),
        completed,
    }))
}

pub async fn record_progress(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Json(payload): Json<ProgressRequest>,
) -> Result<Json<ProgressResponse>, AppError> {
    let date = resolve_date(payload.date.as_deref())?;
    let mut store = state.store.lock().await;
    let update = store.record_progress(&habit_id, date, payload.amount)?;
    persist_data(&state.data_path, store.data()).await?;

    Ok(Json(ProgressResponse {
        habit_id,
        date: day_key(date),
        period_key: update.period_key,
        progress: update.progress,
        target: update.target,
        completed: update.completed,
    }))
}

pub async fn skip_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Json(payload): Json<DateRequest>,
) -> Result<Json<SkipResponse>, AppError> {
    let date = resolve_date(payload.date.as_deref())?;
    let mut store = state.store.lock().await;
    if store.skip(&habit_id, date)? {
        persist_data(&state.data_path, store.data()).await?;
    }
    Ok(Json(SkipResponse {
        habit_id,
        date: day_key(date),
        skipped: true,
    }))
}

pub async fn restore_habit(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Json(payload): Json<DateRequest>,
) -> Result<Json<SkipResponse>, AppError> {
    let date = resolve_date(payload.date.as_deref())?;
    let mut store = state.store.lock().await;
    if store.restore(&habit_id, date)? {
        persist_data(&state.data_path, store.data()).await?;
    }
    Ok(Json(SkipResponse {
        habit_id,
        date: day_key(date),
        skipped: false,
    }))
}

pub async fn habit_stats(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
) -> Result<Json<HabitStatistics>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(store.statistics(&habit_id, today())?))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<ScheduledHabit>>, AppError> {
    let date = resolve_date(query.date.as_deref())?;
    let group = query.group.as_deref().map(parse_group).transpose()?;
    let store = state.store.lock().await;
    Ok(Json(store.scheduled_on(date, group)))
}

pub async fn get_group_progress(
    State(state): State<AppState>,
    Path(group): Path<String>,
    Query(query): Query<DateRequest>,
) -> Result<Json<GroupProgress>, AppError> {
    let group = parse_group(&group)?;
    let date = resolve_date(query.date.as_deref())?;
    let store = state.store.lock().await;
    Ok(Json(store.group_progress(group, date, today())))
}

pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    let store = state.store.lock().await;
    Json(store.categories().to_vec())
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let mut store = state.store.lock().await;
    let category = store.add_category(payload)?;
    persist_data(&state.data_path, store.data()).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_holidays(State(state): State<AppState>) -> Json<Vec<String>> {
    let store = state.store.lock().await;
    Json(store.holidays().dates().map(day_key).collect())
}

pub async fn add_holiday(
    State(state): State<AppState>,
    Json(payload): Json<DateRequest>,
) -> Result<StatusCode, AppError> {
    let raw = payload
        .date
        .ok_or_else(|| AppError::bad_request("date is required"))?;
    let date = parse_day(&raw)?;
    let mut store = state.store.lock().await;
    if store.add_holiday(date) {
        persist_data(&state.data_path, store.data()).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_holiday(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<StatusCode, AppError> {
    let date = parse_day(&raw)?;
    let mut store = state.store.lock().await;
    if store.remove_holiday(date) {
        persist_data(&state.data_path, store.data()).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

fn resolve_date(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => parse_day(raw),
        _ => Ok(today()),
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, AppError> {
    parse_calendar_date(raw).ok_or_else(|| AppError::bad_request(format!("invalid date '{raw}'")))
}

fn parse_group(raw: &str) -> Result<Group, AppError> {
    Group::parse(raw).ok_or_else(|| {
        AppError::bad_request("group must be one of 'daily', 'weekly', 'monthly', 'yearly'")
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
