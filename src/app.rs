use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(handlers::get_today))
        .route(
            "/api/habits",
            get(handlers::list_habits).post(handlers::create_habit),
        )
        .route(
            "/api/habits/:id",
            get(handlers::get_habit)
                .put(handlers::update_habit)
                .delete(handlers::delete_habit),
        )
        .route("/api/habits/:id/toggle", post(handlers::toggle_habit))
        .route("/api/habits/:id/progress", post(handlers::record_progress))
        .route("/api/habits/:id/skip", post(handlers::skip_habit))
        .route("/api/habits/:id/restore", post(handlers::restore_habit))
        .route("/api/habits/:id/stats", get(handlers::habit_stats))
        .route("/api/schedule", get(handlers::get_schedule))
        .route("/api/groups/:group/progress", get(handlers::get_group_progress))
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/holidays",
            get(handlers::list_holidays).post(handlers::add_holiday),
        )
        .route("/api/holidays/:date", delete(handlers::remove_holiday))
        .with_state(state)
}
