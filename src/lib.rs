pub mod anchor;
pub mod app;
pub mod completion;
pub mod config;
pub mod dates;
pub mod errors;
pub mod groups;
pub mod handlers;
pub mod migrate;
pub mod models;
pub mod schedule;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;

pub use anchor::resolve_anchor;
pub use app::router;
pub use completion::{is_completed, is_skipped_on_date, set_completed, toggle_completed};
pub use config::AppConfig;
pub use groups::belongs_to_group;
pub use schedule::{is_scheduled_on_date, period_key};
pub use state::AppState;
pub use stats::{HabitStatistics, group_progress, habit_statistics};
pub use storage::load_data;
pub use store::{HabitStore, StoreEvent};
