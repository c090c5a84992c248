use crate::errors::AppError;
use crate::migrate::ensure_habit_integrity;
use crate::models::{AppData, HolidayCalendar};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};

pub async fn load_data(path: &Path) -> AppData {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return AppData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            return AppData::default();
        }
    };

    let root = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(root)) => root,
        Ok(_) => {
            error!("data file does not hold a JSON object");
            set_aside(path, &bytes).await;
            return AppData::default();
        }
        Err(err) => {
            error!("failed to parse data file: {err}");
            set_aside(path, &bytes).await;
            return AppData::default();
        }
    };

    let (mut data, dropped) = decode_app_data(root);
    if dropped > 0 {
        set_aside(path, &bytes).await;
    }
    for habit in &mut data.habits {
        ensure_habit_integrity(habit);
    }
    info!(
        habits = data.habits.len(),
        categories = data.categories.len(),
        "loaded habit data"
    );
    data
}

/// Decodes each stored record on its own. Returns the data and how many
/// records were unreadable and left out.
fn decode_app_data(mut root: Map<String, Value>) -> (AppData, usize) {
    let mut dropped = 0;
    let habits = decode_records(root.remove("habits"), "habit", &mut dropped);
    let categories = decode_records(root.remove("categories"), "category", &mut dropped);
    let holidays = root
        .remove("holidays")
        .and_then(|value| serde_json::from_value::<HolidayCalendar>(value).ok())
        .unwrap_or_default();
    (
        AppData {
            habits,
            categories,
            holidays,
        },
        dropped,
    )
}

fn decode_records<T: DeserializeOwned>(
    section: Option<Value>,
    kind: &str,
    dropped: &mut usize,
) -> Vec<T> {
    let items = match section {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => return Vec::new(),
        Some(_) => {
            warn!("ignoring {kind} list that is not an array");
            *dropped += 1;
            return Vec::new();
        }
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(index, "dropping unreadable {kind}: {err}");
                *dropped += 1;
                None
            }
        })
        .collect()
}

/// Copies the original bytes next to the data file so a later save cannot
/// lose what failed to load.
async fn set_aside(path: &Path, bytes: &[u8]) {
    let backup = corrupt_path(path);
    match fs::write(&backup, bytes).await {
        Ok(()) => warn!(backup = %backup.display(), "kept a copy of the unreadable data file"),
        Err(err) => error!("failed to keep a copy of the data file: {err}"),
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}
