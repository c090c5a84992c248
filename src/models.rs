use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::dates::parse_calendar_date;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Yearly,
    Unknown(String),
}

impl Frequency {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Unknown(raw) if raw.trim().is_empty())
    }
}

impl From<String> for Frequency {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "biweekly" => Self::Biweekly,
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<&str> for Frequency {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<Frequency> for String {
    fn from(frequency: Frequency) -> Self {
        frequency.as_str().to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthlyMode {
    #[default]
    Each,
    On,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRule {
    #[serde(default, deserialize_with = "lenient_count")]
    pub interval: Option<u32>,
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: MonthlyMode,
    #[serde(default, deserialize_with = "lenient_numbers")]
    pub dates: Vec<u32>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub combinations: Vec<String>,
}

/// Completion history of a habit.
///
/// Older data stored a bare `true` meaning "always completed"; that is kept as
/// `AlwaysTrue` until the first write upgrades it (see `completion::set_completed`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "CompletedRepr")]
pub enum Completion {
    AlwaysTrue,
    PerPeriod(BTreeMap<String, bool>),
}

impl Default for Completion {
    fn default() -> Self {
        Self::PerPeriod(BTreeMap::new())
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum CompletedRepr {
    Legacy(bool),
    PerPeriod(BTreeMap<String, bool>),
}

/// `true` is the legacy flag; a map keeps its boolean entries; anything else is empty.
impl<'de> Deserialize<'de> for Completion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(true) => Self::AlwaysTrue,
            Value::Object(entries) => Self::PerPeriod(
                entries
                    .into_iter()
                    .filter_map(|(key, value)| value.as_bool().map(|done| (key, done)))
                    .collect(),
            ),
            _ => Self::default(),
        })
    }
}

impl From<Completion> for CompletedRepr {
    fn from(completion: Completion) -> Self {
        match completion {
            Completion::AlwaysTrue => Self::Legacy(true),
            Completion::PerPeriod(map) => Self::PerPeriod(map),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Habit {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub category_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub anchor_date: Option<String>,
    #[serde(deserialize_with = "lenient_frequency")]
    pub frequency: Option<Frequency>,
    #[serde(deserialize_with = "lenient_frequency")]
    pub target_frequency: Option<Frequency>,
    #[serde(deserialize_with = "lenient_number")]
    pub target: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub target_unit: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub default_increment: Option<f64>,
    #[serde(deserialize_with = "lenient_numbers")]
    pub days: Vec<u32>,
    #[serde(deserialize_with = "lenient_monthly")]
    pub monthly: Option<MonthlyRule>,
    #[serde(deserialize_with = "lenient_numbers")]
    pub months: Vec<u32>,
    #[serde(deserialize_with = "lenient_count")]
    pub year_interval: Option<u32>,
    #[serde(deserialize_with = "lenient_numbers")]
    pub yearly_dates: Vec<u32>,
    #[serde(deserialize_with = "lenient_flag")]
    pub paused: bool,
    #[serde(deserialize_with = "lenient_flag")]
    pub active_on_holidays: bool,
    pub completed: Completion,
    #[serde(deserialize_with = "lenient_progress")]
    pub progress: BTreeMap<String, f64>,
    #[serde(deserialize_with = "lenient_strings")]
    pub skipped_dates: Vec<String>,
}

impl Habit {
    /// Positive, finite `target` makes a habit target-based.
    pub fn target_value(&self) -> Option<f64> {
        self.target.filter(|value| value.is_finite() && *value > 0.0)
    }

    pub fn is_target(&self) -> bool {
        self.target_value().is_some()
    }

    /// `targetFrequency`, else `frequency`, else daily. Blank values fall through.
    pub fn effective_frequency(&self) -> Frequency {
        self.target_frequency
            .as_ref()
            .filter(|frequency| !frequency.is_blank())
            .or_else(|| {
                self.frequency
                    .as_ref()
                    .filter(|frequency| !frequency.is_blank())
            })
            .cloned()
            .unwrap_or(Frequency::Daily)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct HolidayCalendar(BTreeSet<NaiveDate>);

/// Unparseable entries are dropped.
impl<'de> Deserialize<'de> for HolidayCalendar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dates = match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(parse_calendar_date)
                .collect(),
            _ => BTreeSet::new(),
        };
        Ok(Self(dates))
    }
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.0.insert(date)
    }

    pub fn remove(&mut self, date: NaiveDate) -> bool {
        self.0.remove(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<NaiveDate> for HolidayCalendar {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppData {
    pub habits: Vec<Habit>,
    pub categories: Vec<Category>,
    pub holidays: HolidayCalendar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Group {
    pub const ALL: [Group; 4] = [Group::Daily, Group::Weekly, Group::Monthly, Group::Yearly];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

/// Fields a caller supplies when creating a habit; id and createdAt are assigned by the store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewHabit {
    pub name: String,
    pub category_id: Option<String>,
    pub anchor_date: Option<String>,
    pub frequency: Option<Frequency>,
    pub target_frequency: Option<Frequency>,
    pub target: Option<f64>,
    pub target_unit: Option<String>,
    pub default_increment: Option<f64>,
    pub days: Vec<u32>,
    pub monthly: Option<MonthlyRule>,
    pub months: Vec<u32>,
    pub year_interval: Option<u32>,
    pub yearly_dates: Vec<u32>,
    pub paused: bool,
    pub active_on_holidays: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRequest {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgressRequest {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub habit_id: String,
    pub date: String,
    pub period_key: String,
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub habit_id: String,
    pub date: String,
    pub period_key: String,
    pub progress: f64,
    pub target: f64,
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SkipResponse {
    pub habit_id: String,
    pub date: String,
    pub skipped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledHabit {
    pub habit_id: String,
    pub name: String,
    pub period_key: String,
    pub completed: bool,
    pub skipped: bool,
    pub progress: Option<f64>,
    pub target: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupProgress {
    pub percentage: u32,
    pub completed: u32,
    pub active: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: Group,
    pub progress: GroupProgress,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: String,
    pub groups: Vec<GroupSummary>,
}

// Persisted habits come from older clients and hand edits. A field with the
// wrong shape falls back to its default instead of failing the whole file.

fn number_of(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn count_of(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => Some(raw),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_frequency<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Frequency>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => Some(Frequency::from(raw)),
        _ => None,
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(number_of(&Value::deserialize(deserializer)?))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(count_of(&Value::deserialize(deserializer)?))
}

fn lenient_numbers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u32>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(count_of).collect(),
        _ => Vec::new(),
    })
}

fn lenient_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(raw) => Some(raw),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::String(raw) => raw.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn lenient_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MonthlyMode, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "each" => MonthlyMode::Each,
            "on" => MonthlyMode::On,
            _ => MonthlyMode::Unrecognized,
        },
        _ => MonthlyMode::default(),
    })
}

fn lenient_monthly<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<MonthlyRule>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

fn lenient_progress<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(entries) => entries
            .into_iter()
            .filter_map(|(key, value)| number_of(&value).map(|amount| (key, amount)))
            .collect(),
        _ => BTreeMap::new(),
    })
}
