// Data models for the task store

use crate::error::StoreError;
use chrono::{DateTime, NaiveDate, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned task identifier. Starts at 1 and is never reused.
pub type TaskId = u64;

/// Wire format for due dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Task priority. Crosses the wire as the integer 0, 1 or 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = StoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Priority::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Priority {
    type Error = StoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Priority::Low),
            1 => Ok(Priority::Medium),
            2 => Ok(Priority::High),
            other => Err(StoreError::validation(format!(
                "invalid priority: {} (expected 0, 1 or 2)",
                other
            ))),
        }
    }
}

impl FromStr for Priority {
    type Err = StoreError;

    /// Accepts either the numeric level or the name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Priority::try_from(n);
        }
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "med" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(StoreError::validation(format!("invalid priority: {}", s))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub priority: Priority,
    /// Serialized as `null` when absent, never omitted
    pub due_date: Option<NaiveDate>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts over the whole collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl TaskStats {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks.into_iter().fold(TaskStats::default(), |mut stats, task| {
            stats.total += 1;
            if task.done {
                stats.completed += 1;
            } else {
                stats.active += 1;
            }
            stats
        })
    }
}

/// Trim a title and reject it when nothing is left
pub fn normalize_title(title: &str) -> Result<String, StoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StoreError::validation("task title cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Parse an optional `YYYY-MM-DD` due date. Blank input means no due date.
pub fn parse_due_date(input: Option<&str>) -> Result<Option<NaiveDate>, StoreError> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|e| StoreError::validation(format!("invalid due date '{}': {}", s, e))),
    }
}

/// Current UTC time at microsecond precision, which is what the backends can represent
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Next creation timestamp, strictly after `last` even if the wall clock stalls or steps back
pub fn next_created_at(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = now_utc();
    match last {
        Some(last) if now <= last => last + TimeDelta::microseconds(1),
        _ => now,
    }
}
