// Query filtering and ordering for task listings

use crate::error::StoreError;
use crate::models::Task;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Completion-state filter for a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.done,
            Filter::Completed => task.done,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

impl FromStr for Filter {
    type Err = StoreError;

    /// Blank selects `all`; anything unrecognized is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(StoreError::validation(format!(
                "unknown filter: {} (expected all, active or completed)",
                other
            ))),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering applied to a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Newest first
    #[default]
    CreatedAt,
    /// High first, then newest first
    Priority,
    /// Earliest deadline first, undated last, then newest first
    DueDate,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::Priority => "priority",
            SortKey::DueDate => "due_date",
        }
    }

    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        let primary = match self {
            SortKey::CreatedAt => Ordering::Equal,
            SortKey::Priority => b.priority.cmp(&a.priority),
            SortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then_with(|| newest_first(a, b))
    }
}

// created_at descending, then insertion order (id) descending
fn newest_first(a: &Task, b: &Task) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

impl FromStr for SortKey {
    type Err = StoreError;

    /// Blank selects `created_at`; anything unrecognized is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "created_at" => Ok(SortKey::CreatedAt),
            "priority" => Ok(SortKey::Priority),
            "due_date" => Ok(SortKey::DueDate),
            other => Err(StoreError::validation(format!(
                "unknown sort key: {} (expected created_at, priority or due_date)",
                other
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Materialize a filtered, sorted copy of `tasks`
pub fn select(tasks: &[Task], filter: Filter, sort_by: SortKey) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks.iter().filter(|t| filter.matches(t)).cloned().collect();
    selected.sort_by(|a, b| sort_by.compare(a, b));
    selected
}
