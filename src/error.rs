// Typed failures surfaced by the task store

use crate::models::TaskId;

/// Errors returned by [`crate::TaskStore`] and [`crate::TaskApi`] operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed input: empty title, bad date, unknown filter or sort key, invalid priority.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced task does not exist (or was deleted).
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The persistence backend rejected the write; in-memory state is unchanged.
    #[error("storage error: {0:#}")]
    Storage(eyre::Report),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<eyre::Report> for StoreError {
    fn from(report: eyre::Report) -> Self {
        StoreError::Storage(report)
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
