// Persistence collaborators for the task store

use crate::config::BackendKind;
use crate::jsonl::JsonlBackend;
use crate::models::{Task, TaskId};
use crate::sqlite::SqliteBackend;
use eyre::Result;
use std::path::Path;

/// Everything a backend recovers at open time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Live tasks in insertion order
    pub tasks: Vec<Task>,
    /// Id the next created task will receive
    pub next_id: TaskId,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }
}

/// Durable storage the store writes through to
///
/// Each write is called before the in-memory collection changes. If it
/// returns an error the store leaves its state untouched.
pub trait Backend: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Recover the persisted collection
    fn load(&mut self) -> Result<Snapshot>;

    /// Persist a newly created task
    fn insert(&mut self, task: &Task) -> Result<()>;

    /// Persist a changed task
    fn update(&mut self, task: &Task) -> Result<()>;

    /// Permanently remove a task
    fn remove(&mut self, id: TaskId) -> Result<()>;
}

/// No-op backend: tasks live only as long as the store
#[derive(Debug, Default)]
pub struct MemoryBackend;

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load(&mut self) -> Result<Snapshot> {
        Ok(Snapshot::default())
    }

    fn insert(&mut self, _task: &Task) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, _task: &Task) -> Result<()> {
        Ok(())
    }

    fn remove(&mut self, _id: TaskId) -> Result<()> {
        Ok(())
    }
}

/// Open the backend of the given kind rooted at `data_dir`
pub fn open_backend(kind: BackendKind, data_dir: &Path) -> Result<Box<dyn Backend>> {
    let backend: Box<dyn Backend> = match kind {
        BackendKind::Memory => Box::new(MemoryBackend),
        BackendKind::Jsonl => Box::new(JsonlBackend::open(data_dir)?),
        BackendKind::Sqlite => Box::new(SqliteBackend::open(data_dir)?),
    };
    Ok(backend)
}
