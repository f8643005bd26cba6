// tasktrack - personal task tracking backed by a persisted task store

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod jsonl;
pub mod models;
pub mod sqlite;
pub mod store;

// Re-export main types for convenience
pub use api::TaskApi;
pub use backend::{Backend, MemoryBackend, Snapshot};
pub use config::{BackendKind, Config};
pub use error::{Result, StoreError};
pub use filter::{Filter, SortKey};
pub use models::{Priority, Task, TaskId, TaskStats};
pub use store::TaskStore;
