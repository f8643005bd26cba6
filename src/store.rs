// Task store: the authoritative task collection and its operations

use crate::backend::{Backend, MemoryBackend, open_backend};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::filter::{self, Filter, SortKey};
use crate::models::{Priority, Task, TaskId, TaskStats, next_created_at, normalize_title};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

struct State {
    tasks: Vec<Task>,
    next_id: TaskId,
    last_created_at: Option<DateTime<Utc>>,
    backend: Box<dyn Backend>,
}

/// Thread-safe task collection with write-through persistence
///
/// All operations serialize on one mutex. Mutations call the backend first
/// and only touch the in-memory collection once it succeeds, so a failed
/// call leaves no trace.
pub struct TaskStore {
    state: Mutex<State>,
}

impl TaskStore {
    /// Store that keeps tasks in memory only
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(State {
                tasks: Vec::new(),
                next_id: 1,
                last_created_at: None,
                backend: Box::new(MemoryBackend),
            }),
        }
    }

    /// Open a store over `backend`, recovering whatever it has persisted
    pub fn with_backend(mut backend: Box<dyn Backend>) -> Result<Self> {
        let snapshot = backend.load()?;
        let last_created_at = snapshot.tasks.iter().map(|t| t.created_at).max();

        info!(
            backend = backend.name(),
            count = snapshot.tasks.len(),
            next_id = snapshot.next_id,
            "Opened task store"
        );

        Ok(Self {
            state: Mutex::new(State {
                tasks: snapshot.tasks,
                next_id: snapshot.next_id.max(1),
                last_created_at,
                backend,
            }),
        })
    }

    /// Open the store described by `config`
    pub fn open(config: &Config) -> Result<Self> {
        let backend = open_backend(config.backend, &config.data_dir)?;
        Self::with_backend(backend)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State only changes after the fallible step, so a poisoned guard is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a task. The title is trimmed and must not be empty.
    pub fn create(&self, title: &str, priority: Priority, due_date: Option<NaiveDate>) -> Result<Task> {
        let title = normalize_title(title)?;

        let mut state = self.lock();
        let task = Task {
            id: state.next_id,
            title,
            priority,
            due_date,
            done: false,
            created_at: next_created_at(state.last_created_at),
        };

        state.backend.insert(&task)?;

        state.next_id += 1;
        state.last_created_at = Some(task.created_at);
        state.tasks.push(task.clone());

        debug!(id = task.id, priority = %task.priority, "create: task added");
        Ok(task)
    }

    /// Permanently delete a task
    pub fn delete(&self, id: TaskId) -> Result<()> {
        let mut state = self.lock();
        let index = Self::position(&state, id)?;

        state.backend.remove(id)?;
        state.tasks.remove(index);

        debug!(id, "delete: task removed");
        Ok(())
    }

    /// Flip a task's completion flag and return it as it is now
    pub fn toggle(&self, id: TaskId) -> Result<Task> {
        let mut state = self.lock();
        let index = Self::position(&state, id)?;

        let mut updated = state.tasks[index].clone();
        updated.done = !updated.done;

        state.backend.update(&updated)?;
        state.tasks[index] = updated.clone();

        debug!(id, done = updated.done, "toggle: task updated");
        Ok(updated)
    }

    /// Fetch a single task
    pub fn get(&self, id: TaskId) -> Result<Task> {
        let state = self.lock();
        let index = Self::position(&state, id)?;
        Ok(state.tasks[index].clone())
    }

    /// Filtered, sorted copy of the collection
    pub fn list(&self, filter: Filter, sort_by: SortKey) -> Vec<Task> {
        let state = self.lock();
        let tasks = filter::select(&state.tasks, filter, sort_by);
        debug!(%filter, %sort_by, count = tasks.len(), "list");
        tasks
    }

    /// Counts over the whole collection, independent of any filter
    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.lock().tasks)
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tasks.is_empty()
    }

    /// Name of the backend this store writes through to
    pub fn backend_name(&self) -> &'static str {
        self.lock().backend.name()
    }

    fn position(state: &State, id: TaskId) -> Result<usize> {
        state
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Snapshot;
    use crate::config::BackendKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    /// Backend whose writes fail while `fail` is set
    struct FlakyBackend {
        fail: Arc<AtomicBool>,
    }

    impl Backend for FlakyBackend {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn load(&mut self) -> eyre::Result<Snapshot> {
            Ok(Snapshot::default())
        }

        fn insert(&mut self, _task: &Task) -> eyre::Result<()> {
            self.check()
        }

        fn update(&mut self, _task: &Task) -> eyre::Result<()> {
            self.check()
        }

        fn remove(&mut self, _id: TaskId) -> eyre::Result<()> {
            self.check()
        }
    }

    impl FlakyBackend {
        fn check(&self) -> eyre::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(eyre::eyre!("simulated write failure"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_scenarios() {
        let store = TaskStore::in_memory();

        // 1
        let milk = store.create("Buy milk", Priority::Low, None).unwrap();
        assert_eq!(milk.id, 1);
        assert_eq!(milk.title, "Buy milk");
        assert_eq!(milk.priority, Priority::Low);
        assert!(!milk.done);
        assert_eq!(store.stats(), TaskStats { total: 1, active: 1, completed: 0 });

        // 2
        let rent = store.create("Pay rent", Priority::High, date(2024, 1, 1)).unwrap();
        assert_eq!(rent.id, 2);
        let toggled = store.toggle(1).unwrap();
        assert_eq!(toggled.id, 1);
        assert!(toggled.done);
        assert_eq!(store.stats(), TaskStats { total: 2, active: 1, completed: 1 });

        // 3
        let active = store.list(Filter::Active, SortKey::Priority);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 2);
        assert_eq!(active[0].priority, Priority::High);

        // 4
        store.delete(1).unwrap();
        assert!(store.toggle(1).unwrap_err().is_not_found());

        // 5
        assert!(store.create("", Priority::Medium, None).unwrap_err().is_validation());
    }

    #[test]
    fn test_create_trims_and_rejects_blank_titles() {
        let store = TaskStore::in_memory();
        for blank in ["", " ", "\t\n  "] {
            assert!(store.create(blank, Priority::Low, None).unwrap_err().is_validation());
        }
        assert!(store.is_empty());

        let task = store.create("  Walk dog  ", Priority::Low, None).unwrap();
        assert_eq!(task.title, "Walk dog");
    }

    #[test]
    fn test_created_at_strictly_increasing() {
        let store = TaskStore::in_memory();
        let tasks: Vec<Task> = (0..50)
            .map(|i| store.create(&format!("task {}", i), Priority::Low, None).unwrap())
            .collect();
        assert!(tasks.windows(2).all(|w| w[1].created_at > w[0].created_at));
        assert!(tasks.windows(2).all(|w| w[1].id > w[0].id));
        assert!(tasks.iter().all(|t| !t.done));
    }

    #[test]
    fn test_toggle_is_involution() {
        let store = TaskStore::in_memory();
        let task = store.create("Read book", Priority::Medium, date(2025, 6, 1)).unwrap();

        let once = store.toggle(task.id).unwrap();
        let twice = store.toggle(task.id).unwrap();
        assert!(once.done);
        assert_eq!(twice, task);
    }

    #[test]
    fn test_delete_then_anything_is_not_found() {
        let store = TaskStore::in_memory();
        let task = store.create("Temp", Priority::Low, None).unwrap();

        store.delete(task.id).unwrap();
        assert!(store.delete(task.id).unwrap_err().is_not_found());
        assert!(store.toggle(task.id).unwrap_err().is_not_found());
        assert!(store.get(task.id).unwrap_err().is_not_found());
        assert!(store.list(Filter::All, SortKey::CreatedAt).is_empty());
    }

    #[test]
    fn test_ids_never_reused() {
        let store = TaskStore::in_memory();
        let a = store.create("a", Priority::Low, None).unwrap();
        let b = store.create("b", Priority::Low, None).unwrap();
        store.delete(b.id).unwrap();
        store.delete(a.id).unwrap();

        let c = store.create("c", Priority::Low, None).unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn test_list_filters_and_stats_agree() {
        let store = TaskStore::in_memory();
        for i in 0..10 {
            let t = store.create(&format!("t{}", i), Priority::Low, None).unwrap();
            if i % 3 == 0 {
                store.toggle(t.id).unwrap();
            }
        }

        let stats = store.stats();
        assert_eq!(stats.total, stats.active + stats.completed);
        assert_eq!(stats.completed, 4);

        let all = store.list(Filter::All, SortKey::CreatedAt);
        let active = store.list(Filter::Active, SortKey::DueDate);
        let completed = store.list(Filter::Completed, SortKey::Priority);
        assert_eq!(all.len(), stats.total);
        assert_eq!(active.len(), stats.active);
        assert_eq!(completed.len(), stats.completed);
        assert!(active.iter().all(|t| !t.done));
        assert!(completed.iter().all(|t| t.done));
        // Newest first
        assert_eq!(all.first().unwrap().id, 10);
    }

    #[test]
    fn test_list_orders() {
        let store = TaskStore::in_memory();
        store.create("undated low", Priority::Low, None).unwrap();
        store.create("late high", Priority::High, date(2024, 12, 1)).unwrap();
        store.create("early medium", Priority::Medium, date(2024, 2, 1)).unwrap();

        let by_priority = store.list(Filter::All, SortKey::Priority);
        assert!(by_priority.windows(2).all(|w| w[0].priority >= w[1].priority));

        let by_due: Vec<TaskId> = store.list(Filter::All, SortKey::DueDate).iter().map(|t| t.id).collect();
        assert_eq!(by_due, vec![3, 2, 1]);
    }

    #[test]
    fn test_failed_write_has_no_effect() {
        let fail = Arc::new(AtomicBool::new(false));
        let store = TaskStore::with_backend(Box::new(FlakyBackend { fail: fail.clone() })).unwrap();
        assert_eq!(store.backend_name(), "flaky");

        let task = store.create("Stable", Priority::Low, None).unwrap();
        fail.store(true, Ordering::SeqCst);

        assert!(matches!(
            store.create("Lost", Priority::Low, None),
            Err(StoreError::Storage(_))
        ));
        assert!(matches!(store.toggle(task.id), Err(StoreError::Storage(_))));
        assert!(matches!(store.delete(task.id), Err(StoreError::Storage(_))));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(task.id).unwrap(), task);

        // The failed create did not consume an id
        fail.store(false, Ordering::SeqCst);
        assert_eq!(store.create("Next", Priority::Low, None).unwrap().id, 2);
    }

    #[test]
    fn test_concurrent_creates_and_reads() {
        let store = Arc::new(TaskStore::in_memory());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25 {
                        let task = store.create(&format!("{}-{}", t, i), Priority::Medium, None).unwrap();
                        if i % 2 == 0 {
                            store.toggle(task.id).unwrap();
                        }
                        let stats = store.stats();
                        assert_eq!(stats.total, stats.active + stats.completed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let all = store.list(Filter::All, SortKey::CreatedAt);
        assert_eq!(all.len(), 200);
        let mut ids: Vec<TaskId> = all.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 200);
        assert_eq!(store.stats().completed, 8 * 13);
    }

    fn reopen_round_trip(kind: BackendKind) {
        let temp = TempDir::new().unwrap();
        let config = Config {
            backend: kind,
            data_dir: temp.path().to_path_buf(),
            log_level: "info".to_string(),
        };

        let (kept, deleted) = {
            let store = TaskStore::open(&config).unwrap();
            let kept = store.create("Keep me", Priority::High, date(2024, 1, 1)).unwrap();
            let deleted = store.create("Drop me", Priority::Low, None).unwrap();
            store.toggle(kept.id).unwrap();
            store.delete(deleted.id).unwrap();
            (kept, deleted)
        };

        let store = TaskStore::open(&config).unwrap();
        assert_eq!(store.backend_name(), kind.to_string());
        let tasks = store.list(Filter::All, SortKey::CreatedAt);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, kept.id);
        assert_eq!(tasks[0].title, "Keep me");
        assert_eq!(tasks[0].created_at, kept.created_at);
        assert_eq!(tasks[0].due_date, kept.due_date);
        assert!(tasks[0].done);

        let fresh = store.create("After restart", Priority::Low, None).unwrap();
        assert!(fresh.id > deleted.id);
        assert!(fresh.created_at > kept.created_at);
    }

    #[test]
    fn test_jsonl_store_is_single_opener() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            backend: BackendKind::Jsonl,
            data_dir: temp.path().to_path_buf(),
            log_level: "info".to_string(),
        };

        let first = TaskStore::open(&config).unwrap();
        first.create("from first", Priority::Low, None).unwrap();
        assert!(matches!(TaskStore::open(&config), Err(StoreError::Storage(_))));

        first.create("also first", Priority::Low, None).unwrap();
        drop(first);

        let reopened = TaskStore::open(&config).unwrap();
        let titles: Vec<String> = reopened
            .list(Filter::All, SortKey::CreatedAt)
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["also first", "from first"]);
    }

    #[test]
    fn test_reopen_jsonl() {
        reopen_round_trip(BackendKind::Jsonl);
    }

    #[test]
    fn test_reopen_sqlite() {
        reopen_round_trip(BackendKind::Sqlite);
    }
}
