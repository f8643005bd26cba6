// SQLite backend

use crate::backend::{Backend, Snapshot};
use crate::models::{DATE_FORMAT, Priority, Task, TaskId};
use chrono::{DateTime, NaiveDate};
use eyre::{Context, Result, eyre};
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SCHEMA_VERSION: i64 = 1;
const DB_FILE: &str = "tasks.db";

/// Backend storing tasks in `<dir>/tasks.db`
pub struct SqliteBackend {
    path: PathBuf,
    db: Connection,
}

impl SqliteBackend {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create store directory")?;

        let path = dir.join(DB_FILE);
        let db = Connection::open(&path).context("Failed to open SQLite database")?;

        let backend = Self { path, db };
        backend.create_schema()?;
        Ok(backend)
    }

    /// Backend over a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let backend = Self {
            path: PathBuf::from(":memory:"),
            db,
        };
        backend.create_schema()?;
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL CHECK (length(trim(title)) > 0),
                priority INTEGER NOT NULL CHECK (priority BETWEEN 0 AND 2),
                due_date TEXT,
                done INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_done ON tasks(done);

            -- Counters that must survive deletes (ids are never reused)
            CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            "#,
        )?;

        self.db
            .execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
            .context("Failed to set schema version")?;

        Ok(())
    }

    fn stored_next_id(&self) -> Result<Option<i64>> {
        let value = self
            .db
            .query_row("SELECT value FROM store_meta WHERE key = 'next_id'", [], |row| row.get(0))
            .optional()?;
        Ok(value)
    }
}

type TaskRow = (i64, String, i64, Option<String>, bool, i64);

fn sql_id(id: TaskId) -> Result<i64> {
    i64::try_from(id).map_err(|_| eyre!("Task id out of range: {}", id))
}

fn task_from_row(row: TaskRow) -> Result<Task> {
    let (id, title, priority, due_date, done, created_at) = row;

    let due_date = due_date
        .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).with_context(|| format!("Bad due_date for task {}", id)))
        .transpose()?;
    let created_at = DateTime::from_timestamp_micros(created_at)
        .ok_or_else(|| eyre!("Bad created_at for task {}: {}", id, created_at))?;

    Ok(Task {
        id: TaskId::try_from(id).map_err(|_| eyre!("Negative task id: {}", id))?,
        title,
        priority: Priority::try_from(priority).map_err(|e| eyre!("Task {}: {}", id, e))?,
        due_date,
        done,
        created_at,
    })
}

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn load(&mut self) -> Result<Snapshot> {
        let rows: Vec<TaskRow> = {
            let mut stmt = self
                .db
                .prepare("SELECT id, title, priority, due_date, done, created_at FROM tasks ORDER BY id")?;
            let rows = stmt.query_map([], |row| -> rusqlite::Result<TaskRow> {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let tasks = rows.into_iter().map(task_from_row).collect::<Result<Vec<_>>>()?;

        let after_last = tasks.last().map_or(1, |t| t.id + 1);
        let stored = self.stored_next_id()?.map_or(1, |v| v.max(1) as TaskId);
        let next_id = stored.max(after_last);

        info!(path = ?self.path, count = tasks.len(), next_id, "Loaded tasks from SQLite");
        Ok(Snapshot { tasks, next_id })
    }

    fn insert(&mut self, task: &Task) -> Result<()> {
        let id = sql_id(task.id)?;
        let tx = self.db.transaction()?;

        tx.execute(
            "INSERT INTO tasks (id, title, priority, due_date, done, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                id,
                task.title,
                u8::from(task.priority),
                task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
                task.done,
                task.created_at.timestamp_micros(),
            ],
        )
        .with_context(|| format!("Failed to insert task {}", task.id))?;

        tx.execute(
            "INSERT INTO store_meta (key, value) VALUES ('next_id', ?1)
             ON CONFLICT(key) DO UPDATE SET value = max(value, excluded.value)",
            [id + 1],
        )?;

        tx.commit()?;
        debug!(id = task.id, "sqlite: inserted");
        Ok(())
    }

    fn update(&mut self, task: &Task) -> Result<()> {
        let changed = self
            .db
            .execute(
                "UPDATE tasks SET title = ?2, priority = ?3, due_date = ?4, done = ?5 WHERE id = ?1",
                rusqlite::params![
                    sql_id(task.id)?,
                    task.title,
                    u8::from(task.priority),
                    task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    task.done,
                ],
            )
            .with_context(|| format!("Failed to update task {}", task.id))?;

        if changed == 0 {
            return Err(eyre!("Task {} missing from database", task.id));
        }
        debug!(id = task.id, "sqlite: updated");
        Ok(())
    }

    fn remove(&mut self, id: TaskId) -> Result<()> {
        let changed = self
            .db
            .execute("DELETE FROM tasks WHERE id = ?1", [sql_id(id)?])
            .with_context(|| format!("Failed to delete task {}", id))?;

        if changed == 0 {
            return Err(eyre!("Task {} missing from database", id));
        }
        debug!(id, "sqlite: deleted");
        Ok(())
    }
}
