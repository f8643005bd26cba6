// Append-only JSONL log backend

use crate::backend::{Backend, Snapshot};
use crate::models::{Task, TaskId};
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CURRENT_VERSION: u32 = 1;
const LOG_FILE: &str = "tasks.jsonl";
const LOCK_FILE: &str = ".lock";
const VERSION_FILE: &str = ".version";

/// One line of the task log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum LogEntry {
    /// Insert or overwrite the task with this id
    Put { task: Task },
    /// Tombstone; the id stays reserved
    Delete { id: TaskId },
}

/// Append one entry to a JSONL file under an exclusive lock
pub fn append_entry(path: &Path, entry: &LogEntry) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open JSONL file for appending")?;

    FileExt::lock_exclusive(&file).context("Failed to acquire file lock")?;

    let json = serde_json::to_string(entry).context("Failed to serialize log entry")?;
    writeln!(file, "{}", json)?;
    file.sync_all()?; // Ensure data is flushed to disk

    // Lock is released when file is dropped
    Ok(())
}

/// Drop a trailing partial line left by an interrupted append
///
/// Returns the number of bytes removed.
pub fn repair_tail(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .context("Failed to open JSONL file for repair")?;
    FileExt::lock_exclusive(&file).context("Failed to acquire file lock")?;

    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    if content.is_empty() || content.ends_with(b"\n") {
        return Ok(0);
    }

    let keep = content.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    let removed = (content.len() - keep) as u64;
    file.set_len(keep as u64).context("Failed to truncate partial log line")?;
    file.sync_all()?;

    warn!(file = ?path, bytes = removed, "Truncated partial trailing log line");
    Ok(removed)
}

// Best-effort id from a line that did not parse as a LogEntry
fn salvage_id(line: &str) -> Option<TaskId> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value
        .get("task")
        .and_then(|t| t.get("id"))
        .or_else(|| value.get("id"))
        .and_then(|id| id.as_u64())
}

/// Replay a JSONL log into the live collection
///
/// Entries apply in file order. Malformed lines are skipped with a warning,
/// but any id they still carry stays reserved. `next_id` is one past the
/// largest id seen, deleted ids included.
pub fn replay(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Ok(Snapshot::default());
    }

    let file = File::open(path).context("Failed to open JSONL file")?;
    FileExt::lock_shared(&file).context("Failed to acquire file lock")?;
    let reader = BufReader::new(file);

    let mut tasks: Vec<Task> = Vec::new();
    let mut max_id: TaskId = 0;

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to read line, skipping"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let entry: LogEntry = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(e) => {
                let salvaged = salvage_id(&line);
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    reserved_id = ?salvaged,
                    "Failed to parse log entry, skipping"
                );
                if let Some(id) = salvaged {
                    max_id = max_id.max(id);
                }
                continue;
            }
        };

        match entry {
            LogEntry::Put { task } => {
                max_id = max_id.max(task.id);
                match tasks.iter_mut().find(|t| t.id == task.id) {
                    Some(existing) => *existing = task,
                    None => tasks.push(task),
                }
            }
            LogEntry::Delete { id } => {
                max_id = max_id.max(id);
                tasks.retain(|t| t.id != id);
            }
        }
    }

    let next_id = max_id
        .checked_add(1)
        .ok_or_else(|| eyre!("Task id space exhausted in {}", path.display()))?;

    info!(file = ?path, count = tasks.len(), next_id, "Replayed task log");

    Ok(Snapshot { tasks, next_id })
}

fn check_version(dir: &Path) -> Result<()> {
    let version_path = dir.join(VERSION_FILE);
    if !version_path.exists() {
        fs::write(&version_path, CURRENT_VERSION.to_string()).context("Failed to write version file")?;
        return Ok(());
    }

    let raw = fs::read_to_string(&version_path).context("Failed to read version file")?;
    let version: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid version file: {:?}", raw.trim()))?;
    if version != CURRENT_VERSION {
        return Err(eyre!(
            "Unsupported store version {} (expected {})",
            version,
            CURRENT_VERSION
        ));
    }
    Ok(())
}

/// Backend writing every mutation to `<dir>/tasks.jsonl`
///
/// Holds an exclusive lock on `<dir>/.lock` for its whole lifetime so only
/// one store at a time hands out ids from a given directory.
#[derive(Debug)]
pub struct JsonlBackend {
    path: PathBuf,
    _lock: File,
}

impl JsonlBackend {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create store directory")?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))
            .context("Failed to open store lock file")?;
        FileExt::try_lock_exclusive(&lock)
            .with_context(|| format!("Task store at {} is already in use", dir.display()))?;

        check_version(dir)?;

        let path = dir.join(LOG_FILE);
        repair_tail(&path)?;

        Ok(Self { path, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for JsonlBackend {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn load(&mut self) -> Result<Snapshot> {
        replay(&self.path)
    }

    fn insert(&mut self, task: &Task) -> Result<()> {
        debug!(id = task.id, "jsonl: put");
        append_entry(&self.path, &LogEntry::Put { task: task.clone() })
    }

    fn update(&mut self, task: &Task) -> Result<()> {
        self.insert(task)
    }

    fn remove(&mut self, id: TaskId) -> Result<()> {
        debug!(id, "jsonl: delete");
        append_entry(&self.path, &LogEntry::Delete { id })
    }
}
