//! Basic task tracking
//!
//! Creates, completes, lists and deletes tasks against a JSONL-backed store
//! in a temporary directory, then reopens the store to show the tasks survive.
//!
//! Run with: cargo run --example basic_usage

use eyre::Result;
use tasktrack::{BackendKind, Config, TaskApi, TaskStore};

fn main() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let config = Config {
        backend: BackendKind::Jsonl,
        data_dir: temp_dir.path().to_path_buf(),
        log_level: "info".to_string(),
    };

    println!("tasktrack Basic Usage Example");
    println!("=============================\n");
    println!("Data dir: {}\n", config.data_dir.display());

    {
        let api = TaskApi::new(TaskStore::open(&config)?);

        println!("1. ADD - Creating tasks...");
        let milk = api.add_task("Buy milk", None, None)?;
        let rent = api.add_task("Pay rent", Some(2), Some("2024-01-01"))?;
        api.add_task("Call plumber", Some(1), Some("2024-03-15"))?;
        println!("   Created {} tasks\n", api.get_task_stats().total);

        println!("2. TOGGLE - Completing '{}'...", milk.title);
        let milk = api.toggle_task(milk.id)?;
        println!("   done = {}\n", milk.done);

        println!("3. LIST - Active tasks by priority...");
        for task in api.get_tasks("active", "priority")? {
            println!("   #{} {} ({})", task.id, task.title, task.priority);
        }
        println!();

        println!("4. VALIDATION - Empty title...");
        match api.add_task("   ", None, None) {
            Ok(_) => println!("   unexpectedly accepted"),
            Err(e) => println!("   rejected: {}\n", e),
        }

        println!("5. DELETE - Removing '{}'...", rent.title);
        api.delete_task(rent.id)?;
        match api.toggle_task(rent.id) {
            Ok(_) => println!("   unexpectedly still present"),
            Err(e) => println!("   toggle after delete: {}\n", e),
        }
    }

    println!("6. REOPEN - Loading the store again...");
    let api = TaskApi::new(TaskStore::open(&config)?);
    let stats = api.get_task_stats();
    println!(
        "   total = {}, active = {}, completed = {}",
        stats.total, stats.active, stats.completed
    );
    for task in api.get_tasks("all", "due_date")? {
        let due = task.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());
        println!("   #{} {} due {} done={}", task.id, task.title, due, task.done);
    }

    println!("\nExample complete!");
    Ok(())
}
