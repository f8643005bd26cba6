use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tasktrack::{BackendKind, Config, Priority, Task, TaskApi, TaskId, TaskStats, TaskStore};

#[derive(Parser)]
#[command(name = "tasktrack")]
#[command(about = "Personal task tracker - add, complete and list your to-dos")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Config file (default: <config dir>/tasktrack/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Persistence backend: memory, jsonl or sqlite
    #[arg(short, long, global = true)]
    backend: Option<BackendKind>,

    /// Directory holding the task data
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level for stderr diagnostics (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Priority: low, medium, high (or 0, 1, 2)
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },

    /// Delete a task permanently
    Delete { id: TaskId },

    /// Flip a task between active and completed
    Toggle { id: TaskId },

    /// Show a single task
    Show { id: TaskId },

    /// List tasks
    List {
        /// all, active or completed
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// created_at, priority or due_date
        #[arg(short, long, default_value = "created_at")]
        sort: String,
    },

    /// Show task counts
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }

    // Setup tracing; stdout is reserved for command output
    let level: tracing::Level = config
        .log_level
        .parse()
        .with_context(|| format!("Invalid log level: {}", config.log_level))?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let api = TaskApi::new(TaskStore::open(&config)?);

    match cli.command {
        Commands::Add { title, priority, due } => {
            let priority = priority.map(|p| i64::from(u8::from(p)));
            let task = api.add_task(&title, priority, due.as_deref())?;
            if cli.json {
                print_json(&task)?;
            } else {
                println!("Added task {}", task.id);
                print_task(&task);
            }
        }
        Commands::Delete { id } => {
            api.delete_task(id)?;
            if cli.json {
                print_json(&serde_json::json!({ "id": id, "deleted": true }))?;
            } else {
                println!("Deleted task {}", id);
            }
        }
        Commands::Toggle { id } => {
            let task = api.toggle_task(id)?;
            if cli.json {
                print_json(&task)?;
            } else {
                print_task(&task);
            }
        }
        Commands::Show { id } => {
            let task = api.store().get(id)?;
            if cli.json {
                print_json(&task)?;
            } else {
                print_task(&task);
            }
        }
        Commands::List { filter, sort } => {
            let tasks = api.get_tasks(&filter, &sort)?;
            if cli.json {
                print_json(&tasks)?;
            } else if tasks.is_empty() {
                println!("{}", "No tasks".dimmed());
            } else {
                tasks.iter().for_each(print_task);
            }
        }
        Commands::Stats => {
            let stats = api.get_task_stats();
            if cli.json {
                print_json(&stats)?;
            } else {
                print_stats(&stats);
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_task(task: &Task) {
    let check = if task.done { "[x]".green() } else { "[ ]".normal() };
    let priority = match task.priority {
        Priority::High => task.priority.as_str().red().bold(),
        Priority::Medium => task.priority.as_str().yellow(),
        Priority::Low => task.priority.as_str().normal(),
    };
    let title = if task.done {
        task.title.dimmed().strikethrough()
    } else {
        task.title.normal()
    };
    let due = task
        .due_date
        .map(|d| format!(" due {}", d))
        .unwrap_or_default();

    println!("{} {:>4}  {}  ({}{})", check, format!("#{}", task.id).cyan(), title, priority, due);
}

fn print_stats(stats: &TaskStats) {
    println!("Total:     {}", stats.total.to_string().bold());
    println!("Active:    {}", stats.active.to_string().yellow());
    println!("Completed: {}", stats.completed.to_string().green());
}
