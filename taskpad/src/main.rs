//! `Taskpad`: personal task tracker.
//!
//! Talks to a task service when a base URL is configured, otherwise runs in
//! local mode against an in-process collaborator persisted through the task
//! cache. Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskpad/config.toml`).
//!
//! ```bash
//! # Local mode
//! cargo run --bin taskpad -- add "Water plants" --tag home --due 2024-06-01
//! cargo run --bin taskpad -- list --status overdue
//!
//! # Against a task service
//! cargo run --bin taskpad -- --base-url http://127.0.0.1:8080 --user alice watch
//! ```

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskpad::cache::{JsonFileCache, TaskCache};
use taskpad::config::command::ListArgs;
use taskpad::config::{CliArgs, ClientConfig, Command};
use taskpad::notify::{ConsoleNotifier, Notifier, Permission};
use taskpad::remote::RemoteTasks;
use taskpad::remote::http::HttpRemote;
use taskpad::remote::memory::InMemoryRemote;
use taskpad::session::Session;
use taskpad::tasks::share::share_text;
use taskpad::tasks::{TaskError, TaskStore, view};
use taskpad_proto::task::{Task, TaskId};

/// Failures that end a command.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("could not read confirmation: {0}")]
    Prompt(#[from] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file so stdout stays clean for command output.
    let _log_guard = init_logging(&config.log_level, &config.log_file);

    let service_url = match config.service_url() {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let command = cli
        .command
        .unwrap_or_else(|| Command::List(ListArgs::default()));

    let result = if let Some(url) = service_url {
        tracing::info!(url = %url, user_id = %config.user_id, "using task service");
        let remote = HttpRemote::new(url, config.request_timeout);
        run(build_store(remote, &config), command, &config).await
    } else {
        tracing::info!(user_id = %config.user_id, "running in local mode");
        let remote = local_remote(&config);
        run(build_store(remote, &config), command, &config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::warn!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, log_path: &Path) -> Option<WorkerGuard> {
    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn build_store<R: RemoteTasks>(remote: R, config: &ClientConfig) -> TaskStore<R> {
    let store = TaskStore::new(remote, config.user_id.clone());
    match &config.cache_path {
        Some(path) => store.with_cache(JsonFileCache::new(path)),
        None => store,
    }
}

/// In-process collaborator seeded with the cached collection.
fn local_remote(config: &ClientConfig) -> InMemoryRemote {
    let remote = InMemoryRemote::new();
    let Some(path) = &config.cache_path else {
        return remote;
    };
    match JsonFileCache::new(path).load(&config.user_id) {
        Ok(Some(tasks)) => remote.seed(&config.user_id, tasks),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable task cache"),
    }
    remote
}

async fn run<R: RemoteTasks + 'static>(
    store: TaskStore<R>,
    command: Command,
    config: &ClientConfig,
) -> Result<(), AppError> {
    let store = Arc::new(store);
    if let Err(e) = store.load(&config.user_id).await {
        // Fall back to the last known collection when the service is down.
        match store.restore_from_cache() {
            Ok(count) if count > 0 => eprintln!("{e}; showing {count} cached task(s)"),
            _ => return Err(e.into()),
        }
    }
    let now = Utc::now();

    match command {
        Command::List(args) => {
            let tasks = store.snapshot();
            let view = view::derive(&tasks, &args.filter(), now);
            for task in &view.tasks {
                println!("{}", task_line(task, now));
            }
            println!(
                "{} shown | {} total, {} completed, {} upcoming, {} overdue",
                view.tasks.len(),
                view.stats.total,
                view.stats.completed,
                view.stats.upcoming,
                view.stats.overdue
            );
        }
        Command::Stats => {
            let stats = view::stats(&store.snapshot(), now);
            println!("total:     {}", stats.total);
            println!("completed: {}", stats.completed);
            println!("upcoming:  {}", stats.upcoming);
            println!("overdue:   {}", stats.overdue);
        }
        Command::Tags => {
            let tasks = store.snapshot();
            println!("tags:       {}", view::all_tags(&tasks).join(", "));
            println!("categories: {}", view::all_categories(&tasks).join(", "));
        }
        Command::Add(args) => {
            let mut draft = args.to_draft();
            let task = draft.submit(&store).await?;
            println!("created {}", task_line(&task, now));
        }
        Command::Toggle { id } => {
            let task = store.toggle_completion(&TaskId::new(id)).await?;
            println!("{}", task_line(&task, now));
        }
        Command::Edit(args) => {
            let task = store.update(&TaskId::new(args.id.clone()), args.to_patch()).await?;
            println!("{}", task_line(&task, now));
        }
        Command::Delete { id, yes } => {
            let id = TaskId::new(id);
            let task = store.get(&id).ok_or_else(|| TaskError::NotFound(id.clone()))?;
            if !yes && !confirm(&format!("Delete \"{}\"?", task.title))? {
                println!("cancelled");
                return Ok(());
            }
            store.delete(&id).await?;
            println!("deleted {id}");
        }
        Command::Share { id } => {
            let id = TaskId::new(id);
            let task = store.get(&id).ok_or(TaskError::NotFound(id))?;
            println!("{}", share_text(&task));
        }
        Command::Watch => watch(&store, config).await,
    }
    Ok(())
}

/// Runs reminders until Ctrl-C, refreshing the collection every poll interval.
async fn watch<R: RemoteTasks + 'static>(store: &Arc<TaskStore<R>>, config: &ClientConfig) {
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(Permission::Granted));
    let session = Session::start(Arc::clone(store), notifier, config.reminders);
    println!(
        "watching {} task(s) for reminders, press Ctrl-C to stop",
        store.len()
    );

    let period = config.reminders.poll_interval.max(Duration::from_secs(1));
    let mut refresh = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                }
                break;
            }
            _ = refresh.tick() => {
                if let Err(e) = store.load(&config.user_id).await {
                    tracing::warn!(error = %e, "refresh failed, keeping previous tasks");
                }
            }
        }
    }
    session.end().await;
}

/// Asks a yes/no question on stdin. Anything but `y`/`yes` declines.
fn confirm(question: &str) -> io::Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{question} [y/N] ")?;
    stdout.flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn task_line(task: &Task, now: DateTime<Utc>) -> String {
    let mark = if task.completed { "x" } else { " " };
    let mut line = format!("[{mark}] {}  {} ({})", task.id, task.title, task.priority);
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due.format("%Y-%m-%d")));
        if task.is_overdue(now) {
            line.push_str(" OVERDUE");
        }
    }
    if let Some(category) = &task.category {
        line.push_str(&format!(" @{category}"));
    }
    for tag in &task.tags {
        line.push_str(&format!(" #{tag}"));
    }
    line
}
