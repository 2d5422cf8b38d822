//! te - priority task scheduling engine
//!
//! CLI entry point for running task files through the engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use tracing::{debug, info};

use taskengine::cli::{Cli, Command, OutputFormat, get_log_path};
use taskengine::config::Config;
use taskengine::domain::{Priority, Task, TaskDescription, TaskStatus};
use taskengine::events::spawn_event_logger;
use taskengine::executor::CommandExecutor;
use taskengine::scheduler::{TaskEngine, TaskStats};

/// Task file layout for `te run`
#[derive(Debug, Deserialize)]
struct TaskFile {
    tasks: Vec<TaskDescription>,
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            file,
            format,
            max_concurrent,
            priority,
            events,
        } => {
            debug!(?file, ?format, ?max_concurrent, ?priority, ?events, "main: matched Run command");
            cmd_run(config, &file, format, max_concurrent, priority, events).await
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

/// Load the task descriptions from a YAML task file
fn load_task_file(path: &Path) -> Result<Vec<TaskDescription>> {
    debug!(?path, "load_task_file: called");
    let content = fs::read_to_string(path).context(format!("Failed to read task file {}", path.display()))?;
    let file: TaskFile =
        serde_yaml::from_str(&content).context(format!("Failed to parse task file {}", path.display()))?;
    debug!(count = file.tasks.len(), "load_task_file: loaded tasks");
    Ok(file.tasks)
}

/// Run every task in `file` to a terminal state and report the outcomes
async fn cmd_run(
    mut config: Config,
    file: &Path,
    format: OutputFormat,
    max_concurrent: Option<usize>,
    priority: Option<Priority>,
    events: Option<PathBuf>,
) -> Result<()> {
    debug!(?file, "cmd_run: called");
    let descriptions = load_task_file(file)?;

    if let Some(n) = max_concurrent {
        debug!(n, "cmd_run: overriding max_concurrent_tasks");
        config.engine.max_concurrent_tasks = n;
    }
    if let Some(p) = priority {
        debug!(%p, "cmd_run: overriding default_priority");
        config.engine.default_priority = p;
    }

    // Relative `cwd` options resolve against the task file's directory
    let mut executor = CommandExecutor::new();
    if let Some(dir) = file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        executor = executor.with_working_dir(dir);
    }

    let engine = TaskEngine::spawn(config.engine.clone(), Arc::new(executor)).context("Failed to start engine")?;
    let logger = events.map(|path| {
        info!(?path, "cmd_run: writing event log");
        spawn_event_logger(engine.events(), path)
    });

    let mut ids = Vec::with_capacity(descriptions.len());
    let mut handles = Vec::with_capacity(descriptions.len());
    for description in descriptions {
        let handle = engine.submit_task(description).await.context("Failed to submit task")?;
        ids.push(handle.id().to_string());
        handles.push(handle);
    }
    info!(count = handles.len(), "cmd_run: submitted tasks");

    let outcomes = futures::future::join_all(handles).await;
    debug!(count = outcomes.len(), "cmd_run: all handles resolved");

    let mut tasks = Vec::with_capacity(ids.len());
    for id in &ids {
        if let Some(task) = engine.get_task(id).await {
            tasks.push(task);
        }
    }
    let stats = engine.task_stats().await;

    engine.stop_all_tasks().await;
    drop(engine);
    if let Some(logger) = logger {
        logger.await.context("Event logger task failed")?;
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({ "tasks": tasks, "stats": stats });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => print_text_report(&tasks, &stats),
    }

    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    if failed > 0 {
        return Err(eyre!("{} of {} task(s) failed", failed, outcomes.len()));
    }
    Ok(())
}

fn print_text_report(tasks: &[Task], stats: &TaskStats) {
    for task in tasks {
        match task.status {
            TaskStatus::Completed => {
                let stdout = task
                    .result
                    .as_ref()
                    .and_then(|result| result.get("stdout"))
                    .and_then(|stdout| stdout.as_str())
                    .unwrap_or_default();
                println!(
                    "{} {} {} ({} attempt(s))",
                    "✓".green(),
                    task.id.cyan(),
                    task.description,
                    task.attempts
                );
                for line in stdout.lines() {
                    println!("    {}", line.dimmed());
                }
            }
            _ => {
                let error = task.error.as_ref().map(|e| e.to_string()).unwrap_or_default();
                println!(
                    "{} {} {} ({} attempt(s)): {}",
                    "✗".red(),
                    task.id.cyan(),
                    task.description,
                    task.attempts,
                    error.yellow()
                );
            }
        }
    }

    println!();
    println!("Task Stats");
    println!("----------");
    println!("Submitted: {}", stats.total_submitted);
    println!("Completed: {}", stats.total_completed);
    println!("Failed:    {}", stats.total_failed);
    println!("Retried:   {}", stats.total_retried);
    println!("Peak active: {}", stats.peak_active);
    println!("Avg processing: {:.1}ms", stats.average_processing_time_ms);
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}
