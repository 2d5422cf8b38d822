//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::Priority;

/// te - priority task scheduling engine
#[derive(Parser)]
#[command(
    name = "te",
    about = "Run prioritized tasks with bounded concurrency, timeouts and retries",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the tasks in a YAML file to completion
    Run {
        /// Task file (a `tasks:` list of task descriptions)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Override engine.max_concurrent_tasks
        #[arg(short = 'j', long)]
        max_concurrent: Option<usize>,

        /// Priority (1-10) for tasks that don't set one
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Append engine events to this JSONL file
        #[arg(short, long, value_name = "FILE")]
        events: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Output format for run results
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s} (expected text or json)")),
        }
    }
}

/// Path of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskengine")
        .join("logs")
        .join("te.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "te",
            "-l",
            "debug",
            "run",
            "tasks.yml",
            "--format",
            "json",
            "-j",
            "3",
            "--priority",
            "8",
            "--events",
            "out.jsonl",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Run {
                file,
                format,
                max_concurrent,
                priority,
                events,
            } => {
                assert_eq!(file, PathBuf::from("tasks.yml"));
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(max_concurrent, Some(3));
                assert_eq!(priority, Some(Priority::new(8).unwrap()));
                assert_eq!(events, Some(PathBuf::from("out.jsonl")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_rejects_bad_priority() {
        assert!(Cli::try_parse_from(["te", "run", "tasks.yml", "--priority", "high"]).is_err());
        assert!(Cli::try_parse_from(["te", "run", "tasks.yml", "--priority", "11"]).is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_log_path_under_taskengine() {
        let path = get_log_path();
        assert!(path.ends_with("taskengine/logs/te.log"));
    }
}
