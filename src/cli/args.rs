use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OutputFormat;

#[derive(Parser)]
#[command(name = "sanitizer-reports", version, about = "Collect sanitizer reports from build and test logs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Config file (default: ./sanitizer-reports.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan job logs for sanitizer reports; each log file is one job
    Scan(ScanArgs),
    /// List the recognized sanitizers
    Kinds,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScanArgs {
    /// Log files to scan
    #[arg(value_name = "LOG", required_unless_present = "stdin")]
    pub logs: Vec<PathBuf>,
    /// Read standard input as the job `stdin`
    #[arg(long)]
    pub stdin: bool,
    /// Output format (overrides config)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// Write the report to a file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Bytes per chunk fed to the recognizer
    #[arg(long, default_value = "8192")]
    pub chunk_size: usize,
    /// Path fragment marking project stack frames (repeatable, overrides config)
    #[arg(long = "project-marker", value_name = "FRAGMENT")]
    pub project_markers: Vec<String>,
}
