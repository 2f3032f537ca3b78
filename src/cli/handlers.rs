// src/cli/handlers.rs
use crate::cli::args::ScanArgs;
use crate::config::ReportConfig;
use crate::exit::ReportExit;
use crate::monitor::BuildMonitor;
use crate::recognizer::{RuleSet, Terminator};
use crate::reporting;
use crate::types::JobId;
use anyhow::{Context, Result};
use colored::Colorize;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Log file name colcon writes per package; the job is its directory.
const COLCON_LOG_NAME: &str = "stdout_stderr.log";

/// Handles the scan command.
///
/// # Errors
/// Returns error if config loading, monitor setup or report delivery fails.
pub fn handle_scan(args: &ScanArgs, config_path: Option<&Path>) -> Result<ReportExit> {
    let config = load_config(args, config_path)?;
    let monitor = BuildMonitor::new(&config).context("failed to build sanitizer rules")?;
    let chunk_size = args.chunk_size.max(1);

    let jobs = assign_job_ids(&args.logs);
    let failures: Vec<PathBuf> = jobs
        .par_iter()
        .filter_map(|(job, path)| {
            let result = File::open(path)
                .with_context(|| format!("cannot open {}", path.display()))
                .and_then(|file| feed_job(&monitor, job, file, chunk_size));
            match result {
                Ok(()) => None,
                Err(e) => {
                    eprintln!("{} {e:#}", "error:".red().bold());
                    Some(path.clone())
                }
            }
        })
        .collect();

    if args.stdin {
        feed_job(&monitor, &JobId::new("stdin"), io::stdin().lock(), chunk_size)?;
    }

    let format = args.format.unwrap_or(config.output.format);
    let output = args
        .output
        .clone()
        .or_else(|| config.output.path.as_ref().map(PathBuf::from));
    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut sink = reporting::sink_for(format, writer);
    let aggregate = monitor
        .on_build_end(&mut sink)
        .context("failed to deliver sanitizer report")?;

    let exit = ReportExit::for_aggregate(&aggregate);
    if exit == ReportExit::Success && !failures.is_empty() {
        return Ok(ReportExit::InvalidInput);
    }
    Ok(exit)
}

/// Prints the recognized sanitizer kinds.
///
/// # Errors
/// Returns error if the built-in rules fail to compile.
pub fn handle_kinds() -> Result<ReportExit> {
    let rules = RuleSet::builtin()?;
    for rule in rules.rules() {
        let end = match &rule.terminator {
            Terminator::AtSummary => "summary line",
            Terminator::Trailer { continues: Some(_), .. } => "trailer after summary",
            Terminator::Trailer { continues: None, .. } => "separator after summary",
        };
        println!(
            "{:<6} {:<28} ends at {}",
            rule.kind.label().bold(),
            rule.kind.tool_name(),
            end.dimmed()
        );
    }
    Ok(ReportExit::Success)
}

fn load_config(args: &ScanArgs, config_path: Option<&Path>) -> Result<ReportConfig> {
    let mut config = match config_path {
        Some(path) => ReportConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ReportConfig::load().context("failed to load sanitizer-reports.toml")?,
    };
    if !args.project_markers.is_empty() {
        config.frames.project_markers.clone_from(&args.project_markers);
    }
    Ok(config)
}

/// Streams one job's output through the monitor.
fn feed_job(monitor: &BuildMonitor, job: &JobId, mut reader: impl Read, chunk_size: usize) -> Result<()> {
    monitor.on_job_start(job.clone())?;
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // Keep what was read; the job still gets closed.
                monitor.on_job_end(job)?;
                return Err(e).with_context(|| format!("failed reading output of job {job}"));
            }
        };
        monitor.on_job_output(job, &buf[..n])?;
    }
    let summary = monitor.on_job_end(job)?;
    debug!(job = %job, lines = summary.lines, reports = summary.reports, "job scanned");
    Ok(())
}

/// Derives a job id per log file, keeping ids unique.
#[must_use]
pub fn assign_job_ids(paths: &[PathBuf]) -> Vec<(JobId, PathBuf)> {
    let mut used = HashSet::new();
    paths
        .iter()
        .map(|path| {
            let mut id = job_name(path);
            if !used.insert(id.clone()) {
                id = path.display().to_string();
                used.insert(id.clone());
            }
            (JobId::new(id), path.clone())
        })
        .collect()
}

fn job_name(path: &Path) -> String {
    let file_name = path.file_name().and_then(|n| n.to_str());
    if file_name == Some(COLCON_LOG_NAME) {
        if let Some(dir) = path.parent().and_then(Path::file_name).and_then(|n| n.to_str()) {
            return dir.to_string();
        }
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map_or_else(|| path.display().to_string(), ToString::to_string)
}
