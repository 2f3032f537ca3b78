//! Colored, human-readable rendering of the aggregate.
//!
//! One entry per unique fingerprint, in order of first appearance, followed
//! by the per-kind tally and the overall verdict.

use super::shared::{jobs_with, jobs_with_violations, pluralize};
use super::ReportSink;
use crate::aggregator::Aggregate;
use crate::error::Result;
use crate::types::SanitizerReport;
use colored::Colorize;
use std::fmt::Write as _;
use std::io::Write;

pub struct ConsoleSink<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn deliver(&mut self, aggregate: Aggregate) -> Result<()> {
        let text = render_console(&aggregate)?;
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Formats the aggregate for a terminal.
///
/// # Errors
/// Returns error if formatting fails.
pub fn render_console(aggregate: &Aggregate) -> Result<String> {
    let mut out = String::new();

    for (report, count) in aggregate.unique_reports() {
        write_entry(&mut out, aggregate, report, count)?;
    }
    write_summary(&mut out, aggregate)?;
    Ok(out)
}

fn write_entry(
    out: &mut String,
    aggregate: &Aggregate,
    report: &SanitizerReport,
    count: usize,
) -> Result<()> {
    let jobs = jobs_with(aggregate, report);
    let header = format!(
        "error: [{}] {} ({count} {} across {} {})",
        report.sanitizer_kind,
        report.violation_kind,
        pluralize("occurrence", count),
        jobs.len(),
        pluralize("job", jobs.len()),
    );
    writeln!(out, "{}", header.red().bold())?;

    let job_list: Vec<&str> = jobs.into_iter().collect();
    writeln!(out, "  {} {}", "-->".blue(), job_list.join(", "))?;
    writeln!(out, "   {} {} {}", "=".blue(), "summary:".cyan(), report.summary)?;
    for key in &report.stack_trace_keys {
        writeln!(out, "   {} {} {}", "=".blue(), "trace:".cyan(), key)?;
    }
    writeln!(
        out,
        "   {} {} {}",
        "=".blue(),
        "fingerprint:".dimmed(),
        report.fingerprint.short().dimmed()
    )?;
    if !report.complete {
        writeln!(
            out,
            "   {} {}",
            "=".blue(),
            "note: report was cut off before its end marker".yellow()
        )?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_summary(out: &mut String, aggregate: &Aggregate) -> Result<()> {
    if !aggregate.has_violations() {
        writeln!(out, "{} No sanitizer violations found.", "OK".green().bold())?;
        return Ok(());
    }

    let jobs = jobs_with_violations(aggregate);
    writeln!(
        out,
        "{} {} sanitizer {} found ({} unique) in {} {}",
        "FAILED".red().bold(),
        aggregate.total_count,
        pluralize("violation", aggregate.total_count),
        aggregate.unique_count,
        jobs,
        pluralize("job", jobs),
    )?;

    let width = aggregate.by_kind.keys().map(String::len).max().unwrap_or(0);
    for (kind, count) in &aggregate.by_kind {
        writeln!(out, "  {kind:<width$}  {count}")?;
    }
    Ok(())
}
