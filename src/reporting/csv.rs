//! CSV rendering: one row per relevant stack trace per job.
//!
//! Columns: `job,sanitizer,violation_kind,stack_trace_key,count`, where
//! `count` is how often that trace appeared in the job's reports. A report
//! without any trace contributes a row with an empty key.

use super::ReportSink;
use crate::aggregator::Aggregate;
use crate::error::Result;
use crate::types::SanitizerKind;
use std::collections::HashMap;
use std::io::Write;

pub const CSV_HEADER: &str = "job,sanitizer,violation_kind,stack_trace_key,count";

type RowKey<'a> = (SanitizerKind, &'a str, &'a str);

pub struct CsvSink<W: Write> {
    out: W,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for CsvSink<W> {
    fn deliver(&mut self, aggregate: Aggregate) -> Result<()> {
        self.out.write_all(render_csv(&aggregate).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

#[must_use]
pub fn render_csv(aggregate: &Aggregate) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for (job, reports) in &aggregate.by_job {
        let mut order: Vec<RowKey<'_>> = Vec::new();
        let mut counts: HashMap<RowKey<'_>, usize> = HashMap::new();
        for report in reports {
            let keys: Vec<&str> = if report.stack_trace_keys.is_empty() {
                vec![""]
            } else {
                report.stack_trace_keys.iter().map(String::as_str).collect()
            };
            for key in keys {
                let row = (report.sanitizer_kind, report.violation_kind.as_str(), key);
                let count = counts.entry(row).or_insert(0);
                if *count == 0 {
                    order.push(row);
                }
                *count += 1;
            }
        }

        for row in order {
            let (kind, violation, key) = row;
            let fields = [
                escape(job.as_str()),
                escape(kind.label()),
                escape(violation),
                escape(key),
                counts.get(&row).copied().unwrap_or(1).to_string(),
            ];
            out.push_str(&fields.join(","));
            out.push('\n');
        }
    }
    out
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
