//! Report sinks: where the final [`Aggregate`] goes at build end.
//!
//! The core hands the aggregate over exactly once. Sinks decide how it is
//! rendered: colored console text, CSV rows, or JSON.

pub mod console;
pub mod csv;
pub mod json;
mod shared;

pub use console::{render_console, ConsoleSink};
pub use csv::{render_csv, CsvSink};
pub use json::{render_json, JsonSink};

use crate::aggregator::Aggregate;
use crate::config::OutputFormat;
use crate::error::Result;
use std::io::Write;

/// Receiver of the build-wide aggregate.
pub trait ReportSink {
    /// Takes ownership of the finished aggregate.
    ///
    /// # Errors
    /// Returns error if rendering or writing fails.
    fn deliver(&mut self, aggregate: Aggregate) -> Result<()>;
}

/// Keeps the delivered aggregate in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub delivered: Option<Aggregate>,
    pub deliveries: usize,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for MemorySink {
    fn deliver(&mut self, aggregate: Aggregate) -> Result<()> {
        self.deliveries += 1;
        self.delivered = Some(aggregate);
        Ok(())
    }
}

/// Builds the sink for `format`, writing to `out`.
#[must_use]
pub fn sink_for<W: Write + 'static>(format: OutputFormat, out: W) -> Box<dyn ReportSink> {
    match format {
        OutputFormat::Console => Box::new(ConsoleSink::new(out)),
        OutputFormat::Csv => Box::new(CsvSink::new(out)),
        OutputFormat::Json => Box::new(JsonSink::new(out)),
    }
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn deliver(&mut self, aggregate: Aggregate) -> Result<()> {
        (**self).deliver(aggregate)
    }
}
