use super::ReportSink;
use crate::aggregator::Aggregate;
use crate::error::Result;
use std::io::Write;

pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn deliver(&mut self, aggregate: Aggregate) -> Result<()> {
        let json = render_json(&aggregate)?;
        writeln!(self.out, "{json}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Pretty-printed JSON of the whole aggregate.
///
/// # Errors
/// Returns error if serialization fails.
pub fn render_json(aggregate: &Aggregate) -> Result<String> {
    Ok(serde_json::to_string_pretty(aggregate)?)
}
