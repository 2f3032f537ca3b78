// src/recognizer/mod.rs
//! Per-job state machine that cuts sanitizer report blocks out of a line
//! stream.
//!
//! States: `Idle` (ordinary output is discarded), `InReport` (at least one
//! block is open), `Done` (the job was closed). With prefix stripping on,
//! every log prefix (`[talker-1] `) has its own open block, so writers that
//! interleave their reports do not cut each other off. A start marker under a
//! prefix that already has an open block emits that block first. Closing the
//! job flushes all open blocks instead of dropping them.

pub mod rules;

pub use rules::{RuleSet, SanitizerRule, StartMatch, Terminator, TraceRule};

use crate::config::RecognizerConfig;
use crate::error::{ReportError, Result};
use crate::types::{JobId, RawLine, SanitizerKind};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerState {
    Idle,
    InReport,
    Done,
}

/// Lines of one sanitizer report, with the log prefix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub job: JobId,
    pub kind: SanitizerKind,
    /// Index of the matching rule in the recognizer's `RuleSet`.
    pub rule: usize,
    pub prefix: String,
    pub lines: Vec<String>,
    pub first_seq: u64,
    pub last_seq: u64,
    /// Index into `lines` of the summary line, if one was seen.
    pub summary_index: Option<usize>,
    /// True when the kind's end condition closed the block, or when it was
    /// interrupted after its summary line.
    pub complete: bool,
    /// Set once a line outside the report body was seen; later body lines are
    /// not stored.
    pub sealed: bool,
    /// Lines past the per-block cap that were not stored.
    pub dropped_lines: usize,
}

impl RawBlock {
    #[must_use]
    pub fn header(&self) -> &str {
        self.lines.first().map_or("", String::as_str)
    }

    #[must_use]
    pub fn summary_line(&self) -> Option<&str> {
        self.summary_index
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// What to do with the open block after looking at one line.
enum Step {
    Keep,
    Close { consume: bool },
}

#[derive(Debug)]
pub struct Recognizer {
    job: JobId,
    rules: Arc<RuleSet>,
    config: RecognizerConfig,
    /// At most one block per prefix, in opening order.
    open: Vec<RawBlock>,
    done: bool,
}

impl Recognizer {
    #[must_use]
    pub fn new(job: JobId, rules: Arc<RuleSet>, config: RecognizerConfig) -> Self {
        Self {
            job,
            rules,
            config,
            open: Vec::new(),
            done: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> RecognizerState {
        if self.done {
            RecognizerState::Done
        } else if self.open.is_empty() {
            RecognizerState::Idle
        } else {
            RecognizerState::InReport
        }
    }

    #[must_use]
    pub fn open_blocks(&self) -> usize {
        self.open.len()
    }

    /// Advances the state machine by one line and returns finished blocks.
    ///
    /// # Errors
    /// Returns `JobClosed` after `finish`.
    pub fn push_line(&mut self, line: &RawLine) -> Result<Vec<RawBlock>> {
        if self.done {
            return Err(ReportError::JobClosed(self.job.clone()));
        }

        let text = line.text.trim_end();
        let mut finished = Vec::new();

        if let Some(start) = self.rules.match_start(text) {
            let block = self.open_block(&start, text, line.seq);
            if let Some(idx) = self.open.iter().position(|b| b.prefix == block.prefix) {
                let mut prev = self.open.remove(idx);
                prev.complete = prev.summary_index.is_some();
                debug!(
                    job = %self.job,
                    kind = %prev.kind,
                    complete = prev.complete,
                    "report interrupted by a new report"
                );
                finished.push(prev);
            }
            self.open.push(block);
            return Ok(finished);
        }

        // Lines under no open prefix are interleaved output from another writer.
        let Some(idx) = self.owner(text) else {
            return Ok(finished);
        };
        let Some(rule) = self.rules.rule(self.open[idx].rule) else {
            return Ok(finished);
        };
        let block = &mut self.open[idx];
        let body = &text[block.prefix.len()..];
        let step = advance(block, rule, body, line.seq, self.config.max_block_lines);

        if let Step::Close { consume } = step {
            let mut block = self.open.remove(idx);
            block.complete = true;
            if consume {
                block.last_seq = line.seq;
            }
            finished.push(block);
        }
        Ok(finished)
    }

    /// Closes the job. Blocks without their end condition are returned as
    /// incomplete, in opening order.
    ///
    /// # Errors
    /// Returns `JobClosed` if called twice.
    pub fn finish(&mut self) -> Result<Vec<RawBlock>> {
        if self.done {
            return Err(ReportError::JobClosed(self.job.clone()));
        }
        self.done = true;
        Ok(std::mem::take(&mut self.open))
    }

    /// Open block with the longest prefix `text` starts with.
    fn owner(&self, text: &str) -> Option<usize> {
        self.open
            .iter()
            .enumerate()
            .filter(|(_, block)| text.starts_with(block.prefix.as_str()))
            .max_by_key(|(_, block)| block.prefix.len())
            .map(|(idx, _)| idx)
    }

    fn open_block(&self, start: &StartMatch, text: &str, seq: u64) -> RawBlock {
        let (prefix, header) = if self.config.strip_prefixes {
            (start.prefix.clone(), &text[start.prefix.len()..])
        } else {
            (String::new(), text)
        };
        RawBlock {
            job: self.job.clone(),
            kind: start.kind,
            rule: start.rule,
            prefix,
            lines: vec![header.to_string()],
            first_seq: seq,
            last_seq: seq,
            summary_index: None,
            complete: false,
            sealed: false,
            dropped_lines: 0,
        }
    }
}

fn advance(block: &mut RawBlock, rule: &SanitizerRule, body: &str, seq: u64, cap: usize) -> Step {
    if block.summary_index.is_none() {
        if rule.summary.is_match(body) {
            // The summary is stored even past the cap.
            block.lines.push(body.to_string());
            block.summary_index = Some(block.lines.len() - 1);
            block.last_seq = seq;
            return match rule.terminator {
                Terminator::AtSummary => Step::Close { consume: true },
                Terminator::Trailer { .. } => Step::Keep,
            };
        }
        if block.sealed {
            return Step::Keep;
        }
        if rule.is_body_line(body) {
            store(block, body, cap);
            block.last_seq = seq;
        } else {
            debug!(job = %block.job, kind = %block.kind, line = seq, "report body ended by foreign output");
            block.sealed = true;
        }
        return Step::Keep;
    }

    match &rule.terminator {
        Terminator::AtSummary => Step::Close { consume: false },
        Terminator::Trailer { continues, ends } => {
            if ends.is_match(body) {
                store(block, body, cap);
                Step::Close { consume: true }
            } else if continues.as_ref().is_some_and(|re| re.is_match(body)) {
                store(block, body, cap);
                block.last_seq = seq;
                Step::Keep
            } else {
                Step::Close { consume: false }
            }
        }
    }
}

fn store(block: &mut RawBlock, body: &str, cap: usize) {
    if block.lines.len() < cap {
        block.lines.push(body.to_string());
        return;
    }
    if block.dropped_lines == 0 {
        warn!(job = %block.job, kind = %block.kind, cap, "report exceeds line cap; dropping further lines");
    }
    block.dropped_lines += 1;
}
