// src/classifier/mod.rs
//! Turns raw report blocks into structured [`SanitizerReport`]s.
//!
//! Classification never fails: a block without a summary line is reported
//! with violation kind `unknown` and the best summary the block offers.

pub mod fingerprint;

pub use fingerprint::Normalizer;

use crate::config::{FingerprintConfig, FrameConfig};
use crate::recognizer::{RawBlock, RuleSet, TraceRule};
use crate::types::{SanitizerKind, SanitizerReport, UNKNOWN_VIOLATION};
use regex::Regex;
use std::sync::{Arc, LazyLock};

static FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\d+\s+(?:0x[0-9a-fA-F]+\s+)?(?:in\s+)?(?P<key>\S.*?)\s*$")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Arc<RuleSet>,
    normalizer: Normalizer,
    frames: FrameConfig,
}

impl Classifier {
    #[must_use]
    pub fn new(rules: Arc<RuleSet>, fingerprint: FingerprintConfig, frames: FrameConfig) -> Self {
        Self {
            rules,
            normalizer: Normalizer::new(fingerprint),
            frames,
        }
    }

    #[must_use]
    pub fn classify(&self, block: RawBlock) -> SanitizerReport {
        let rule = self.rules.rule(block.rule);
        let sanitizer_kind = rule.map_or(SanitizerKind::Unknown, |r| r.kind);
        let error_name = rule.and_then(|r| r.error_name(block.header()));

        let summary_text = block
            .summary_line()
            .and_then(|line| rule.and_then(|r| r.summary_text(line)));

        let (violation_kind, summary) = match summary_text {
            Some(text) => {
                let name = error_name
                    .or_else(|| text.split_whitespace().next())
                    .unwrap_or(UNKNOWN_VIOLATION);
                (name.to_string(), text.to_string())
            }
            None => (UNKNOWN_VIOLATION.to_string(), fallback_summary(&block)),
        };

        let trace_rule = error_name.and_then(|name| self.rules.trace_rule(name));
        let stack_trace_keys = self.stack_trace_keys(trace_rule, &block.lines);
        let raw_text = block.text();
        let fingerprint = self.normalizer.fingerprint(&raw_text);

        SanitizerReport {
            sanitizer_kind,
            violation_kind,
            summary,
            job: block.job,
            raw_text,
            fingerprint,
            stack_trace_keys,
            complete: block.complete,
        }
    }

    /// Keys of the relevant stack traces, in report order.
    fn stack_trace_keys(&self, rule: Option<&TraceRule>, lines: &[String]) -> Vec<String> {
        let wanted = rule.map_or(1, |r| r.begins.len());
        let mut keys = Vec::new();

        for part in parts(lines) {
            let mut found = 0;
            let mut trace: Option<Vec<&str>> = None;
            for line in part {
                if let Some(frames) = trace.as_mut() {
                    if FRAME_RE.is_match(line) {
                        frames.push(line.as_str());
                        continue;
                    }
                }
                if let Some(frames) = trace.take() {
                    // A trace header without frames does not count.
                    if let Some(key) = self.trace_key(&frames) {
                        keys.push(key);
                        found += 1;
                        if found == wanted {
                            break;
                        }
                    }
                }
                let begins = rule.map_or(true, |r| r.begins.get(found).is_some_and(|re| re.is_match(line)));
                if begins {
                    trace = Some(Vec::new());
                }
            }
            if let Some(key) = trace.and_then(|frames| self.trace_key(&frames)) {
                keys.push(key);
            }
        }
        keys
    }

    /// First frame naming project code, or the first frame at all.
    fn trace_key(&self, frames: &[&str]) -> Option<String> {
        let candidates: Vec<&str> = frames
            .iter()
            .filter_map(|line| FRAME_RE.captures(line))
            .filter_map(|caps| caps.name("key"))
            .map(|m| m.as_str())
            .collect();

        let markers = &self.frames.project_markers;
        let chosen = candidates
            .iter()
            .find(|frame| markers.iter().any(|m| frame.contains(m.as_str())))
            .or_else(|| candidates.first())?;

        Some(self.normalizer.normalize(chosen))
    }
}

/// Splits a report into parts, each starting at a non-indented line.
fn parts(lines: &[String]) -> Vec<&[String]> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, line) in lines.iter().enumerate() {
        if idx > start && line.starts_with(|c: char| !c.is_whitespace()) {
            parts.push(&lines[start..idx]);
            start = idx;
        }
    }
    if start < lines.len() {
        parts.push(&lines[start..]);
    }
    parts
}

fn fallback_summary(block: &RawBlock) -> String {
    block
        .lines
        .iter()
        .skip(1)
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .unwrap_or_else(|| block.header().trim())
        .to_string()
}
