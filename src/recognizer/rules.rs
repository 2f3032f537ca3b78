// src/recognizer/rules.rs
//! Per-sanitizer recognition rules.
//!
//! Each rule bundles the start marker, the body shape, the summary line
//! pattern, the error name patterns and the terminator of one sanitizer. The
//! state machine only ever consults this table; supporting another sanitizer
//! means adding a rule.
//!
//! A second table, keyed by error name, says which stack traces of a report
//! matter when keying it (see [`TraceRule`]).

use crate::error::Result;
use crate::types::SanitizerKind;
use regex::Regex;

/// How a block ends once its summary line has been seen.
#[derive(Debug, Clone)]
pub enum Terminator {
    /// The summary line itself closes the block.
    AtSummary,
    /// Lines after the summary matching `continues` stay in the block; a line
    /// matching `ends` is appended and closes it. Any other line closes the
    /// block without being consumed.
    Trailer {
        continues: Option<Regex>,
        ends: Regex,
    },
}

#[derive(Debug, Clone)]
pub struct SanitizerRule {
    pub kind: SanitizerKind,
    /// Header line pattern. Must define a `prefix` group for the text in front
    /// of the marker.
    pub start: Regex,
    /// Non-indented lines that belong to the report body. Blank and indented
    /// lines always do; any other line ends the body.
    pub body: Regex,
    /// Summary line pattern with a `text` group.
    pub summary: Regex,
    /// Tried in order against the header; the first `name` capture wins.
    pub error_names: Vec<Regex>,
    pub terminator: Terminator,
}

impl SanitizerRule {
    /// Extracts the error name (e.g. `heap-buffer-overflow`) from a header.
    #[must_use]
    pub fn error_name<'a>(&self, header: &'a str) -> Option<&'a str> {
        self.error_names
            .iter()
            .filter_map(|re| re.captures(header))
            .find_map(|caps| caps.name("name"))
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty())
    }

    /// Returns the summary text if `line` is this rule's summary line.
    #[must_use]
    pub fn summary_text<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.summary
            .captures(line)
            .and_then(|caps| caps.name("text"))
            .map(|m| m.as_str().trim())
    }

    /// True if `line` can appear between the header and the summary.
    #[must_use]
    pub fn is_body_line(&self, line: &str) -> bool {
        line.is_empty() || line.starts_with(char::is_whitespace) || self.body.is_match(line)
    }
}

/// Stack traces worth keying for one error name.
///
/// A report is split into parts, each starting at a non-indented line. Within
/// a part, the trace following a line that matches `begins[0]` is taken, then
/// the one following `begins[1]`, and so on. Error names without a rule take
/// the first trace of every part.
#[derive(Debug, Clone)]
pub struct TraceRule {
    pub error_name: String,
    pub begins: Vec<Regex>,
}

/// A header line matched against the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartMatch {
    pub rule: usize,
    pub kind: SanitizerKind,
    pub prefix: String,
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<SanitizerRule>,
    traces: Vec<TraceRule>,
}

const SANITIZER_ERROR_NAME: &str = r"Sanitizer: (?P<name>.+?)(?: \(| on | 0x[0-9a-fA-F]+|\s*$)";
const SEPARATOR: &str = r"^=+\s*$";

impl RuleSet {
    /// A rule table without trace rules.
    #[must_use]
    pub fn new(rules: Vec<SanitizerRule>) -> Self {
        Self {
            rules,
            traces: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_trace_rules(mut self, traces: Vec<TraceRule>) -> Self {
        self.traces = traces;
        self
    }

    /// The four sanitizers shipped with clang and gcc.
    ///
    /// # Errors
    /// Returns error if a pattern fails to compile.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(vec![
            address_rule()?,
            leak_rule()?,
            thread_rule()?,
            undefined_rule()?,
        ])
        .with_trace_rules(builtin_trace_rules()?))
    }

    #[must_use]
    pub fn rules(&self) -> &[SanitizerRule] {
        &self.rules
    }

    #[must_use]
    pub fn rule(&self, index: usize) -> Option<&SanitizerRule> {
        self.rules.get(index)
    }

    /// Trace rule for `error_name`, if it has one.
    #[must_use]
    pub fn trace_rule(&self, error_name: &str) -> Option<&TraceRule> {
        self.traces.iter().find(|t| t.error_name == error_name)
    }

    /// Finds the first rule whose start marker matches `line`.
    #[must_use]
    pub fn match_start(&self, line: &str) -> Option<StartMatch> {
        self.rules.iter().enumerate().find_map(|(idx, rule)| {
            let caps = rule.start.captures(line)?;
            let prefix = caps.name("prefix").map_or("", |m| m.as_str());
            Some(StartMatch {
                rule: idx,
                kind: rule.kind,
                prefix: prefix.to_string(),
            })
        })
    }
}

fn header(tool: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r"^(?P<prefix>.*?)(?:==\d+==)?(?:ERROR|WARNING): {tool}:"
    ))?)
}

fn summary(tools: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(r"SUMMARY: (?:{tools}): (?P<text>.*)$"))?)
}

fn body(shapes: &[&str]) -> Result<Regex> {
    Ok(Regex::new(&format!(r"^(?:{})", shapes.join("|")))?)
}

const LEAK_BODY: [&str; 4] = [
    r"(?:Direct|Indirect) leak of ",
    r"Objects leaked above:",
    r"-{3,}",
    r"Suppressions used:",
];

fn address_rule() -> Result<SanitizerRule> {
    let mut shapes = vec![
        r"(?:READ|WRITE) of size ",
        r"0x[0-9a-fA-F]+ is located ",
        r"(?:freed|allocated|previously allocated) by thread ",
        r"Thread T\d+",
        r"Address 0x[0-9a-fA-F]+ ",
        r"HINT: ",
        r"The signal is caused ",
        r"AddressSanitizer can not ",
        r"==\d+==(?:The signal|Hint|WARNING|NOTE|Register values)",
        r"SCARINESS: ",
        r"Shadow byte",
        r"=>",
    ];
    shapes.extend(LEAK_BODY);
    Ok(SanitizerRule {
        kind: SanitizerKind::Asan,
        start: header("AddressSanitizer")?,
        body: body(&shapes)?,
        summary: summary("AddressSanitizer")?,
        error_names: vec![Regex::new(SANITIZER_ERROR_NAME)?],
        // Shadow memory dump follows the summary, then ABORTING.
        terminator: Terminator::Trailer {
            continues: Some(Regex::new(r"^(?:\s|=>|Shadow byte)")?),
            ends: Regex::new(r"^(?:==\d+==ABORTING|=+)\s*$")?,
        },
    })
}

fn leak_rule() -> Result<SanitizerRule> {
    Ok(SanitizerRule {
        kind: SanitizerKind::Lsan,
        start: header("LeakSanitizer")?,
        body: body(&LEAK_BODY)?,
        // Leak checking inside ASan reports its summary as AddressSanitizer.
        summary: summary("LeakSanitizer|AddressSanitizer")?,
        error_names: vec![Regex::new(SANITIZER_ERROR_NAME)?],
        terminator: Terminator::AtSummary,
    })
}

fn thread_rule() -> Result<SanitizerRule> {
    Ok(SanitizerRule {
        kind: SanitizerKind::Tsan,
        start: header("ThreadSanitizer")?,
        body: body(&[
            r"(?:Atomic )?(?:[Rr]ead|[Ww]rite) of size ",
            r"Previous ",
            r"Thread T\d+",
            r"Location is ",
            r"Mutex M\d+",
            r"Cycle in lock order graph",
        ])?,
        summary: summary("ThreadSanitizer")?,
        error_names: vec![Regex::new(SANITIZER_ERROR_NAME)?],
        terminator: Terminator::Trailer {
            continues: None,
            ends: Regex::new(SEPARATOR)?,
        },
    })
}

fn undefined_rule() -> Result<SanitizerRule> {
    Ok(SanitizerRule {
        kind: SanitizerKind::Ubsan,
        start: Regex::new(
            r"^(?P<prefix>.*?)(?:(?:==\d+==)?(?:ERROR|WARNING): UndefinedBehaviorSanitizer:|\S+: runtime error: )",
        )?,
        body: body(&[r"\S+: note: ", r"==\d+==(?:The signal|Hint|Register values)"])?,
        summary: summary("UndefinedBehaviorSanitizer")?,
        error_names: vec![
            Regex::new(r"runtime error: (?P<name>.+?)(?::\s| of type | for type |\s*$)")?,
            Regex::new(SANITIZER_ERROR_NAME)?,
        ],
        terminator: Terminator::AtSummary,
    })
}

fn trace_rule(error_name: &str, begins: &[&str]) -> Result<TraceRule> {
    Ok(TraceRule {
        error_name: error_name.to_string(),
        begins: begins.iter().map(|p| Regex::new(p)).collect::<std::result::Result<_, _>>()?,
    })
}

fn builtin_trace_rules() -> Result<Vec<TraceRule>> {
    const MUTEX: &str = r"^\s+Mutex M\d+ acquired here while holding mutex M\d+ in ";
    Ok(vec![
        // The racing access and the access it raced with.
        trace_rule(
            "data race",
            &[
                r"^\s+(?:Atomic )?(?:Read|Write) of size \d+ at 0x[0-9a-fA-F]+ ",
                r"^\s+Previous (?:atomic )?(?:read|write) of size \d+ at 0x[0-9a-fA-F]+ ",
            ],
        )?,
        // Allocation sites of direct leaks; indirect leaks follow from them.
        trace_rule(
            "detected memory leaks",
            &[r"^Direct leak of \d+ byte\(s\) in \d+ object\(s\) allocated from:$"],
        )?,
        // Both acquisitions of the inverted lock pair.
        trace_rule("lock-order-inversion", &[MUTEX, MUTEX])?,
    ])
}
