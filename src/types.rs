// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier of one job's output stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One complete line of job output, terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub job: JobId,
    /// Position of the line within its job, starting at 0.
    pub seq: u64,
    pub text: String,
}

/// The sanitizer that produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SanitizerKind {
    Asan,
    Tsan,
    Ubsan,
    Lsan,
    Unknown,
}

impl SanitizerKind {
    /// Name the sanitizer runtime prints for itself.
    #[must_use]
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Asan => "AddressSanitizer",
            Self::Tsan => "ThreadSanitizer",
            Self::Ubsan => "UndefinedBehaviorSanitizer",
            Self::Lsan => "LeakSanitizer",
            Self::Unknown => "UnknownSanitizer",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Asan => "ASAN",
            Self::Tsan => "TSAN",
            Self::Ubsan => "UBSAN",
            Self::Lsan => "LSAN",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SanitizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Deduplication key of a report: hex SHA-256 of its normalized text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, enough to tell reports apart in human output.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Violation kind used when a block carries no summary line.
pub const UNKNOWN_VIOLATION: &str = "unknown";

/// A classified sanitizer report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizerReport {
    pub sanitizer_kind: SanitizerKind,
    pub violation_kind: String,
    pub summary: String,
    pub job: JobId,
    pub raw_text: String,
    pub fingerprint: Fingerprint,
    /// Keys of the stack traces that identify the error, addresses masked.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stack_trace_keys: Vec<String>,
    /// False when the block was cut off before its end condition.
    pub complete: bool,
}

impl SanitizerReport {
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.violation_kind == UNKNOWN_VIOLATION
    }
}
