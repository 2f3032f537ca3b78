// src/classifier/fingerprint.rs
//! Run-invariant fingerprints for sanitizer reports.
//!
//! The same bug reproduced twice prints different heap addresses, process
//! and thread ids, and (after a rebuild) different line numbers. Those
//! fields are masked before hashing so both occurrences share a key.

use crate::config::FingerprintConfig;
use crate::types::Fingerprint;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use tracing::debug;

fn pattern(p: &str) -> Regex {
    Regex::new(p).unwrap_or_else(|_| panic!("Invalid Regex"))
}

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"0x[0-9a-fA-F]+"));
static PID_BANNER_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"==\d+=="));
static ID_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\b(?P<field>pid|tid)=\d+"));
static THREAD_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\bT\d+\b"));
static MUTEX_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\bM\d+\b"));
static LINE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?P<file>\.[A-Za-z0-9_+]+):\d+(?::\d+)?"));

#[derive(Debug, Clone)]
pub struct Normalizer {
    config: FingerprintConfig,
}

impl Normalizer {
    #[must_use]
    pub fn new(config: FingerprintConfig) -> Self {
        Self { config }
    }

    /// Masks the run-dependent fields of `text`.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        let mut out = text.replace("\r\n", "\n");
        if self.config.strip_addresses {
            out = ADDRESS_RE.replace_all(&out, "0xX").into_owned();
        }
        if self.config.strip_ids {
            out = PID_BANNER_RE.replace_all(&out, "==PID==").into_owned();
            out = ID_FIELD_RE.replace_all(&out, "${field}=N").into_owned();
            out = THREAD_RE.replace_all(&out, "T#").into_owned();
            out = MUTEX_RE.replace_all(&out, "M#").into_owned();
        }
        if self.config.strip_line_numbers {
            out = LINE_NUMBER_RE.replace_all(&out, "${file}").into_owned();
        }
        out
    }

    /// Hashes the normalized text, or the raw text when nothing of it
    /// survives normalization.
    #[must_use]
    pub fn fingerprint(&self, raw: &str) -> Fingerprint {
        let normalized = self.normalize(raw);
        if normalized.trim().is_empty() {
            debug!("normalization left no text; hashing raw report");
            return hash(raw);
        }
        hash(&normalized)
    }
}

fn hash(text: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    Fingerprint::from_hex(format!("{:x}", hasher.finalize()))
}
