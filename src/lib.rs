//! Streaming extraction and build-wide aggregation of sanitizer reports.
//!
//! Raw job output flows through [`assembler::LineAssembler`] into a per-job
//! [`recognizer::Recognizer`], whose blocks are turned into
//! [`types::SanitizerReport`]s by the [`classifier::Classifier`] and collected
//! by the [`aggregator::Aggregator`]. [`monitor::BuildMonitor`] wires these
//! together behind the host-facing `on_job_*` / `on_build_end` calls.

pub mod aggregator;
pub mod assembler;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod exit;
pub mod monitor;
pub mod recognizer;
pub mod reporting;
pub mod types;

pub use aggregator::{Aggregate, Aggregator};
pub use monitor::{BuildMonitor, JobSummary};
pub use reporting::ReportSink;
pub use types::{Fingerprint, JobId, SanitizerKind, SanitizerReport};
