// src/aggregator.rs
//! Build-wide collection of sanitizer reports.
//!
//! Every report is kept in its job's history. Deduplication by fingerprint
//! only affects `unique_count` and the per-kind tally.

use crate::types::{Fingerprint, JobId, SanitizerReport};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Point-in-time view of all reports seen in the build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub total_count: usize,
    pub unique_count: usize,
    /// Unique reports per violation kind.
    pub by_kind: BTreeMap<String, usize>,
    /// Every report, per job, in arrival order. Shared so that snapshots
    /// only copy pointers.
    pub by_job: BTreeMap<JobId, Vec<Arc<SanitizerReport>>>,
    /// How often each fingerprint occurred across the build.
    pub occurrences: BTreeMap<Fingerprint, usize>,
}

impl Aggregate {
    #[must_use]
    pub fn has_violations(&self) -> bool {
        self.total_count > 0
    }

    /// Reports in arrival order within each job, jobs in id order.
    pub fn reports(&self) -> impl Iterator<Item = &SanitizerReport> {
        self.by_job.values().flatten().map(|r| &**r)
    }

    /// First occurrence of every fingerprint, paired with its count.
    #[must_use]
    pub fn unique_reports(&self) -> Vec<(&SanitizerReport, usize)> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for report in self.reports() {
            if seen.insert(&report.fingerprint) {
                let count = self.occurrences.get(&report.fingerprint).copied().unwrap_or(1);
                out.push((report, count));
            }
        }
        out
    }

    #[must_use]
    pub fn job_count(&self, job: &JobId) -> usize {
        self.by_job.get(job).map_or(0, Vec::len)
    }
}

/// Thread-safe owner of the build's [`Aggregate`].
#[derive(Debug, Default)]
pub struct Aggregator {
    state: Mutex<Aggregate>,
}

impl Aggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a report. Returns true if its fingerprint was new to the build.
    pub fn record(&self, report: SanitizerReport) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state.total_count += 1;
        let seen = state.occurrences.entry(report.fingerprint.clone()).or_insert(0);
        *seen += 1;
        let is_new = *seen == 1;
        if is_new {
            state.unique_count += 1;
            *state.by_kind.entry(report.violation_kind.clone()).or_insert(0) += 1;
        }

        debug!(
            job = %report.job,
            kind = %report.sanitizer_kind,
            violation = %report.violation_kind,
            fingerprint = report.fingerprint.short(),
            is_new,
            "recorded sanitizer report"
        );
        state.by_job.entry(report.job.clone()).or_default().push(Arc::new(report));
        is_new
    }

    /// Copies the current aggregate. Reports are shared, not cloned, so the
    /// lock is held only for the map copies.
    #[must_use]
    pub fn snapshot(&self) -> Aggregate {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SanitizerKind;

    fn report(job: &str, kind: &str, fp: &str) -> SanitizerReport {
        SanitizerReport {
            sanitizer_kind: SanitizerKind::Asan,
            violation_kind: kind.to_string(),
            summary: String::new(),
            job: JobId::new(job),
            raw_text: String::new(),
            fingerprint: Fingerprint::from_hex(fp.to_string()),
            stack_trace_keys: Vec::new(),
            complete: true,
        }
    }

    #[test]
    fn test_duplicates_count_once_but_stay_per_job() {
        let agg = Aggregator::new();
        assert!(agg.record(report("a", "heap-buffer-overflow", "f1")));
        assert!(!agg.record(report("b", "heap-buffer-overflow", "f1")));
        assert!(!agg.record(report("a", "heap-buffer-overflow", "f1")));
        assert!(agg.record(report("b", "data race", "f2")));

        let snap = agg.snapshot();
        assert_eq!(snap.total_count, 4);
        assert_eq!(snap.unique_count, 2);
        assert_eq!(snap.by_kind.get("heap-buffer-overflow"), Some(&1));
        assert_eq!(snap.by_kind.get("data race"), Some(&1));
        assert_eq!(snap.job_count(&JobId::new("a")), 2);
        assert_eq!(snap.job_count(&JobId::new("b")), 2);
        assert_eq!(snap.occurrences.values().sum::<usize>(), snap.total_count);

        let unique = snap.unique_reports();
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].1, 3);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let agg = Aggregator::new();
        let before = agg.snapshot();
        agg.record(report("a", "SEGV", "f"));
        assert_eq!(before.total_count, 0);
        assert!(!before.has_violations());
        assert!(agg.snapshot().has_violations());
    }

    #[test]
    fn test_snapshot_shares_reports() {
        let agg = Aggregator::new();
        agg.record(report("a", "SEGV", "f"));
        let one = agg.snapshot();
        let two = agg.snapshot();
        let job = JobId::new("a");
        assert!(Arc::ptr_eq(&one.by_job[&job][0], &two.by_job[&job][0]));
    }
}
