use crate::aggregator::Aggregate;
use crate::types::SanitizerReport;
use std::collections::BTreeSet;

pub(crate) fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Jobs in which a fingerprint occurred.
pub(crate) fn jobs_with<'a>(aggregate: &'a Aggregate, report: &SanitizerReport) -> BTreeSet<&'a str> {
    aggregate
        .reports()
        .filter(|r| r.fingerprint == report.fingerprint)
        .map(|r| r.job.as_str())
        .collect()
}

pub(crate) fn jobs_with_violations(aggregate: &Aggregate) -> usize {
    aggregate.by_job.values().filter(|reports| !reports.is_empty()).count()
}
