// src/monitor.rs
//! Entry point for the host orchestrator.
//!
//! A [`BuildMonitor`] lives for exactly one build. The host reports job
//! lifecycle and output through `on_job_*` calls from any thread; each job's
//! line assembler and recognizer sit behind their own lock, so jobs never
//! contend with each other. The aggregator is the only shared state.

use crate::aggregator::{Aggregate, Aggregator};
use crate::assembler::LineAssembler;
use crate::classifier::Classifier;
use crate::config::{RecognizerConfig, ReportConfig};
use crate::error::{ReportError, Result};
use crate::recognizer::{RawBlock, Recognizer, RuleSet};
use crate::reporting::ReportSink;
use crate::types::JobId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Final counters of a closed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub lines: u64,
    pub reports: usize,
}

#[derive(Debug)]
struct JobPipeline {
    assembler: LineAssembler,
    recognizer: Recognizer,
    reports: usize,
}

#[derive(Debug)]
enum JobSlot {
    Open(Arc<Mutex<JobPipeline>>),
    Closed(JobSummary),
}

#[derive(Debug)]
pub struct BuildMonitor {
    rules: Arc<RuleSet>,
    recognizer_config: RecognizerConfig,
    classifier: Classifier,
    jobs: RwLock<HashMap<JobId, JobSlot>>,
    aggregator: Aggregator,
    finished: AtomicBool,
}

impl BuildMonitor {
    /// Creates a monitor recognizing the built-in sanitizers.
    ///
    /// # Errors
    /// Returns error if a built-in pattern fails to compile.
    pub fn new(config: &ReportConfig) -> Result<Self> {
        Ok(Self::with_rules(config, RuleSet::builtin()?))
    }

    /// Creates a monitor with a custom rule table.
    #[must_use]
    pub fn with_rules(config: &ReportConfig, rules: RuleSet) -> Self {
        let rules = Arc::new(rules);
        let classifier = Classifier::new(
            Arc::clone(&rules),
            config.fingerprint.clone(),
            config.frames.clone(),
        );
        Self {
            rules,
            recognizer_config: config.recognizer.clone(),
            classifier,
            jobs: RwLock::new(HashMap::new()),
            aggregator: Aggregator::new(),
            finished: AtomicBool::new(false),
        }
    }

    /// Registers a job before its first output.
    ///
    /// # Errors
    /// `JobAlreadyStarted` for a known id, `BuildFinished` after build end.
    pub fn on_job_start(&self, job: impl Into<JobId>) -> Result<()> {
        self.ensure_running()?;
        let job = job.into();
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(&job) {
            return Err(ReportError::JobAlreadyStarted(job));
        }

        debug!(job = %job, "job started");
        let pipeline = JobPipeline {
            assembler: LineAssembler::new(job.clone()),
            recognizer: Recognizer::new(
                job.clone(),
                Arc::clone(&self.rules),
                self.recognizer_config.clone(),
            ),
            reports: 0,
        };
        jobs.insert(job, JobSlot::Open(Arc::new(Mutex::new(pipeline))));
        Ok(())
    }

    /// Feeds one output chunk of `job`. Returns the number of reports it
    /// completed.
    ///
    /// # Errors
    /// `UnknownJob`, `JobClosed` or `BuildFinished` when the host breaks the
    /// call contract.
    pub fn on_job_output(&self, job: &JobId, chunk: impl AsRef<[u8]>) -> Result<usize> {
        self.ensure_running()?;
        let pipeline = self.open_pipeline(job)?;
        let mut pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);

        let mut blocks = Vec::new();
        for line in pipeline.assembler.feed(chunk)? {
            blocks.extend(pipeline.recognizer.push_line(&line)?);
        }
        let recorded = self.record_blocks(blocks);
        pipeline.reports += recorded;
        Ok(recorded)
    }

    /// Closes `job`: flushes its last partial line and any open report.
    ///
    /// # Errors
    /// `UnknownJob`, `JobClosed` or `BuildFinished` when the host breaks the
    /// call contract.
    pub fn on_job_end(&self, job: &JobId) -> Result<JobSummary> {
        self.ensure_running()?;
        self.close_job(job)
    }

    /// Finishes the build and hands the aggregate to `sink`. Jobs the host
    /// never closed are closed first so no open report is lost.
    ///
    /// # Errors
    /// `BuildFinished` on a second call; otherwise whatever the sink returns.
    pub fn on_build_end<S: ReportSink + ?Sized>(&self, sink: &mut S) -> Result<Aggregate> {
        if self
            .finished
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ReportError::BuildFinished);
        }

        for job in self.open_jobs() {
            warn!(job = %job, "job still open at build end; closing it");
            // A concurrent close between listing and closing is harmless.
            if let Err(e) = self.close_job(&job) {
                debug!(job = %job, error = %e, "job closed concurrently");
            }
        }

        let aggregate = self.aggregator.snapshot();
        info!(
            total = aggregate.total_count,
            unique = aggregate.unique_count,
            "build finished"
        );
        sink.deliver(aggregate.clone())?;
        Ok(aggregate)
    }

    /// Current aggregate, without ending the build.
    #[must_use]
    pub fn snapshot(&self) -> Aggregate {
        self.aggregator.snapshot()
    }

    /// Counters of a closed job; `None` while it is open or unknown.
    #[must_use]
    pub fn job_summary(&self, job: &JobId) -> Option<JobSummary> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        match jobs.get(job) {
            Some(JobSlot::Closed(summary)) => Some(*summary),
            _ => None,
        }
    }

    #[must_use]
    pub fn open_jobs(&self) -> Vec<JobId> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut open: Vec<JobId> = jobs
            .iter()
            .filter(|(_, slot)| matches!(slot, JobSlot::Open(_)))
            .map(|(job, _)| job.clone())
            .collect();
        open.sort();
        open
    }

    fn ensure_running(&self) -> Result<()> {
        if self.finished.load(Ordering::Acquire) {
            return Err(ReportError::BuildFinished);
        }
        Ok(())
    }

    fn open_pipeline(&self, job: &JobId) -> Result<Arc<Mutex<JobPipeline>>> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        match jobs.get(job) {
            Some(JobSlot::Open(pipeline)) => Ok(Arc::clone(pipeline)),
            Some(JobSlot::Closed(_)) => Err(ReportError::JobClosed(job.clone())),
            None => Err(ReportError::UnknownJob(job.clone())),
        }
    }

    fn close_job(&self, job: &JobId) -> Result<JobSummary> {
        let pipeline = {
            let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
            match jobs.get_mut(job) {
                None => return Err(ReportError::UnknownJob(job.clone())),
                Some(JobSlot::Closed(_)) => return Err(ReportError::JobClosed(job.clone())),
                Some(slot) => match std::mem::replace(slot, JobSlot::Closed(JobSummary::default())) {
                    JobSlot::Open(pipeline) => pipeline,
                    JobSlot::Closed(_) => return Err(ReportError::JobClosed(job.clone())),
                },
            }
        };

        let summary = {
            let mut pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
            let mut blocks = Vec::new();
            if let Some(line) = pipeline.assembler.close()? {
                blocks.extend(pipeline.recognizer.push_line(&line)?);
            }
            blocks.extend(pipeline.recognizer.finish()?);

            pipeline.reports += self.record_blocks(blocks);
            JobSummary {
                lines: pipeline.assembler.line_count(),
                reports: pipeline.reports,
            }
        };

        debug!(job = %job, lines = summary.lines, reports = summary.reports, "job closed");
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(job.clone(), JobSlot::Closed(summary));
        Ok(summary)
    }

    fn record_blocks(&self, blocks: Vec<RawBlock>) -> usize {
        let count = blocks.len();
        for block in blocks {
            if !block.complete {
                info!(
                    job = %block.job,
                    kind = %block.kind,
                    first_line = block.first_seq,
                    "recording incomplete sanitizer report"
                );
            }
            self.aggregator.record(self.classifier.classify(block));
        }
        count
    }
}
