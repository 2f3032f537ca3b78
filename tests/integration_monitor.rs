// tests/integration_monitor.rs
//! End-to-end behavior of `BuildMonitor` as driven by a host orchestrator.

use sanitizer_reports_core::config::ReportConfig;
use sanitizer_reports_core::error::ReportError;
use sanitizer_reports_core::reporting::MemorySink;
use sanitizer_reports_core::{Aggregate, BuildMonitor, JobId, SanitizerKind};
use std::sync::Arc;
use std::thread;

const ASAN_HBO: &str = "\
=================================================================
==4242==ERROR: AddressSanitizer: heap-buffer-overflow on address 0x602000000014 at pc 0x0000004c3f1e bp 0x7ffd1c2b6f30 sp 0x7ffd1c2b6f28
READ of size 4 at 0x602000000014 thread T0
    #0 0x4c3f1d in main /src/project/overflow.c:5:10
    #1 0x7f2a1b2c3d4e in __libc_start_main (/lib/x86_64-linux-gnu/libc.so.6+0x21b96)

0x602000000014 is located 0 bytes to the right of 4-byte region [0x602000000010,0x602000000014)
SUMMARY: AddressSanitizer: heap-buffer-overflow /src/project/overflow.c:5:10 in main
==4242==ABORTING
";

const TSAN_TRUNCATED: &str = "\
==================
WARNING: ThreadSanitizer: data race (pid=9337)
  Write of size 4 at 0x7fe3c3075190 by thread T1:
    #0 Thread1 race.c:4 (exe+0x000000001234)
";

const TSAN_RACE: &str = "\
==================
WARNING: ThreadSanitizer: data race (pid=9337)
  Write of size 4 at 0x7fe3c3075190 by thread T1:
    #0 Thread1 race.c:4 (exe+0x000000001234)

  Previous write of size 4 at 0x7fe3c3075190 by main thread:
    #0 main race.c:10 (exe+0x000000001300)

SUMMARY: ThreadSanitizer: data race race.c:4 in Thread1
==================
";

fn monitor() -> BuildMonitor {
    BuildMonitor::new(&ReportConfig::default()).unwrap()
}

fn finish(monitor: &BuildMonitor) -> Aggregate {
    let mut sink = MemorySink::new();
    monitor.on_build_end(&mut sink).unwrap();
    assert_eq!(sink.deliveries, 1);
    sink.delivered.unwrap()
}

fn assert_invariants(agg: &Aggregate) {
    assert!(agg.unique_count <= agg.total_count);
    assert_eq!(agg.by_kind.values().sum::<usize>(), agg.unique_count);
    assert_eq!(agg.occurrences.len(), agg.unique_count);
    assert_eq!(agg.occurrences.values().sum::<usize>(), agg.total_count);
    assert_eq!(agg.by_job.values().map(Vec::len).sum::<usize>(), agg.total_count);
}

#[test]
fn test_non_matching_output_yields_empty_aggregate() {
    let m = monitor();
    let job = JobId::new("quiet");
    m.on_job_start(job.clone()).unwrap();
    m.on_job_output(&job, "[ RUN      ] Suite.Test").unwrap();
    m.on_job_end(&job).unwrap();

    let agg = finish(&m);
    assert_eq!(agg.total_count, 0);
    assert_eq!(agg.unique_count, 0);
    assert!(agg.by_kind.is_empty());
    assert_invariants(&agg);
}

#[test]
fn test_single_asan_block() {
    let m = monitor();
    let job = JobId::new("pkg");
    m.on_job_start(job.clone()).unwrap();
    assert_eq!(m.on_job_output(&job, ASAN_HBO).unwrap(), 1);
    let summary = m.on_job_end(&job).unwrap();
    assert_eq!(summary.reports, 1);
    assert_eq!(summary.lines, 9);

    let agg = finish(&m);
    assert_eq!(agg.total_count, 1);
    assert_eq!(agg.unique_count, 1);
    assert_eq!(agg.by_kind.get("heap-buffer-overflow"), Some(&1));

    let report = &agg.by_job[&job][0];
    assert_eq!(report.sanitizer_kind, SanitizerKind::Asan);
    assert!(report.complete);
    assert!(report.summary.starts_with("heap-buffer-overflow"));
    assert_invariants(&agg);
}

#[test]
fn test_same_bug_with_new_addresses_deduplicates() {
    let rerun = ASAN_HBO
        .replace("4242", "5151")
        .replace("602000000014", "603000000a24")
        .replace("602000000010", "603000000a20")
        .replace("4c3f1d", "4d0011")
        .replace("overflow.c:5:10", "overflow.c:6:10");

    // Same job twice, and across two jobs.
    for jobs in [vec!["one", "one"], vec!["one", "two"]] {
        let m = monitor();
        let mut started = Vec::new();
        for (name, text) in jobs.iter().zip([ASAN_HBO, rerun.as_str()]) {
            let job = JobId::new(*name);
            if !started.contains(&job) {
                m.on_job_start(job.clone()).unwrap();
                started.push(job.clone());
            }
            m.on_job_output(&job, text).unwrap();
        }
        for job in &started {
            m.on_job_end(job).unwrap();
        }

        let agg = finish(&m);
        assert_eq!(agg.total_count, 2);
        assert_eq!(agg.unique_count, 1);
        assert_eq!(agg.by_kind.get("heap-buffer-overflow"), Some(&1));
        assert_invariants(&agg);
    }
}

#[test]
fn test_truncated_tsan_block_is_kept() {
    let m = monitor();
    let job = JobId::new("racy");
    m.on_job_start(job.clone()).unwrap();
    assert_eq!(m.on_job_output(&job, TSAN_TRUNCATED).unwrap(), 0);
    m.on_job_end(&job).unwrap();

    let agg = finish(&m);
    assert_eq!(agg.total_count, 1);
    let report = &agg.by_job[&job][0];
    assert_eq!(report.sanitizer_kind, SanitizerKind::Tsan);
    assert_eq!(report.violation_kind, "unknown");
    assert!(!report.complete);
    assert_invariants(&agg);
}

#[test]
fn test_trailing_line_without_newline_is_flushed() {
    let m = monitor();
    let job = JobId::new("leaky");
    m.on_job_start(job.clone()).unwrap();
    m.on_job_output(&job, "==1==ERROR: LeakSanitizer: detected memory leaks\n").unwrap();
    m.on_job_output(&job, "SUMMARY: AddressSanitizer: 8 byte(s) leaked in 1 allocation(s).")
        .unwrap();
    m.on_job_end(&job).unwrap();

    let agg = finish(&m);
    let report = &agg.by_job[&job][0];
    assert_eq!(report.violation_kind, "detected memory leaks");
    assert!(report.complete);
}

#[test]
fn test_concurrent_interleaved_jobs_match_isolated_runs() {
    fn chunks(text: &str, size: usize) -> Vec<String> {
        text.as_bytes()
            .chunks(size)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect()
    }

    let text_a = format!("noise\n{ASAN_HBO}more noise\n{TSAN_RACE}");
    let text_b = format!("{TSAN_RACE}{TSAN_TRUNCATED}");

    let isolated = |name: &str, text: &str| {
        let m = monitor();
        let job = JobId::new(name);
        m.on_job_start(job.clone()).unwrap();
        m.on_job_output(&job, text).unwrap();
        m.on_job_end(&job).unwrap();
        finish(&m).by_job.remove(&job).unwrap_or_default()
    };
    let expected_a = isolated("a", &text_a);
    let expected_b = isolated("b", &text_b);

    let m = Arc::new(monitor());
    let handles: Vec<_> = [("a", text_a.clone(), 7), ("b", text_b.clone(), 5)]
        .into_iter()
        .map(|(name, text, size)| {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                let job = JobId::new(name);
                m.on_job_start(job.clone()).unwrap();
                for chunk in chunks(&text, size) {
                    m.on_job_output(&job, chunk).unwrap();
                    thread::yield_now();
                }
                m.on_job_end(&job).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let agg = finish(&m);
    assert_eq!(agg.by_job[&JobId::new("a")], expected_a);
    assert_eq!(agg.by_job[&JobId::new("b")], expected_b);
    assert_eq!(expected_a.len(), 2);
    assert_eq!(expected_b.len(), 2);
    // The complete data race appears in both jobs but counts once.
    assert_eq!(agg.total_count, 4);
    assert_eq!(agg.unique_count, 3);
    assert_invariants(&agg);
}

#[test]
fn test_usage_faults_are_reported() {
    let m = monitor();
    let job = JobId::new("j");

    let err = m.on_job_output(&job, "x").unwrap_err();
    assert!(matches!(err, ReportError::UnknownJob(_)));
    assert!(err.is_usage_fault());

    m.on_job_start(job.clone()).unwrap();
    assert!(matches!(m.on_job_start(job.clone()), Err(ReportError::JobAlreadyStarted(_))));
    m.on_job_end(&job).unwrap();
    assert!(matches!(m.on_job_output(&job, "late"), Err(ReportError::JobClosed(_))));
    assert!(matches!(m.on_job_end(&job), Err(ReportError::JobClosed(_))));
    assert!(matches!(
        m.on_job_end(&JobId::new("ghost")),
        Err(ReportError::UnknownJob(_))
    ));
}

#[test]
fn test_build_end_delivers_once_and_closes_open_jobs() {
    let m = monitor();
    let job = JobId::new("forgotten");
    m.on_job_start(job.clone()).unwrap();
    m.on_job_output(&job, TSAN_TRUNCATED).unwrap();
    assert_eq!(m.open_jobs(), vec![job.clone()]);

    let mut sink = MemorySink::new();
    let agg = m.on_build_end(&mut sink).unwrap();
    assert_eq!(agg.total_count, 1);
    assert_eq!(m.job_summary(&job).map(|s| s.reports), Some(1));
    assert!(m.open_jobs().is_empty());

    let again = m.on_build_end(&mut sink);
    assert!(matches!(again, Err(ReportError::BuildFinished)));
    assert_eq!(sink.deliveries, 1);
    assert!(matches!(m.on_job_start("late"), Err(ReportError::BuildFinished)));
}

#[test]
fn test_prefixed_interleaved_output() {
    let m = monitor();
    let job = JobId::new("launch");
    m.on_job_start(job.clone()).unwrap();
    let text = "\
[talker-1] WARNING: ThreadSanitizer: lock-order-inversion (potential deadlock) (pid=26542)
[listener-2] hello from listener
[talker-1]   Mutex M10 acquired here while holding mutex M11 in thread T5:
[talker-1]     #0 pthread_mutex_lock <null> (libtsan.so.0+0x3fadc)
[talker-1] SUMMARY: ThreadSanitizer: lock-order-inversion (potential deadlock) (/opt/ros2/lib/librcl.so+0x1)
[talker-1] ==================
";
    m.on_job_output(&job, text).unwrap();
    m.on_job_end(&job).unwrap();

    let agg = finish(&m);
    let report = &agg.by_job[&job][0];
    assert_eq!(report.violation_kind, "lock-order-inversion");
    assert!(report.complete);
    assert!(!report.raw_text.contains("listener"));
    assert!(!report.raw_text.contains("[talker-1]"));
}

#[test]
fn test_two_prefixed_reports_interleaved() {
    let m = monitor();
    let job = JobId::new("launch");
    m.on_job_start(job.clone()).unwrap();
    let text = "\
[talker-1] WARNING: ThreadSanitizer: data race (pid=1)
[listener-2] ==================
[listener-2] WARNING: ThreadSanitizer: data race (pid=2)
[talker-1]   Write of size 4 at 0x7b0400000010 by thread T1:
[listener-2]   Read of size 4 at 0x7b0400000020 by thread T2:
[talker-1]     #0 publish /ros2/talker.cpp:30 (talker+0x10)
[listener-2]     #0 on_message /ros2/listener.cpp:12 (listener+0x20)
[talker-1] SUMMARY: ThreadSanitizer: data race /ros2/talker.cpp:30 in publish
[talker-1] ==================
[listener-2] SUMMARY: ThreadSanitizer: data race /ros2/listener.cpp:12 in on_message
[listener-2] ==================
";
    m.on_job_output(&job, text).unwrap();
    m.on_job_end(&job).unwrap();

    let agg = finish(&m);
    let reports = &agg.by_job[&job];
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.complete && r.violation_kind == "data race"));
    assert!(reports[0].raw_text.contains("publish"));
    assert!(!reports[0].raw_text.contains("on_message"));
    assert!(reports[1].raw_text.contains("on_message"));
    assert!(!reports[1].raw_text.contains("publish"));
    assert_eq!(agg.unique_count, 2);
    assert_invariants(&agg);
}

#[test]
fn test_truncated_block_ignores_following_test_output() {
    let m = monitor();
    let tails = [
        ("first", "[       OK ] Talker.Publish (3 ms)\n[ RUN      ] Talker.Stop\n"),
        ("second", "[  FAILED  ] Listener.Spin (40 ms)\n  expected: 1\n  actual: 2\n"),
    ];
    for (name, tail) in tails {
        let job = JobId::new(name);
        m.on_job_start(job.clone()).unwrap();
        m.on_job_output(&job, format!("{TSAN_TRUNCATED}{tail}")).unwrap();
        m.on_job_end(&job).unwrap();
    }

    let agg = finish(&m);
    assert_eq!(agg.total_count, 2);
    assert_eq!(agg.unique_count, 1);
    let report = &agg.by_job[&JobId::new("second")][0];
    assert!(!report.complete);
    assert!(!report.raw_text.contains("FAILED"));
    assert!(!report.raw_text.contains("expected"));
    assert_invariants(&agg);
}
