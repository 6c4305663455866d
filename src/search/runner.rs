use super::aggregator::ResultSet;
use super::orchestrator::{RunOutcome, RunReport};
use super::progress::{ProgressCallback, ProgressSnapshot};
use super::worker::{BatchProcessor, BatchReport, BatchSink, Job};
use super::AttackParams;
use crate::alphabet::Alphabet;
use crate::config::EngineParams;
use crate::error::{CfResult, CipherForgeError};
use crate::keyspace::{Batch, KeySpace};
use crate::scorer::Scorer;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

struct Tracker<'a, CB: ProgressCallback> {
    keys: AtomicU64,
    total: u64,
    best: Mutex<Option<f64>>,
    last_report: Mutex<Instant>,
    report_every: Duration,
    started: Instant,
    cancel: &'a AtomicBool,
    callback: &'a CB,
}

impl<CB: ProgressCallback> Tracker<'_, CB> {
    fn record_best(&self, best: Option<f64>) {
        if let Some(b) = best {
            let mut cur = self.best.lock().unwrap_or_else(PoisonError::into_inner);
            if cur.map_or(true, |c| b > c) {
                *cur = Some(b);
            }
        }
    }

    fn snapshot(&self) -> ProgressSnapshot {
        let best = *self.best.lock().unwrap_or_else(PoisonError::into_inner);
        ProgressSnapshot::new(
            self.keys.load(Ordering::Relaxed),
            self.total,
            best,
            self.started.elapsed(),
        )
    }

    /// Throttled; only one thread reports at a time.
    fn maybe_report(&self) {
        let Ok(mut last) = self.last_report.try_lock() else {
            return;
        };
        if last.elapsed() < self.report_every {
            return;
        }
        *last = Instant::now();
        if !self.callback.on_progress(&self.snapshot()) {
            info!("Search aborted by progress callback");
            self.cancel.store(true, Ordering::Relaxed);
        }
    }
}

struct TrackerSink<'a, 'b, CB: ProgressCallback> {
    tracker: &'a Tracker<'b, CB>,
    counted: u64,
}

impl<CB: ProgressCallback> BatchSink for TrackerSink<'_, '_, CB> {
    fn progress(&mut self, _batch_id: u64, keys_done: u64) {
        let delta = keys_done - self.counted;
        self.counted = keys_done;
        self.tracker.keys.fetch_add(delta, Ordering::Relaxed);
        self.tracker.maybe_report();
    }

    fn warning(&mut self, message: String) {
        warn!("{}", message);
    }
}

/// One-shot search on a rayon pool of `params.workers` threads.
///
/// Uses the same batch contract as the threaded orchestrator. The callback
/// may abort the search; the report then carries `RunOutcome::Cancelled`
/// and whatever batches finished.
pub fn crack<CB: ProgressCallback>(
    scorer: Arc<Scorer>,
    alphabet: &Alphabet,
    params: &EngineParams,
    attack: &AttackParams,
    callback: &CB,
) -> CfResult<RunReport> {
    if params.workers == 0 || params.max_key_length == 0 {
        return Err(CipherForgeError::InvalidConfiguration(
            "workers and max key length must be at least 1".to_string(),
        ));
    }

    // 1. Setup
    let space = KeySpace::new(alphabet.len(), params.max_key_length)?;
    let job = Arc::new(Job::new(
        Arc::new(alphabet.clone()),
        space.clone(),
        scorer,
        params,
        attack,
    )?);
    let batch_size = params.resolved_batch_size(params.workers);
    let batches: Vec<Batch> = space.batches(batch_size).collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.workers)
        .build()
        .map_err(|e| CipherForgeError::InvalidConfiguration(e.to_string()))?;

    let cancel = AtomicBool::new(false);
    let started = Instant::now();
    let tracker = Tracker {
        keys: AtomicU64::new(0),
        total: space.total(),
        best: Mutex::new(None),
        last_report: Mutex::new(started),
        report_every: Duration::from_millis(params.report_interval_ms),
        started,
        cancel: &cancel,
        callback,
    };

    info!(
        "Cracking with {} over {} keys ({} batches, {} threads)",
        attack.method,
        space.total(),
        batches.len(),
        params.workers
    );

    // 2. Run batches; each rayon task keeps its own processor and cache
    let reports: Vec<Option<BatchReport>> = pool.install(|| {
        batches
            .par_iter()
            .map_init(
                || BatchProcessor::new(Arc::clone(&job)),
                |processor, batch| {
                    let mut sink = TrackerSink {
                        tracker: &tracker,
                        counted: 0,
                    };
                    let report = processor.process(batch, &cancel, &mut sink)?;
                    tracker
                        .keys
                        .fetch_add(report.keys - sink.counted, Ordering::Relaxed);
                    tracker.record_best(report.best);
                    tracker.maybe_report();
                    Some(report)
                },
            )
            .collect()
    });

    // 3. Merge in key-space order so ties resolve the same way on every run
    let mut results = ResultSet::new(params.top_k);
    let mut keys_tested = 0;
    let mut batches_completed = 0;
    for report in reports.into_iter().flatten() {
        keys_tested += report.keys;
        batches_completed += 1;
        results.add(report.candidates);
    }

    let outcome = if cancel.load(Ordering::Relaxed) {
        RunOutcome::Cancelled
    } else {
        RunOutcome::Completed
    };
    let report = RunReport {
        outcome,
        keys_tested,
        total_keys: space.total(),
        best_score: results.best(),
        results: results.into_vec(),
        batches_completed,
        batches_total: batches.len() as u64,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    callback.on_progress(&report.progress());
    Ok(report)
}
