use super::aggregator::ResultSet;
use super::protocol::{WorkerCommand, WorkerEvent};
use super::{AttackParams, ScoredCandidate};
use crate::alphabet::Alphabet;
use crate::cipher::PreparedText;
use crate::config::EngineParams;
use crate::error::{CfResult, CipherForgeError};
use crate::keyspace::{Batch, KeySpace};
use crate::scorer::cache::{CacheEvent, ScoreCache};
use crate::scorer::metrics::Projection;
use crate::scorer::{Scorer, ScoringMethod};
use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Everything a worker needs for one run. Built once, shared read-only.
#[derive(Debug)]
pub struct Job {
    pub alphabet: Arc<Alphabet>,
    pub space: KeySpace,
    pub prepared: PreparedText,
    pub scorer: Arc<Scorer>,
    pub method: ScoringMethod,
    /// Uppercased filter, `None` when absent or empty.
    pub known_plaintext: Option<String>,
    pub min_score: Option<f64>,
    pub top_k: usize,
    pub breakdown: bool,
    pub progress_every: u64,
    pub cache_limit: usize,
    pub cache_pressure_bytes: usize,
}

impl Job {
    pub fn new(
        alphabet: Arc<Alphabet>,
        space: KeySpace,
        scorer: Arc<Scorer>,
        params: &EngineParams,
        attack: &AttackParams,
    ) -> CfResult<Self> {
        if attack.ciphertext.trim().is_empty() {
            return Err(CipherForgeError::EmptyCiphertext);
        }
        params.validate()?;

        let prepared = PreparedText::new(&alphabet, &attack.ciphertext);
        if prepared.member_count() == 0 {
            warn!("Ciphertext has no symbols from the alphabet; every key decrypts to the input");
        }

        let known_plaintext = attack
            .known_plaintext
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase);

        Ok(Self {
            alphabet,
            space,
            prepared,
            scorer,
            method: attack.method,
            known_plaintext,
            min_score: params.min_score,
            top_k: params.top_k,
            breakdown: params.breakdown,
            progress_every: params.progress_every.max(1),
            cache_limit: params.cache_limit,
            cache_pressure_bytes: params.cache_pressure_bytes,
        })
    }
}

/// Results of one fully processed batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: u64,
    pub keys: u64,
    /// Local top-K, descending.
    pub candidates: Vec<ScoredCandidate>,
    pub best: Option<f64>,
}

/// Where a batch reports while it runs.
pub trait BatchSink {
    fn progress(&mut self, batch_id: u64, keys_done: u64);
    fn warning(&mut self, message: String);
}

/// Case-insensitive containment against an already uppercased needle.
fn contains_folded(hay: &str, needle_upper: &str) -> bool {
    if hay.is_ascii() && needle_upper.is_ascii() {
        let (h, n) = (hay.as_bytes(), needle_upper.as_bytes());
        return n.len() <= h.len()
            && h.windows(n.len()).any(|w| w.eq_ignore_ascii_case(n));
    }
    hay.to_uppercase().contains(needle_upper)
}

/// The single worker contract: decrypt, filter, score, keep the best.
///
/// Owns the per-worker score cache and scratch buffers.
pub struct BatchProcessor {
    job: Arc<Job>,
    cache: ScoreCache,
    projection: Projection,
    plain: String,
}

impl BatchProcessor {
    pub fn new(job: Arc<Job>) -> Self {
        let cache = ScoreCache::new(job.cache_limit, job.cache_pressure_bytes);
        Self {
            job,
            cache,
            projection: Projection::default(),
            plain: String::new(),
        }
    }

    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }

    /// Runs a batch to completion. Returns `None` if `cancel` was raised,
    /// in which case nothing from the batch is reported.
    pub fn process(
        &mut self,
        batch: &Batch,
        cancel: &AtomicBool,
        sink: &mut dyn BatchSink,
    ) -> Option<BatchReport> {
        let Self {
            job,
            cache,
            projection,
            plain,
        } = self;

        if cancel.load(Ordering::Relaxed) {
            return None;
        }

        let mut results = ResultSet::new(job.top_k);
        let mut cursor = batch.cursor(&job.space);
        let mut done = 0u64;

        while let Some(digits) = cursor.next_key() {
            job.prepared.decrypt_into(&job.alphabet, digits, plain);
            let text = plain.as_str();
            done += 1;

            let passes = job
                .known_plaintext
                .as_deref()
                .map_or(true, |kp| contains_folded(text, kp));

            if passes {
                let score = match cache.get(job.method, text) {
                    Some(s) => s,
                    None => {
                        projection.refill(text);
                        let s = job.scorer.score_projected(job.method, projection, text);
                        if let CacheEvent::Pressure { bytes } = cache.insert(job.method, text, s) {
                            sink.warning(format!(
                                "score cache reached ~{} KiB, cleared",
                                bytes / 1024
                            ));
                        }
                        s
                    }
                };

                let clears = score.is_finite() && job.min_score.map_or(true, |min| score >= min);
                if clears {
                    let breakdown = if job.breakdown {
                        Some(job.scorer.breakdown(text))
                    } else {
                        None
                    };
                    results.push(ScoredCandidate {
                        key: job.alphabet.render_key(digits),
                        plaintext: text.to_string(),
                        score,
                        breakdown,
                    });
                }
            }

            if done % job.progress_every == 0 {
                sink.progress(batch.id, done);
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
            }
        }

        if cancel.load(Ordering::Relaxed) {
            return None;
        }

        let best = results.best();
        Some(BatchReport {
            batch_id: batch.id,
            keys: done,
            candidates: results.into_vec(),
            best,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with unknown payload".to_string()
    }
}

struct ChannelSink<'a> {
    worker_id: usize,
    events: &'a Sender<WorkerEvent>,
}

impl BatchSink for ChannelSink<'_> {
    fn progress(&mut self, batch_id: u64, keys_done: u64) {
        let _ = self.events.send(WorkerEvent::Progress {
            worker_id: self.worker_id,
            batch_id,
            keys_done,
        });
    }

    fn warning(&mut self, message: String) {
        let _ = self.events.send(WorkerEvent::Warning {
            worker_id: self.worker_id,
            message,
        });
    }
}

/// Message loop of one worker thread.
pub fn run_worker(
    worker_id: usize,
    commands: Receiver<WorkerCommand>,
    events: Sender<WorkerEvent>,
    cancel: Arc<AtomicBool>,
) {
    let mut processor: Option<BatchProcessor> = None;

    for cmd in commands.iter() {
        match cmd {
            WorkerCommand::Init(job) => {
                processor = Some(BatchProcessor::new(job));
                if events.send(WorkerEvent::Ready { worker_id }).is_err() {
                    break;
                }
            }
            WorkerCommand::Batch(batch) => {
                let Some(worker) = processor.as_mut() else {
                    let _ = events.send(WorkerEvent::Error {
                        worker_id,
                        message: format!("batch {} received before init", batch.id),
                    });
                    continue;
                };

                let mut sink = ChannelSink {
                    worker_id,
                    events: &events,
                };
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    worker.process(&batch, &cancel, &mut sink)
                }));

                let event = match outcome {
                    Ok(Some(report)) => WorkerEvent::Result { worker_id, report },
                    Ok(None) => {
                        debug!("Worker {} abandoned batch {}", worker_id, batch.id);
                        continue;
                    }
                    Err(payload) => {
                        // Scratch state may be inconsistent after a panic.
                        processor = None;
                        WorkerEvent::Error {
                            worker_id,
                            message: format!(
                                "panic in batch {}: {}",
                                batch.id,
                                panic_message(payload.as_ref())
                            ),
                        }
                    }
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            WorkerCommand::Stop => break,
        }
    }
    debug!("Worker {} exiting", worker_id);
}

/// Spawns a named worker thread and returns its command channel.
pub fn spawn_worker(
    worker_id: usize,
    events: Sender<WorkerEvent>,
    cancel: Arc<AtomicBool>,
) -> CfResult<(Sender<WorkerCommand>, JoinHandle<()>)> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let handle = thread::Builder::new()
        .name(format!("cf-worker-{}", worker_id))
        .spawn(move || run_worker(worker_id, rx, events, cancel))?;
    Ok((tx, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringWeights;

    #[derive(Default)]
    struct Recorder {
        progress: Vec<u64>,
        warnings: Vec<String>,
    }

    impl BatchSink for Recorder {
        fn progress(&mut self, _batch_id: u64, keys_done: u64) {
            self.progress.push(keys_done);
        }
        fn warning(&mut self, message: String) {
            self.warnings.push(message);
        }
    }

    fn job(ciphertext: &str, known: Option<&str>, params: EngineParams) -> Arc<Job> {
        let alphabet = Arc::new(Alphabet::english());
        let space = KeySpace::new(26, params.max_key_length).unwrap();
        let scorer = Arc::new(Scorer::new(ScoringWeights::default()).unwrap());
        let attack = AttackParams::builder()
            .ciphertext(ciphertext)
            .known_plaintext(known.map(str::to_string))
            .build();
        Arc::new(Job::new(alphabet, space, scorer, &params, &attack).unwrap())
    }

    #[test]
    fn test_contains_folded() {
        assert!(contains_folded("in the end", "THE"));
        assert!(!contains_folded("TH E", "THE"));
        assert!(contains_folded("straße", "STRASSE"));
    }

    #[test]
    fn test_progress_cadence() {
        let params = EngineParams {
            max_key_length: 2,
            progress_every: 10,
            ..EngineParams::default()
        };
        let mut worker = BatchProcessor::new(job("LXFOPVEFRNHR", None, params));
        let batch = Batch { id: 0, start: 0, end: 35 };
        let mut rec = Recorder::default();
        let report = worker.process(&batch, &AtomicBool::new(false), &mut rec).unwrap();
        assert_eq!(report.keys, 35);
        assert_eq!(rec.progress, vec![10, 20, 30]);
        assert!(report.candidates.len() <= 50);
    }

    #[test]
    fn test_cancel_abandons_batch() {
        let params = EngineParams {
            max_key_length: 2,
            ..EngineParams::default()
        };
        let mut worker = BatchProcessor::new(job("LXFOPVEFRNHR", None, params));
        let batch = Batch { id: 0, start: 0, end: 702 };
        let cancel = AtomicBool::new(true);
        assert!(worker.process(&batch, &cancel, &mut Recorder::default()).is_none());
    }

    #[test]
    fn test_batch_before_init_is_an_error() {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (ev_tx, ev_rx) = crossbeam_channel::unbounded();
        cmd_tx
            .send(WorkerCommand::Batch(Batch { id: 7, start: 0, end: 1 }))
            .unwrap();
        cmd_tx.send(WorkerCommand::Stop).unwrap();
        run_worker(3, cmd_rx, ev_tx, Arc::new(AtomicBool::new(false)));
        match ev_rx.recv().unwrap() {
            WorkerEvent::Error { worker_id, message } => {
                assert_eq!(worker_id, 3);
                assert!(message.contains("batch 7"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
