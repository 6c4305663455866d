use super::aggregator::ResultSet;
use super::progress::ProgressSnapshot;
use super::protocol::{WorkerCommand, WorkerEvent};
use super::worker::{spawn_worker, Job};
use super::{AttackParams, ScoredCandidate};
use crate::alphabet::Alphabet;
use crate::config::EngineParams;
use crate::error::{CfResult, CipherForgeError, ErrorEvent};
use crate::export::ExportPayload;
use crate::keyspace::KeySpace;
use crate::scorer::Scorer;
use crossbeam_channel::{select, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use strum_macros::Display;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    /// Nothing configured, or the last run was stopped.
    Idle,
    /// Configured by `init`, waiting for `start`.
    Initializing,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    /// Still running; the report is a snapshot.
    Partial,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub keys_tested: u64,
    pub total_keys: u64,
    pub best_score: Option<f64>,
    pub results: Vec<ScoredCandidate>,
    pub batches_completed: u64,
    pub batches_total: u64,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(
            self.keys_tested,
            self.total_keys,
            self.best_score,
            Duration::from_millis(self.elapsed_ms),
        )
    }
}

/// Everything the host hears about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EngineEvent {
    Progress(ProgressSnapshot),
    /// Current top-K, descending.
    Results(Vec<ScoredCandidate>),
    Warning(String),
    Error(ErrorEvent),
    Finished(RunReport),
}

/// Coordinator-side bookkeeping for one worker.
#[derive(Debug, Clone)]
pub struct WorkerState {
    pub id: usize,
    pub ready: bool,
    pub busy: bool,
    pub batch: Option<u64>,
    /// Keys in batches this worker has completed.
    pub keys_processed: u64,
    /// Keys done in the current batch, per its last progress message.
    pub in_flight: u64,
    pub last_progress: Instant,
    stall_reported: bool,
}

impl WorkerState {
    fn new(id: usize) -> Self {
        Self {
            id,
            ready: false,
            busy: false,
            batch: None,
            keys_processed: 0,
            in_flight: 0,
            last_progress: Instant::now(),
            stall_reported: false,
        }
    }
}

/// State of one attack, owned by the coordinator thread.
#[derive(Debug)]
pub struct RunState {
    pub job: Arc<Job>,
    pub batch_size: u64,
    pub batch_total: u64,
    pub next_batch: u64,
    pub batches_completed: u64,
    pub workers: Vec<WorkerState>,
    pub results: ResultSet,
    pub started: Instant,
}

impl RunState {
    fn new(job: Arc<Job>, batch_size: u64, workers: usize) -> Self {
        let batch_total = job.space.batch_count(batch_size);
        let results = ResultSet::new(job.top_k);
        Self {
            job,
            batch_size,
            batch_total,
            next_batch: 0,
            batches_completed: 0,
            workers: (0..workers).map(WorkerState::new).collect(),
            results,
            started: Instant::now(),
        }
    }

    pub fn total_keys(&self) -> u64 {
        self.job.space.total()
    }

    /// Only grows: completed keys plus the high-water mark of each batch in flight.
    pub fn keys_tested(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.keys_processed + w.in_flight)
            .sum()
    }

    pub fn is_complete(&self) -> bool {
        self.next_batch >= self.batch_total && self.workers.iter().all(|w| !w.busy)
    }

    fn report(&mut self, outcome: RunOutcome) -> RunReport {
        RunReport {
            outcome,
            keys_tested: self.keys_tested(),
            total_keys: self.total_keys(),
            best_score: self.results.best(),
            results: self.results.to_vec(),
            batches_completed: self.batches_completed,
            batches_total: self.batch_total,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(
            self.keys_tested(),
            self.total_keys(),
            self.results.best(),
            self.started.elapsed(),
        )
    }
}

struct Shared {
    phase: RunPhase,
    events: Option<Sender<EngineEvent>>,
    report: RunReport,
    failure: Option<CipherForgeError>,
}

impl Shared {
    fn send(&self, event: EngineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

// Shared holds plain data only, so a poisoned lock is still consistent.
fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stops a run from any thread.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Mutex<Shared>>,
    cancel: Arc<AtomicBool>,
    wake: Sender<()>,
}

impl CancelHandle {
    /// Idempotent. Returns at once without waiting for in-flight batches.
    /// Once this returns no further events are delivered.
    pub fn stop(&self) {
        let mut s = lock(&self.shared);
        if s.phase != RunPhase::Running {
            return;
        }
        self.cancel.store(true, Ordering::Release);
        s.phase = RunPhase::Idle;
        s.report.outcome = RunOutcome::Cancelled;
        s.events = None;
        let _ = self.wake.try_send(());
        info!("Run cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

struct Coordinator {
    state: RunState,
    commands: Vec<Sender<WorkerCommand>>,
    handles: Vec<JoinHandle<()>>,
    events: Receiver<WorkerEvent>,
    wake: Receiver<()>,
    cancel: Arc<AtomicBool>,
    shared: Arc<Mutex<Shared>>,
    poll: Duration,
    report_every: Duration,
    stall_timeout: Duration,
    last_report: Instant,
}

impl Coordinator {
    fn run(mut self) {
        match self.drive() {
            Ok(true) => self.finish_completed(),
            Ok(false) => self.finish_cancelled(),
            Err(e) => self.finish_failed(e),
        }
    }

    /// `Ok(true)` on completion, `Ok(false)` on cancellation.
    fn drive(&mut self) -> CfResult<bool> {
        // 1. Provision
        for (id, tx) in self.commands.iter().enumerate() {
            tx.send(WorkerCommand::Init(Arc::clone(&self.state.job)))
                .map_err(|_| CipherForgeError::WorkerFailure {
                    worker_id: id,
                    message: "worker exited before init".to_string(),
                })?;
        }

        // 2. Dispatch until done
        let (events, wake) = (self.events.clone(), self.wake.clone());
        loop {
            if self.cancel.load(Ordering::Acquire) {
                return Ok(false);
            }
            self.dispatch()?;
            if self.state.is_complete() {
                return Ok(true);
            }

            select! {
                recv(events) -> msg => match msg {
                    Ok(event) => self.handle(event)?,
                    Err(_) => {
                        return Err(CipherForgeError::WorkerFailure {
                            worker_id: 0,
                            message: "all workers disconnected".to_string(),
                        })
                    }
                },
                recv(wake) -> msg => {
                    if msg.is_err() {
                        // Every handle is gone; nobody can observe the run.
                        self.cancel.store(true, Ordering::Release);
                    }
                },
                default(self.poll) => {},
            }

            self.check_stalls();
            if self.last_report.elapsed() >= self.report_every {
                self.emit(EngineEvent::Progress(self.state.snapshot()));
                self.last_report = Instant::now();
            }
        }
    }

    /// Hands the next batches, in key-space order, to idle workers.
    fn dispatch(&mut self) -> CfResult<()> {
        let state = &mut self.state;
        for (w, tx) in state.workers.iter_mut().zip(self.commands.iter()) {
            if state.next_batch >= state.batch_total {
                break;
            }
            if !w.ready || w.busy {
                continue;
            }
            let Some(batch) = state.job.space.batch(state.next_batch, state.batch_size) else {
                break;
            };
            tx.send(WorkerCommand::Batch(batch))
                .map_err(|_| CipherForgeError::WorkerFailure {
                    worker_id: w.id,
                    message: "command channel closed".to_string(),
                })?;
            debug!("Batch {} [{}, {}) -> worker {}", batch.id, batch.start, batch.end, w.id);

            w.busy = true;
            w.batch = Some(batch.id);
            w.in_flight = 0;
            w.last_progress = Instant::now();
            w.stall_reported = false;
            state.next_batch += 1;
        }
        Ok(())
    }

    fn handle(&mut self, event: WorkerEvent) -> CfResult<()> {
        let id = event.worker_id();
        let Some(w) = self.state.workers.get_mut(id) else {
            warn!("Message from unknown worker {}", id);
            return Ok(());
        };

        match event {
            WorkerEvent::Ready { .. } => {
                w.ready = true;
            }
            WorkerEvent::Progress {
                batch_id,
                keys_done,
                ..
            } => {
                if w.batch == Some(batch_id) {
                    w.in_flight = w.in_flight.max(keys_done);
                    w.last_progress = Instant::now();
                    w.stall_reported = false;
                }
            }
            WorkerEvent::Result { report, .. } => {
                if w.batch != Some(report.batch_id) {
                    warn!("Worker {} reported batch {} it does not own", id, report.batch_id);
                    return Ok(());
                }
                w.keys_processed += report.keys;
                w.in_flight = 0;
                w.busy = false;
                w.batch = None;
                w.last_progress = Instant::now();
                self.state.batches_completed += 1;

                let changed = self.state.results.add(report.candidates);
                self.publish();
                if changed {
                    let top = self.state.results.to_vec();
                    self.emit(EngineEvent::Results(top));
                }
            }
            WorkerEvent::Warning { message, .. } => {
                warn!("Worker {}: {}", id, message);
                self.emit(EngineEvent::Warning(format!("worker {}: {}", id, message)));
            }
            WorkerEvent::Error { message, .. } => {
                return Err(CipherForgeError::WorkerFailure {
                    worker_id: id,
                    message,
                });
            }
        }
        Ok(())
    }

    fn check_stalls(&mut self) {
        let timeout = self.stall_timeout;
        let mut stalled = Vec::new();
        for w in self.state.workers.iter_mut() {
            if w.busy && !w.stall_reported && w.last_progress.elapsed() > timeout {
                w.stall_reported = true;
                stalled.push((w.id, w.batch));
            }
        }
        for (id, batch) in stalled {
            warn!("Worker {} silent for over {:?} on batch {:?}", id, timeout, batch);
            self.emit(EngineEvent::Warning(format!(
                "worker {} has not reported for {}s",
                id,
                timeout.as_secs()
            )));
        }
    }

    fn emit(&self, event: EngineEvent) {
        lock(&self.shared).send(event);
    }

    /// Refreshes the report visible to the host while running.
    fn publish(&mut self) {
        let report = self.state.report(RunOutcome::Partial);
        let mut s = lock(&self.shared);
        if s.phase == RunPhase::Running {
            s.report = report;
        }
    }

    fn teardown(&mut self, join: bool) {
        for tx in &self.commands {
            let _ = tx.send(WorkerCommand::Stop);
        }
        if join {
            for h in self.handles.drain(..) {
                let _ = h.join();
            }
        } else {
            // Detach; cancelled workers drop their batch at the next checkpoint.
            self.handles.clear();
        }
    }

    fn finish_completed(&mut self) {
        self.teardown(true);
        let report = self.state.report(RunOutcome::Completed);
        info!(
            "Run complete: {} keys in {} ms, best {:?}",
            report.keys_tested, report.elapsed_ms, report.best_score
        );

        let mut s = lock(&self.shared);
        if s.phase != RunPhase::Running {
            return;
        }
        s.send(EngineEvent::Progress(report.progress()));
        s.send(EngineEvent::Results(report.results.clone()));
        s.send(EngineEvent::Finished(report.clone()));
        s.phase = RunPhase::Completed;
        s.report = report;
        s.events = None;
    }

    fn finish_cancelled(&mut self) {
        self.teardown(false);
        let report = self.state.report(RunOutcome::Cancelled);
        let mut s = lock(&self.shared);
        if s.phase == RunPhase::Running {
            s.phase = RunPhase::Idle;
            s.report = report;
            s.events = None;
        }
        debug!("Coordinator exited after cancel");
    }

    fn finish_failed(&mut self, err: CipherForgeError) {
        error!("Run failed: {}", err);
        self.cancel.store(true, Ordering::Release);
        self.teardown(false);
        let report = self.state.report(RunOutcome::Failed);

        let mut s = lock(&self.shared);
        if s.phase != RunPhase::Running {
            return;
        }
        s.send(EngineEvent::Error(err.to_event()));
        s.send(EngineEvent::Finished(report.clone()));
        s.phase = RunPhase::Failed;
        s.report = report;
        s.failure = Some(err);
        s.events = None;
    }
}

struct RunSetup {
    alphabet: Arc<Alphabet>,
    space: KeySpace,
    workers: usize,
    batch_size: u64,
}

struct ActiveRun {
    handle: CancelHandle,
    coordinator: Option<JoinHandle<()>>,
    attack: AttackParams,
}

/// Drives brute-force runs over a pool of worker threads.
///
/// `init` configures the key space, `start` launches a run and returns its
/// event stream, `stop` cancels it.
pub struct Orchestrator {
    scorer: Arc<Scorer>,
    params: EngineParams,
    setup: Option<RunSetup>,
    run: Option<ActiveRun>,
}

impl Orchestrator {
    pub fn new(scorer: Arc<Scorer>, params: EngineParams) -> Self {
        Self {
            scorer,
            params,
            setup: None,
            run: None,
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn init(&mut self, alphabet: &str, workers: usize, max_key_length: usize) -> CfResult<()> {
        if self.phase() == RunPhase::Running {
            return Err(CipherForgeError::InvalidConfiguration(
                "cannot re-initialise while a run is in progress".to_string(),
            ));
        }

        // 1. Validate everything before provisioning anything
        let alphabet = Alphabet::new(alphabet)?;
        if workers == 0 {
            return Err(CipherForgeError::InvalidConfiguration(
                "worker count must be at least 1".to_string(),
            ));
        }
        if max_key_length == 0 {
            return Err(CipherForgeError::InvalidConfiguration(
                "max key length must be at least 1".to_string(),
            ));
        }
        self.params.validate()?;

        // 2. Size the key space
        let space = KeySpace::new(alphabet.len(), max_key_length)?;
        let batch_size = self.params.resolved_batch_size(workers);
        info!(
            "Initialised: {} symbols, keys up to {} ({} keys), {} workers, {} keys/batch",
            alphabet.len(),
            max_key_length,
            space.total(),
            workers,
            batch_size
        );

        self.params.workers = workers;
        self.params.max_key_length = max_key_length;
        self.setup = Some(RunSetup {
            alphabet: Arc::new(alphabet),
            space,
            workers,
            batch_size,
        });
        self.run = None;
        Ok(())
    }

    pub fn start(&mut self, attack: AttackParams) -> CfResult<Receiver<EngineEvent>> {
        self.start_with(attack, spawn_worker)
    }

    /// `start` with a custom worker launcher.
    fn start_with<S>(&mut self, attack: AttackParams, mut spawn: S) -> CfResult<Receiver<EngineEvent>>
    where
        S: FnMut(
            usize,
            Sender<WorkerEvent>,
            Arc<AtomicBool>,
        ) -> CfResult<(Sender<WorkerCommand>, JoinHandle<()>)>,
    {
        if self.phase() == RunPhase::Running {
            return Err(CipherForgeError::InvalidConfiguration(
                "a run is already in progress".to_string(),
            ));
        }
        let setup = self.setup.as_ref().ok_or_else(|| {
            CipherForgeError::InvalidConfiguration("init must be called before start".to_string())
        })?;

        // 1. Shared job (rejects empty ciphertext)
        let job = Arc::new(Job::new(
            Arc::clone(&setup.alphabet),
            setup.space.clone(),
            Arc::clone(&self.scorer),
            &self.params,
            &attack,
        )?);

        // 2. Channels
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (worker_tx, worker_rx) = crossbeam_channel::unbounded();
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));

        // 3. Workers
        let mut commands = Vec::with_capacity(setup.workers);
        let mut handles = Vec::with_capacity(setup.workers);
        for id in 0..setup.workers {
            match spawn(id, worker_tx.clone(), Arc::clone(&cancel)) {
                Ok((tx, h)) => {
                    commands.push(tx);
                    handles.push(h);
                }
                Err(e) => {
                    cancel.store(true, Ordering::Release);
                    for tx in &commands {
                        let _ = tx.send(WorkerCommand::Stop);
                    }
                    return Err(e);
                }
            }
        }
        drop(worker_tx);

        // 4. Coordinator
        let mut state = RunState::new(job, setup.batch_size, setup.workers);
        let shared = Arc::new(Mutex::new(Shared {
            phase: RunPhase::Running,
            events: Some(event_tx),
            report: state.report(RunOutcome::Partial),
            failure: None,
        }));
        info!(
            "Starting {} over {} keys in {} batches",
            attack.method,
            state.total_keys(),
            state.batch_total
        );

        let coordinator = Coordinator {
            state,
            commands,
            handles,
            events: worker_rx,
            wake: wake_rx,
            cancel: Arc::clone(&cancel),
            shared: Arc::clone(&shared),
            poll: Duration::from_millis(self.params.poll_interval_ms.max(1)),
            report_every: Duration::from_millis(self.params.report_interval_ms),
            stall_timeout: Duration::from_millis(self.params.stall_timeout_ms),
            last_report: Instant::now(),
        };
        let handle = thread::Builder::new()
            .name("cf-coordinator".to_string())
            .spawn(move || coordinator.run())?;

        self.run = Some(ActiveRun {
            handle: CancelHandle {
                shared,
                cancel,
                wake: wake_tx,
            },
            coordinator: Some(handle),
            attack,
        });
        Ok(event_rx)
    }

    /// See [`CancelHandle::stop`]. A no-op when nothing is running.
    pub fn stop(&self) {
        if let Some(run) = &self.run {
            run.handle.stop();
        }
    }

    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.run.as_ref().map(|r| r.handle.clone())
    }

    pub fn phase(&self) -> RunPhase {
        match (&self.run, &self.setup) {
            (Some(run), _) => lock(&run.handle.shared).phase,
            (None, Some(_)) => RunPhase::Initializing,
            (None, None) => RunPhase::Idle,
        }
    }

    /// Blocks until the coordinator exits. Errors with the worker failure if
    /// the run failed.
    pub fn wait(&mut self) -> CfResult<RunReport> {
        let run = self.run.as_mut().ok_or_else(|| {
            CipherForgeError::InvalidConfiguration("no run has been started".to_string())
        })?;
        if let Some(h) = run.coordinator.take() {
            if h.join().is_err() {
                error!("Coordinator thread panicked");
                let mut s = lock(&run.handle.shared);
                if s.phase == RunPhase::Running {
                    s.phase = RunPhase::Failed;
                    s.report.outcome = RunOutcome::Failed;
                    s.events = None;
                }
            }
        }
        let mut s = lock(&run.handle.shared);
        if let Some(err) = s.failure.take() {
            return Err(err);
        }
        Ok(s.report.clone())
    }

    /// Latest report of the current or last run. Partial while running.
    pub fn report(&self) -> Option<RunReport> {
        self.run
            .as_ref()
            .map(|r| lock(&r.handle.shared).report.clone())
    }

    pub fn export(&self) -> Option<ExportPayload> {
        let run = self.run.as_ref()?;
        let setup = self.setup.as_ref()?;
        let report = lock(&run.handle.shared).report.clone();
        Some(ExportPayload::new(
            &report,
            &run.attack,
            &setup.alphabet,
            setup.space.max_length(),
        ))
    }
}
