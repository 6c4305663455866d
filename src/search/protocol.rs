//! Closed message set between the coordinator and its workers.

use super::worker::{BatchReport, Job};
use crate::keyspace::Batch;
use std::sync::Arc;

#[derive(Debug)]
pub enum WorkerCommand {
    /// Install the run's shared job. Answered with `Ready`.
    Init(Arc<Job>),
    Batch(Batch),
    Stop,
}

#[derive(Debug)]
pub enum WorkerEvent {
    Ready {
        worker_id: usize,
    },
    /// Keys done so far in the current batch.
    Progress {
        worker_id: usize,
        batch_id: u64,
        keys_done: u64,
    },
    Result {
        worker_id: usize,
        report: BatchReport,
    },
    Warning {
        worker_id: usize,
        message: String,
    },
    /// Fatal for the whole run.
    Error {
        worker_id: usize,
        message: String,
    },
}

impl WorkerEvent {
    pub fn worker_id(&self) -> usize {
        match self {
            Self::Ready { worker_id }
            | Self::Progress { worker_id, .. }
            | Self::Result { worker_id, .. }
            | Self::Warning { worker_id, .. }
            | Self::Error { worker_id, .. } => *worker_id,
        }
    }
}
