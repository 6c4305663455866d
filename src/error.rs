use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CipherForgeError {
    #[error("Invalid alphabet '{alphabet}': {reason}")]
    InvalidAlphabet { alphabet: String, reason: String },

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Configuration Error: {0}")]
    InvalidConfiguration(String),

    #[error("Ciphertext cannot be empty")]
    EmptyCiphertext,

    #[error("Key space overflow: {alphabet_size}^1 + .. + {alphabet_size}^{max_length} exceeds u64")]
    Overflow {
        alphabet_size: usize,
        max_length: usize,
    },

    #[error("Worker {worker_id} failed: {message}")]
    WorkerFailure { worker_id: usize, message: String },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CfResult<T> = Result<T, CipherForgeError>;

/// Coarse classification handed to the host alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidAlphabet,
    InvalidKey,
    InvalidConfiguration,
    EmptyCiphertext,
    Overflow,
    WorkerFailure,
    Io,
}

/// Outbound `{kind, message}` error event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub message: String,
}

impl CipherForgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAlphabet { .. } => ErrorKind::InvalidAlphabet,
            Self::InvalidKey { .. } => ErrorKind::InvalidKey,
            Self::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Self::EmptyCiphertext => ErrorKind::EmptyCiphertext,
            Self::Overflow { .. } => ErrorKind::Overflow,
            Self::WorkerFailure { .. } => ErrorKind::WorkerFailure,
            Self::Io(_) | Self::Csv(_) | Self::Json(_) => ErrorKind::Io,
        }
    }

    pub fn to_event(&self) -> ErrorEvent {
        ErrorEvent {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<&CipherForgeError> for ErrorEvent {
    fn from(e: &CipherForgeError) -> Self {
        e.to_event()
    }
}
