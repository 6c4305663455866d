pub mod aggregator;
pub mod orchestrator;
pub mod progress;
pub mod protocol;
pub mod runner;
pub mod worker;

pub use aggregator::ResultSet;
pub use orchestrator::{
    CancelHandle, EngineEvent, Orchestrator, RunOutcome, RunPhase, RunReport,
};
pub use progress::{format_eta, ProgressCallback, ProgressSnapshot};
pub use runner::crack;

use crate::scorer::{ScoreBreakdown, ScoringMethod};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Inputs of one attack.
#[derive(TypedBuilder, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackParams {
    #[builder(setter(into))]
    pub ciphertext: String,
    #[builder(default)]
    pub method: ScoringMethod,
    /// Case-insensitive substring every accepted decryption must contain.
    #[builder(default, setter(into))]
    pub known_plaintext: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub key: String,
    pub plaintext: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
}
