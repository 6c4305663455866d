use crate::alphabet::Alphabet;
use crate::error::CfResult;
use crate::scorer::ScoringMethod;
use crate::search::{AttackParams, RunOutcome, RunReport, ScoredCandidate};
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStats {
    pub keys_tested: u64,
    pub total_keys: u64,
    pub best_score: Option<f64>,
    pub outcome: RunOutcome,
    pub elapsed_ms: u64,
}

/// Saved results of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub ciphertext: String,
    pub alphabet: String,
    pub max_key_length: usize,
    pub scoring_method: ScoringMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_plaintext: Option<String>,
    pub results: Vec<ScoredCandidate>,
    pub stats: ExportStats,
    pub exported_at: String,
}

impl ExportPayload {
    pub fn new(
        report: &RunReport,
        attack: &AttackParams,
        alphabet: &Alphabet,
        max_key_length: usize,
    ) -> Self {
        Self {
            ciphertext: attack.ciphertext.clone(),
            alphabet: alphabet.as_string(),
            max_key_length,
            scoring_method: attack.method,
            known_plaintext: attack.known_plaintext.clone(),
            results: report.results.clone(),
            stats: ExportStats {
                keys_tested: report.keys_tested,
                total_keys: report.total_keys,
                best_score: report.best_score,
                outcome: report.outcome,
                elapsed_ms: report.elapsed_ms,
            },
            exported_at: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }

    pub fn to_json(&self) -> CfResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> CfResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!("Exported {} results to {}", self.results.len(), path.display());
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> CfResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// `vigenere-breaker-results-YYYY-MM-DD.json`, dated today.
pub fn default_file_name() -> String {
    format!(
        "vigenere-breaker-results-{}.json",
        Local::now().format("%Y-%m-%d")
    )
}
