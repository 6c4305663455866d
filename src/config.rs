use crate::error::{CfResult, CipherForgeError};
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[command(flatten)]
    pub engine: EngineParams,
    #[command(flatten)]
    pub weights: ScoringWeights,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    #[arg(short = 'w', long, default_value_t = 4)]
    pub workers: usize,
    #[arg(short = 'm', long, default_value_t = 3)]
    pub max_key_length: usize,

    // Keys per batch. Defaults to workers * 100.
    #[arg(long)]
    pub batch_size: Option<u64>,

    #[arg(long, default_value_t = 50)]
    pub top_k: usize,

    // Candidates scoring below this are dropped by the worker.
    #[arg(long)]
    pub min_score: Option<f64>,

    #[arg(long, default_value_t = false)]
    pub breakdown: bool,

    // === CADENCE ===
    #[arg(long, default_value_t = 100)]
    pub progress_every: u64,
    #[arg(long, default_value_t = 50)]
    pub poll_interval_ms: u64,
    #[arg(long, default_value_t = 250)]
    pub report_interval_ms: u64,
    #[arg(long, default_value_t = 30_000)]
    pub stall_timeout_ms: u64,

    // === WORKER CACHE ===
    #[arg(long, default_value_t = 10_000)]
    pub cache_limit: usize,
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    pub cache_pressure_bytes: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            workers: 4,
            max_key_length: 3,
            batch_size: None,
            top_k: 50,
            min_score: None,
            breakdown: false,
            progress_every: 100,
            poll_interval_ms: 50,
            report_interval_ms: 250,
            stall_timeout_ms: 30_000,
            cache_limit: 10_000,
            cache_pressure_bytes: 16 * 1024 * 1024,
        }
    }
}

impl EngineParams {
    pub fn resolved_batch_size(&self, workers: usize) -> u64 {
        self.batch_size
            .filter(|&b| b > 0)
            .unwrap_or((workers.max(1) as u64) * 100)
    }

    pub fn validate(&self) -> CfResult<()> {
        if self.top_k == 0 {
            return Err(CipherForgeError::InvalidConfiguration(
                "top_k must be positive".to_string(),
            ));
        }
        if self.progress_every == 0 {
            return Err(CipherForgeError::InvalidConfiguration(
                "progress_every must be positive".to_string(),
            ));
        }
        if let Some(min) = self.min_score {
            if min.is_nan() {
                return Err(CipherForgeError::InvalidConfiguration(
                    "min_score cannot be NaN".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    // === N-GRAMS ===
    // Probability assigned to n-grams missing from the reference table.
    #[arg(long, default_value_t = 1e-10)]
    pub ngram_floor: f64,

    // === INDEX OF COINCIDENCE ===
    #[arg(long, default_value_t = 0.0667)]
    pub reference_ic: f64,

    // === COMBINED BLEND ===
    // Longer n-grams carry more weight.
    #[arg(long, default_value_t = 0.10)]
    pub weight_bigram: f64,
    #[arg(long, default_value_t = 0.20)]
    pub weight_trigram: f64,
    #[arg(long, default_value_t = 0.30)]
    pub weight_quadgram: f64,
    #[arg(long, default_value_t = 0.15)]
    pub weight_ic: f64,
    #[arg(long, default_value_t = 0.15)]
    pub weight_chi: f64,
    #[arg(long, default_value_t = 0.10)]
    pub weight_words: f64,

    // === WORDS ===
    /// Bonus per recognised two-letter word. The defaults keep the long-standing
    /// weighting, where a frequent three-letter word counts for more than a
    /// two-letter one; lower `bonus_top_word` to favour shorter matches.
    #[arg(long, default_value_t = 8.0)]
    pub bonus_two_letter_word: f64,
    /// Bonus per word from the top-frequency list.
    #[arg(long, default_value_t = 15.0)]
    pub bonus_top_word: f64,

    // === HEURISTIC (bigram hit rate + words) ===
    #[arg(long, default_value_t = 60.0)]
    pub heuristic_bigram_cap: f64,
    #[arg(long, default_value_t = 120.0)]
    pub heuristic_bigram_scale: f64,

    // === PENALTIES ===
    #[arg(long, default_value_t = 5.0)]
    pub penalty_impossible_bigram: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            ngram_floor: 1e-10,
            reference_ic: 0.0667,
            weight_bigram: 0.10,
            weight_trigram: 0.20,
            weight_quadgram: 0.30,
            weight_ic: 0.15,
            weight_chi: 0.15,
            weight_words: 0.10,
            bonus_two_letter_word: 8.0,
            bonus_top_word: 15.0,
            heuristic_bigram_cap: 60.0,
            heuristic_bigram_scale: 120.0,
            penalty_impossible_bigram: 5.0,
        }
    }
}

impl ScoringWeights {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> CfResult<Self> {
        let content = fs::read_to_string(path)?;
        let weights: Self = serde_json::from_str(&content)?;
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> CfResult<()> {
        if !(self.ngram_floor > 0.0 && self.ngram_floor < 1.0) {
            return Err(CipherForgeError::InvalidConfiguration(format!(
                "ngram_floor must be in (0, 1), got {}",
                self.ngram_floor
            )));
        }
        if self.reference_ic <= 0.0 {
            return Err(CipherForgeError::InvalidConfiguration(format!(
                "reference_ic must be positive, got {}",
                self.reference_ic
            )));
        }
        Ok(())
    }

    /// Applies only the values the user typed on the command line.
    pub fn merge_from_cli(&mut self, cli_weights: &ScoringWeights, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$field = cli_weights.$field;
                }
            };
        }

        update_if_present!(ngram_floor);
        update_if_present!(reference_ic);

        update_if_present!(weight_bigram);
        update_if_present!(weight_trigram);
        update_if_present!(weight_quadgram);
        update_if_present!(weight_ic);
        update_if_present!(weight_chi);
        update_if_present!(weight_words);

        update_if_present!(bonus_two_letter_word);
        update_if_present!(bonus_top_word);
        update_if_present!(heuristic_bigram_cap);
        update_if_present!(heuristic_bigram_scale);

        update_if_present!(penalty_impossible_bigram);
    }
}
