pub mod cache;
pub mod loader;
pub mod metrics;
pub mod tables;

use self::metrics::{Projection, UNSCOREABLE};
use self::tables::LanguageModel;
use crate::config::ScoringWeights;
use crate::error::CfResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringMethod {
    Bigram,
    Trigram,
    Quadgram,
    #[strum(to_string = "ic")]
    #[serde(rename = "ic")]
    IndexOfCoincidence,
    ChiSquared,
    Words,
    Heuristic,
    #[default]
    Combined,
}

impl ScoringMethod {
    /// Shortest letters-only length the method can score.
    pub fn min_len(&self) -> usize {
        match self {
            Self::Bigram => 2,
            Self::Trigram => 3,
            Self::Quadgram => 4,
            Self::IndexOfCoincidence => metrics::MIN_LEN_IC,
            Self::ChiSquared => metrics::MIN_LEN_CHI,
            Self::Words => metrics::MIN_LEN_WORDS,
            Self::Heuristic => metrics::MIN_LEN_HEURISTIC,
            Self::Combined => metrics::MIN_LEN_CHI,
        }
    }
}

/// Every metric evaluated on one text. Unscoreable values are `None`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub bigram: Option<f64>,
    pub trigram: Option<f64>,
    pub quadgram: Option<f64>,
    pub index_of_coincidence: Option<f64>,
    pub chi_squared: Option<f64>,
    pub words: Option<f64>,
    pub heuristic: Option<f64>,
    pub combined: Option<f64>,

    // Raw counts
    pub bigram_hits: u32,
    pub word_hits: u32,
    pub impossible_bigrams: u32,
}

#[inline]
fn scoreable(x: f64) -> Option<f64> {
    if x.is_finite() {
        Some(x)
    } else {
        None
    }
}

/// Reference data plus weights. Immutable once built; shared across workers
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Scorer {
    pub model: LanguageModel,
    pub weights: ScoringWeights,
}

impl Scorer {
    /// English reference tables.
    pub fn new(weights: ScoringWeights) -> CfResult<Self> {
        weights.validate()?;
        let model = LanguageModel::english(weights.ngram_floor);
        Ok(Self { model, weights })
    }

    pub fn with_model(model: LanguageModel, weights: ScoringWeights) -> Self {
        Self { model, weights }
    }

    /// English tables overridden by any tables present in the given TSV files.
    pub fn from_ngram_files<P: AsRef<Path>>(paths: &[P], weights: ScoringWeights) -> CfResult<Self> {
        weights.validate()?;
        let mut model = LanguageModel::english(weights.ngram_floor);
        for path in paths {
            let raw = loader::load_ngrams_from_file(path)?;
            model = raw.apply_to(model, weights.ngram_floor);
        }
        Ok(Self { model, weights })
    }

    pub fn score(&self, method: ScoringMethod, text: &str) -> f64 {
        let p = Projection::new(text);
        self.score_projected(method, &p, text)
    }

    /// Scores with a caller-owned projection of `text`.
    pub fn score_projected(&self, method: ScoringMethod, p: &Projection, text: &str) -> f64 {
        let m = &self.model;
        let w = &self.weights;
        match method {
            ScoringMethod::Bigram => metrics::ngram_log_likelihood(&m.bigrams, p),
            ScoringMethod::Trigram => metrics::ngram_log_likelihood(&m.trigrams, p),
            ScoringMethod::Quadgram => metrics::ngram_log_likelihood(&m.quadgrams, p),
            ScoringMethod::IndexOfCoincidence => {
                metrics::index_of_coincidence(p, w.reference_ic)
            }
            ScoringMethod::ChiSquared => match metrics::chi_squared(m, p) {
                Some(chi) => -chi,
                None => UNSCOREABLE,
            },
            ScoringMethod::Words => {
                if p.len() < metrics::MIN_LEN_WORDS {
                    UNSCOREABLE
                } else {
                    metrics::word_hits(m, w, text).score
                }
            }
            ScoringMethod::Heuristic => metrics::heuristic(m, w, p, text),
            ScoringMethod::Combined => metrics::combined(m, w, p, text),
        }
    }

    pub fn breakdown(&self, text: &str) -> ScoreBreakdown {
        let p = Projection::new(text);
        let words = metrics::word_hits(&self.model, &self.weights, text);
        let at = |method| scoreable(self.score_projected(method, &p, text));

        ScoreBreakdown {
            bigram: at(ScoringMethod::Bigram),
            trigram: at(ScoringMethod::Trigram),
            quadgram: at(ScoringMethod::Quadgram),
            index_of_coincidence: metrics::index_of_coincidence_raw(&p),
            chi_squared: metrics::chi_squared(&self.model, &p),
            words: at(ScoringMethod::Words),
            heuristic: at(ScoringMethod::Heuristic),
            combined: at(ScoringMethod::Combined),
            bigram_hits: metrics::common_bigram_hits(&self.model, &p),
            word_hits: words.total(),
            impossible_bigrams: metrics::impossible_bigrams(&self.model, &p),
        }
    }
}
