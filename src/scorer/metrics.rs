//! Individual scoring metrics. Every function returns `UNSCOREABLE` when the
//! letters-only projection is shorter than the metric needs.

use super::tables::{letter_index, LanguageModel, NgramTable};
use crate::config::ScoringWeights;

pub const UNSCOREABLE: f64 = f64::NEG_INFINITY;

pub const MIN_LEN_IC: usize = 2;
pub const MIN_LEN_CHI: usize = 5;
pub const MIN_LEN_WORDS: usize = 2;
pub const MIN_LEN_HEURISTIC: usize = 5;

/// Letters-only, uppercased view of a text as A..Z indices.
#[derive(Debug, Default, Clone)]
pub struct Projection {
    pub letters: Vec<u8>,
}

impl Projection {
    pub fn new(text: &str) -> Self {
        let mut p = Self::default();
        p.refill(text);
        p
    }

    /// Reuses the allocation for a new text.
    pub fn refill(&mut self, text: &str) {
        self.letters.clear();
        self.letters
            .extend(text.bytes().filter_map(letter_index));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }
}

/// Mean `log10` probability over all overlapping n-grams.
pub fn ngram_log_likelihood(table: &NgramTable, p: &Projection) -> f64 {
    let n = table.n();
    if p.len() < n {
        return UNSCOREABLE;
    }
    let windows = p.letters.windows(n);
    let count = windows.len();
    let sum: f64 = windows.map(|w| table.log_prob(w)).sum();
    sum / count as f64
}

/// Log-likelihood rescaled to 0..100, where 0 means every n-gram hit the floor.
pub fn ngram_fitness(table: &NgramTable, p: &Projection) -> f64 {
    let mean = ngram_log_likelihood(table, p);
    if mean == UNSCOREABLE {
        return UNSCOREABLE;
    }
    let floor = table.floor_log();
    (100.0 * (1.0 - mean / floor)).clamp(0.0, 100.0)
}

fn letter_counts(p: &Projection) -> [u32; 26] {
    let mut counts = [0u32; 26];
    for &l in &p.letters {
        counts[l as usize] += 1;
    }
    counts
}

pub fn index_of_coincidence_raw(p: &Projection) -> Option<f64> {
    let n = p.len();
    if n < MIN_LEN_IC {
        return None;
    }
    let counts = letter_counts(p);
    let num: f64 = counts
        .iter()
        .map(|&c| c as f64 * (c as f64 - 1.0))
        .sum();
    Some(num / (n as f64 * (n as f64 - 1.0)))
}

/// Closeness of the text's IC to the reference, 0..100.
pub fn index_of_coincidence(p: &Projection, reference_ic: f64) -> f64 {
    match index_of_coincidence_raw(p) {
        Some(ic) => {
            let rel = ((ic - reference_ic).abs() / reference_ic).min(1.0);
            100.0 * (1.0 - rel)
        }
        None => UNSCOREABLE,
    }
}

/// Raw chi-squared statistic against the model's letter frequencies.
pub fn chi_squared(model: &LanguageModel, p: &Projection) -> Option<f64> {
    let n = p.len();
    if n < MIN_LEN_CHI {
        return None;
    }
    let counts = letter_counts(p);
    let total = n as f64;
    let chi = counts
        .iter()
        .zip(model.letter_freqs.iter())
        .filter(|&(_, &f)| f > 0.0)
        .map(|(&obs, &f)| {
            let expected = total * f;
            let d = obs as f64 - expected;
            d * d / expected
        })
        .sum();
    Some(chi)
}

/// Chi-squared mapped to 0..100 (100 = perfect fit).
pub fn chi_fitness(model: &LanguageModel, p: &Projection) -> f64 {
    match chi_squared(model, p) {
        Some(chi) => 100.0 / (1.0 + chi / p.len() as f64),
        None => UNSCOREABLE,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WordHits {
    pub score: f64,
    pub two_letter: u32,
    pub top: u32,
}

impl WordHits {
    pub fn total(&self) -> u32 {
        self.two_letter + self.top
    }
}

/// Scores recognised short and frequent words in the original text.
pub fn word_hits(model: &LanguageModel, weights: &ScoringWeights, text: &str) -> WordHits {
    let mut hits = WordHits::default();
    let mut buf = String::new();
    for token in text.split(|c: char| !c.is_ascii_alphabetic()) {
        if token.is_empty() || token.len() > 3 {
            continue;
        }
        buf.clear();
        buf.extend(token.chars().map(|c| c.to_ascii_uppercase()));
        let word = buf.as_str();
        if word.len() == 2 && model.two_letter_words.contains(word) {
            hits.two_letter += 1;
            hits.score += weights.bonus_two_letter_word;
        }
        if model.top_words.contains(word) {
            hits.top += 1;
            hits.score += weights.bonus_top_word;
        }
    }
    hits
}

pub fn impossible_bigrams(model: &LanguageModel, p: &Projection) -> u32 {
    p.letters
        .windows(2)
        .filter(|w| model.is_impossible_bigram(w[0], w[1]))
        .count() as u32
}

pub fn common_bigram_hits(model: &LanguageModel, p: &Projection) -> u32 {
    p.letters
        .windows(2)
        .filter(|w| model.is_common_bigram(w[0], w[1]))
        .count() as u32
}

/// Bigram hit rate plus word bonuses, capped at 100.
pub fn heuristic(
    model: &LanguageModel,
    weights: &ScoringWeights,
    p: &Projection,
    text: &str,
) -> f64 {
    let n = p.len();
    if n < MIN_LEN_HEURISTIC {
        return UNSCOREABLE;
    }
    let hits = common_bigram_hits(model, p) as f64;
    let bigram_pct =
        (hits / (n - 1) as f64 * weights.heuristic_bigram_scale).min(weights.heuristic_bigram_cap);
    let words = word_hits(model, weights, text);
    (bigram_pct + words.score).min(100.0)
}

/// Fixed-weight blend. Components are each on a 0..100 scale; impossible
/// bigrams subtract a flat penalty per occurrence.
pub fn combined(
    model: &LanguageModel,
    weights: &ScoringWeights,
    p: &Projection,
    text: &str,
) -> f64 {
    if p.len() < MIN_LEN_CHI {
        return UNSCOREABLE;
    }
    let words = word_hits(model, weights, text).score.min(100.0);
    weights.weight_bigram * ngram_fitness(&model.bigrams, p)
        + weights.weight_trigram * ngram_fitness(&model.trigrams, p)
        + weights.weight_quadgram * ngram_fitness(&model.quadgrams, p)
        + weights.weight_ic * index_of_coincidence(p, weights.reference_ic)
        + weights.weight_chi * chi_fitness(model, p)
        + weights.weight_words * words
        - weights.penalty_impossible_bigram * impossible_bigrams(model, p) as f64
}
