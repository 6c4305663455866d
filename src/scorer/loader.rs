use super::tables::{letter_index, LanguageModel, NgramTable};
use crate::error::CfResult;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// N-gram counts read from a `GRAM<TAB>COUNT` file, grouped by size.
#[derive(Debug, Default)]
pub struct RawNgrams {
    pub letters: [f64; 26],
    pub bigrams: Vec<(String, f64)>,
    pub trigrams: Vec<(String, f64)>,
    pub quadgrams: Vec<(String, f64)>,
}

pub fn load_ngrams<R: Read>(reader: R) -> CfResult<RawNgrams> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let mut raw = RawNgrams::default();
    let mut lines_read = 0;
    let mut skipped = 0;

    for result in rdr.records() {
        lines_read += 1;
        let rec = result?;
        if rec.len() < 2 {
            skipped += 1;
            continue;
        }

        let gram = rec[0].trim().to_ascii_uppercase();
        if gram.is_empty() || !gram.bytes().all(|b| b.is_ascii_uppercase()) {
            skipped += 1;
            continue;
        }

        let count: f64 = match rec[1].trim().parse() {
            Ok(v) if v > 0.0 => v,
            _ => {
                skipped += 1;
                continue;
            }
        };

        match gram.len() {
            1 => {
                if let Some(i) = letter_index(gram.as_bytes()[0]) {
                    raw.letters[i as usize] += count;
                }
            }
            2 => raw.bigrams.push((gram, count)),
            3 => raw.trigrams.push((gram, count)),
            4 => raw.quadgrams.push((gram, count)),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unusable n-gram rows", skipped);
    }
    debug!(
        "Scanned {} lines. Loaded: {} 2-grams, {} 3-grams, {} 4-grams.",
        lines_read,
        raw.bigrams.len(),
        raw.trigrams.len(),
        raw.quadgrams.len()
    );

    Ok(raw)
}

pub fn load_ngrams_from_file<P: AsRef<Path>>(path: P) -> CfResult<RawNgrams> {
    let file = File::open(path.as_ref())?;
    load_ngrams(file)
}

impl RawNgrams {
    /// Replaces every table of `base` for which this file carried data.
    pub fn apply_to(self, mut base: LanguageModel, floor: f64) -> LanguageModel {
        let letter_total: f64 = self.letters.iter().sum();
        if letter_total > 0.0 {
            for (dst, &c) in base.letter_freqs.iter_mut().zip(self.letters.iter()) {
                *dst = c / letter_total;
            }
        }
        if !self.bigrams.is_empty() {
            base.bigrams = NgramTable::from_counts(2, self.bigrams, floor);
        }
        if !self.trigrams.is_empty() {
            base.trigrams = NgramTable::from_counts(3, self.trigrams, floor);
        }
        if !self.quadgrams.is_empty() {
            base.quadgrams = NgramTable::from_counts(4, self.quadgrams, floor);
        }
        base
    }
}
