//! English reference data and the dense n-gram log-probability table.

use std::collections::HashSet;

/// Relative letter frequencies A..Z.
pub const ENGLISH_LETTER_FREQS: [f64; 26] = [
    0.08167, 0.01492, 0.02782, 0.04253, 0.12702, 0.02228, 0.02015, 0.06094, 0.06966, 0.00153,
    0.00772, 0.04025, 0.02406, 0.06749, 0.07507, 0.01929, 0.00095, 0.05987, 0.06327, 0.09056,
    0.02758, 0.00978, 0.02360, 0.00150, 0.01974, 0.00074,
];

// Percent of all n-grams of the given size in running English text.
#[rustfmt::skip]
pub const ENGLISH_BIGRAMS: &[(&str, f64)] = &[
    ("TH", 3.56), ("HE", 3.07), ("IN", 2.43), ("ER", 2.05), ("AN", 1.99),
    ("RE", 1.85), ("ON", 1.76), ("AT", 1.49), ("EN", 1.45), ("ND", 1.35),
    ("TI", 1.34), ("ES", 1.34), ("OR", 1.28), ("TE", 1.20), ("OF", 1.17),
    ("ED", 1.17), ("IS", 1.13), ("IT", 1.12), ("AL", 1.09), ("AR", 1.07),
    ("ST", 1.05), ("TO", 1.04), ("NT", 1.04), ("NG", 0.95), ("SE", 0.93),
    ("HA", 0.93), ("AS", 0.87), ("OU", 0.87), ("IO", 0.83), ("LE", 0.83),
    ("VE", 0.83), ("CO", 0.79), ("ME", 0.79), ("DE", 0.76), ("HI", 0.76),
    ("RI", 0.73), ("RO", 0.73), ("IC", 0.70), ("NE", 0.69), ("EA", 0.69),
    ("RA", 0.69), ("CE", 0.65), ("LI", 0.62), ("CH", 0.60), ("LL", 0.58),
    ("BE", 0.58), ("MA", 0.57), ("SI", 0.55), ("OM", 0.55), ("UR", 0.54),
    ("CA", 0.54), ("EL", 0.53), ("TA", 0.53), ("LA", 0.52), ("NS", 0.51),
    ("DI", 0.50), ("FO", 0.50), ("HO", 0.49), ("PE", 0.49), ("EC", 0.48),
    ("PR", 0.47), ("NO", 0.46), ("CT", 0.46), ("US", 0.45), ("AC", 0.45),
    ("OT", 0.44), ("IL", 0.43), ("TR", 0.43), ("LY", 0.43), ("NC", 0.42),
    ("ET", 0.42), ("UT", 0.42), ("SS", 0.41), ("SO", 0.40), ("RS", 0.40),
    ("UN", 0.39), ("LO", 0.39), ("WA", 0.38), ("GE", 0.38), ("IE", 0.38),
    ("WH", 0.38), ("EE", 0.38), ("WI", 0.37), ("EM", 0.37), ("AD", 0.37),
    ("OL", 0.36), ("RT", 0.36), ("PO", 0.36), ("WE", 0.36), ("NA", 0.35),
    ("UL", 0.35), ("NI", 0.34), ("TS", 0.34), ("MO", 0.34), ("OW", 0.33),
    ("PA", 0.32), ("IM", 0.32), ("MI", 0.32), ("AI", 0.32), ("SH", 0.32),
];

#[rustfmt::skip]
pub const ENGLISH_TRIGRAMS: &[(&str, f64)] = &[
    ("THE", 1.81), ("AND", 0.73), ("ING", 0.72), ("ENT", 0.42), ("ION", 0.42),
    ("HER", 0.36), ("FOR", 0.34), ("THA", 0.33), ("NTH", 0.33), ("INT", 0.32),
    ("ERE", 0.31), ("TIO", 0.31), ("TER", 0.30), ("EST", 0.28), ("ERS", 0.28),
    ("ATI", 0.26), ("HAT", 0.26), ("ATE", 0.25), ("ALL", 0.25), ("ETH", 0.24),
    ("HES", 0.24), ("VER", 0.24), ("HIS", 0.24), ("OFT", 0.22), ("ITH", 0.21),
    ("FTH", 0.21), ("STH", 0.21), ("OTH", 0.21), ("RES", 0.21), ("ONT", 0.20),
    ("DTH", 0.19), ("ARE", 0.19), ("REA", 0.19), ("EAR", 0.18), ("WAS", 0.18),
    ("SIN", 0.18), ("STO", 0.18), ("TTH", 0.18), ("STA", 0.17), ("THI", 0.17),
    ("TIN", 0.17), ("TED", 0.17), ("ONS", 0.16), ("EDT", 0.16), ("WIT", 0.16),
    ("SAN", 0.16), ("DIN", 0.16), ("ORT", 0.16), ("CON", 0.16), ("RTH", 0.15),
    ("EVE", 0.15), ("ECO", 0.15), ("EOF", 0.15), ("NDT", 0.15), ("OUR", 0.15),
    ("YOU", 0.15), ("NOT", 0.14), ("BUT", 0.14), ("WHI", 0.14), ("OME", 0.14),
];

#[rustfmt::skip]
pub const ENGLISH_QUADGRAMS: &[(&str, f64)] = &[
    ("TION", 0.31), ("NTHE", 0.27), ("THER", 0.24), ("THAT", 0.21), ("OFTH", 0.19),
    ("FTHE", 0.19), ("THES", 0.18), ("WITH", 0.18), ("INTH", 0.17), ("ATIO", 0.17),
    ("OTHE", 0.16), ("TTHE", 0.16), ("DTHE", 0.15), ("INGT", 0.15), ("ETHE", 0.15),
    ("SAND", 0.14), ("STHE", 0.14), ("HERE", 0.13), ("THEC", 0.13), ("MENT", 0.13),
    ("THEM", 0.12), ("RTHE", 0.12), ("THEP", 0.11), ("FROM", 0.11), ("THIS", 0.11),
    ("TING", 0.10), ("THEI", 0.10), ("NGTH", 0.10), ("IGHT", 0.09), ("OUGH", 0.09),
    ("ANDT", 0.09), ("EAND", 0.09), ("HAVE", 0.09), ("ANDS", 0.08), ("TOTH", 0.08),
    ("THEA", 0.08), ("HATT", 0.08), ("ATTH", 0.08), ("EDTH", 0.08), ("ONTH", 0.08),
    ("IONS", 0.08), ("THEY", 0.07), ("WHIC", 0.07), ("HICH", 0.07),
    ("EVER", 0.07), ("TERS", 0.07), ("ALLY", 0.07), ("ESTH", 0.07), ("OULD", 0.07),
];

/// Top-30 bigrams used by the hit-rate heuristic.
pub const COMMON_BIGRAMS: &[&str] = &[
    "TH", "HE", "IN", "EN", "NT", "RE", "ER", "AN", "TI", "ES", "ON", "AT", "SE", "ND", "OR",
    "AR", "AL", "TE", "CO", "DE", "TO", "RA", "ET", "ED", "IT", "SA", "EM", "RO", "HA", "VE",
];

pub const TWO_LETTER_WORDS: &[&str] = &[
    "OF", "TO", "IN", "IT", "IS", "BE", "AS", "AT", "SO", "WE", "HE", "BY", "OR", "ON", "DO",
    "IF", "ME", "MY", "UP", "AN",
];

pub const TOP_WORDS: &[&str] = &[
    "THE", "AND", "FOR", "ARE", "BUT", "NOT", "YOU", "ALL", "ANY", "CAN", "HAD", "HER", "WAS",
    "ONE", "OUR", "OUT", "DAY", "GET", "HAS", "HIM",
];

/// Adjacent-letter pairs that essentially never occur in English.
pub const IMPOSSIBLE_BIGRAMS: &[&str] = &[
    "JQ", "QG", "QK", "QY", "QZ", "WQ", "WZ", "XJ", "ZJ", "QJ", "JX", "VQ", "QX", "XZ", "ZX",
    "BQ", "CJ", "FQ", "GQ", "JZ", "KQ", "PQ", "QC", "QF", "QV", "VJ", "VX", "JV", "JW", "MQ",
];

#[inline]
pub fn letter_index(b: u8) -> Option<u8> {
    if b.is_ascii_alphabetic() {
        Some(b.to_ascii_uppercase() - b'A')
    } else {
        None
    }
}

/// Packs an n-gram of A..Z indices into a dense table slot.
#[inline]
fn pack(gram: &[u8]) -> usize {
    gram.iter().fold(0usize, |acc, &g| acc * 26 + g as usize)
}

fn pack_str(s: &str) -> Option<usize> {
    let mut idx = Vec::with_capacity(s.len());
    for b in s.bytes() {
        idx.push(letter_index(b)?);
    }
    Some(pack(&idx))
}

/// Dense `log10(p)` table over all `26^n` n-grams. Slots with no data hold
/// `log10(floor)`.
#[derive(Debug, Clone)]
pub struct NgramTable {
    n: usize,
    floor_log: f64,
    logs: Vec<f64>,
}

impl NgramTable {
    /// Builds from probabilities (already normalised, 0..1).
    pub fn from_probabilities<'a, I>(n: usize, entries: I, floor: f64) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let floor_log = floor.log10();
        let mut logs = vec![floor_log; 26usize.pow(n as u32)];
        for (gram, p) in entries {
            if gram.len() != n || p <= 0.0 {
                continue;
            }
            if let Some(slot) = pack_str(gram) {
                logs[slot] = p.max(floor).log10();
            }
        }
        Self { n, floor_log, logs }
    }

    /// Builds from raw corpus counts, normalised by their total.
    pub fn from_counts<I>(n: usize, entries: I, floor: f64) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let entries: Vec<(String, f64)> = entries
            .into_iter()
            .filter(|(g, c)| g.len() == n && *c > 0.0)
            .collect();
        let total: f64 = entries.iter().map(|(_, c)| c).sum();
        if total <= 0.0 {
            return Self::from_probabilities(n, std::iter::empty(), floor);
        }
        Self::from_probabilities(
            n,
            entries.iter().map(|(g, c)| (g.as_str(), c / total)),
            floor,
        )
    }

    pub fn english(n: usize, floor: f64) -> Self {
        let source = match n {
            2 => ENGLISH_BIGRAMS,
            3 => ENGLISH_TRIGRAMS,
            _ => ENGLISH_QUADGRAMS,
        };
        Self::from_probabilities(n, source.iter().map(|&(g, pct)| (g, pct / 100.0)), floor)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn floor_log(&self) -> f64 {
        self.floor_log
    }

    #[inline]
    pub fn log_prob(&self, gram: &[u8]) -> f64 {
        self.logs[pack(gram)]
    }
}

/// Immutable language reference shared by every worker.
#[derive(Debug, Clone)]
pub struct LanguageModel {
    pub letter_freqs: [f64; 26],
    pub bigrams: NgramTable,
    pub trigrams: NgramTable,
    pub quadgrams: NgramTable,
    pub common_bigrams: [bool; 676],
    pub impossible_bigrams: [bool; 676],
    pub two_letter_words: HashSet<&'static str>,
    pub top_words: HashSet<&'static str>,
}

fn bigram_mask(list: &[&str]) -> [bool; 676] {
    let mut mask = [false; 676];
    for s in list {
        if let Some(slot) = pack_str(s) {
            mask[slot] = true;
        }
    }
    mask
}

impl LanguageModel {
    pub fn english(floor: f64) -> Self {
        Self {
            letter_freqs: ENGLISH_LETTER_FREQS,
            bigrams: NgramTable::english(2, floor),
            trigrams: NgramTable::english(3, floor),
            quadgrams: NgramTable::english(4, floor),
            common_bigrams: bigram_mask(COMMON_BIGRAMS),
            impossible_bigrams: bigram_mask(IMPOSSIBLE_BIGRAMS),
            two_letter_words: TWO_LETTER_WORDS.iter().copied().collect(),
            top_words: TOP_WORDS.iter().copied().collect(),
        }
    }

    #[inline]
    pub fn is_common_bigram(&self, a: u8, b: u8) -> bool {
        self.common_bigrams[a as usize * 26 + b as usize]
    }

    #[inline]
    pub fn is_impossible_bigram(&self, a: u8, b: u8) -> bool {
        self.impossible_bigrams[a as usize * 26 + b as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_ngram_gets_floor() {
        let t = NgramTable::english(2, 1e-10);
        assert!((t.log_prob(&[16, 23]) + 10.0).abs() < 1e-9); // QX
        assert!(t.log_prob(&[19, 7]) > -2.0); // TH
    }

    #[test]
    fn test_from_counts_normalises() {
        let t = NgramTable::from_counts(
            2,
            vec![("AB".to_string(), 3.0), ("BA".to_string(), 1.0)],
            1e-12,
        );
        assert!((t.log_prob(&[0, 1]) - 0.75f64.log10()).abs() < 1e-12);
        assert!((t.log_prob(&[1, 0]) - 0.25f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_masks() {
        let m = LanguageModel::english(1e-10);
        assert!(m.is_common_bigram(19, 7)); // TH
        assert!(m.is_impossible_bigram(16, 23)); // QX
        assert!(!m.is_impossible_bigram(16, 20)); // QU
    }
}
