use crate::error::{CfResult, CipherForgeError};
use std::collections::HashMap;
use std::fmt;

pub const ENGLISH: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

const NO_INDEX: u32 = u32::MAX;

/// Ordered set of unique symbols, stored in canonical (upper) case.
///
/// Lookups are case-insensitive: `index_of('b')` and `index_of('B')` agree.
#[derive(Clone)]
pub struct Alphabet {
    symbols: Vec<char>,
    lower: Vec<char>,
    ascii: [u32; 128],
    extended: HashMap<char, usize>,
}

/// Single-char case fold. Symbols whose uppercase form expands to several
/// chars (e.g. 'ß') are kept as-is.
#[inline]
pub fn fold(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_uppercase();
    }
    let mut up = c.to_uppercase();
    match (up.next(), up.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

#[inline]
fn lower_of(c: char) -> char {
    let mut low = c.to_lowercase();
    match (low.next(), low.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

impl Alphabet {
    /// Validates and builds an alphabet. Fails on empty input or on symbols
    /// that collide after case folding.
    pub fn new(symbols: &str) -> CfResult<Self> {
        if symbols.is_empty() {
            return Err(CipherForgeError::InvalidAlphabet {
                alphabet: symbols.to_string(),
                reason: "alphabet cannot be empty".to_string(),
            });
        }

        let mut canonical = Vec::new();
        let mut ascii = [NO_INDEX; 128];
        let mut extended = HashMap::new();

        for raw in symbols.chars() {
            let c = fold(raw);
            let idx = canonical.len();
            let fresh = if c.is_ascii() {
                let slot = &mut ascii[c as usize];
                if *slot == NO_INDEX {
                    *slot = idx as u32;
                    true
                } else {
                    false
                }
            } else {
                extended.insert(c, idx).is_none()
            };

            if !fresh {
                return Err(CipherForgeError::InvalidAlphabet {
                    alphabet: symbols.to_string(),
                    reason: format!("duplicate symbol '{}'", raw),
                });
            }
            canonical.push(c);
        }

        if canonical.len() > NO_INDEX as usize {
            return Err(CipherForgeError::InvalidAlphabet {
                alphabet: symbols.chars().take(16).collect(),
                reason: "too many symbols".to_string(),
            });
        }

        let lower = canonical.iter().map(|&c| lower_of(c)).collect();

        Ok(Self {
            symbols: canonical,
            lower,
            ascii,
            extended,
        })
    }

    pub fn english() -> Self {
        let symbols: Vec<char> = ENGLISH.chars().collect();
        let mut ascii = [NO_INDEX; 128];
        for (i, &c) in symbols.iter().enumerate() {
            ascii[c as usize] = i as u32;
        }
        let lower = symbols.iter().map(|c| c.to_ascii_lowercase()).collect();
        Self {
            symbols,
            lower,
            ascii,
            extended: HashMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Position of `c` (any case), or `None` when it is not a member.
    #[inline]
    pub fn index_of(&self, c: char) -> Option<usize> {
        let f = fold(c);
        if f.is_ascii() {
            match self.ascii[f as usize] {
                NO_INDEX => None,
                i => Some(i as usize),
            }
        } else {
            self.extended.get(&f).copied()
        }
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        self.index_of(c).is_some()
    }

    /// Canonical symbol at `idx`. Panics on out-of-range indices.
    #[inline]
    pub fn symbol(&self, idx: usize) -> char {
        self.symbols[idx]
    }

    #[inline]
    pub fn lower_symbol(&self, idx: usize) -> char {
        self.lower[idx]
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn as_string(&self) -> String {
        self.symbols.iter().collect()
    }

    /// Converts a key string to symbol indices.
    pub fn parse_key(&self, key: &str) -> CfResult<Vec<usize>> {
        if key.is_empty() {
            return Err(CipherForgeError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot be empty".to_string(),
            });
        }
        key.chars()
            .map(|c| {
                self.index_of(c).ok_or_else(|| CipherForgeError::InvalidKey {
                    key: key.to_string(),
                    reason: format!("symbol '{}' is not in the alphabet", c),
                })
            })
            .collect()
    }

    /// Renders symbol indices back into a key string.
    pub fn render_key(&self, digits: &[usize]) -> String {
        digits.iter().map(|&d| self.symbols[d]).collect()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.symbols {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Alphabet({:?})", self.as_string())
    }
}

impl PartialEq for Alphabet {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty() {
        let err = Alphabet::new("").unwrap_err();
        assert!(matches!(err, CipherForgeError::InvalidAlphabet { .. }));
    }

    #[test]
    fn test_rejects_case_insensitive_duplicates() {
        let err = Alphabet::new("ABCa").unwrap_err();
        assert!(err.to_string().contains("duplicate symbol 'a'"));
    }

    #[test]
    fn test_lookup_folds_case() {
        let a = Alphabet::new("abcd").unwrap();
        assert_eq!(a.as_string(), "ABCD");
        assert_eq!(a.index_of('c'), Some(2));
        assert_eq!(a.index_of('C'), Some(2));
        assert_eq!(a.index_of('-'), None);
    }

    #[test]
    fn test_non_ascii_symbols() {
        let a = Alphabet::new("абвг").unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(a.index_of('В'), Some(2));
        assert_eq!(a.lower_symbol(2), 'в');
    }

    #[test]
    fn test_parse_key() {
        let a = Alphabet::english();
        assert_eq!(a.parse_key("bad").unwrap(), vec![1, 0, 3]);
        assert!(a.parse_key("b4d").is_err());
        assert!(a.parse_key("").is_err());
        assert_eq!(a.render_key(&[1, 0, 3]), "BAD");
    }
}
