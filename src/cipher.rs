//! Additive polyalphabetic (Vigenère-style) transform.
//!
//! The key advances only on alphabet members; everything else is copied
//! through untouched and leaves the key position where it was.

use crate::alphabet::Alphabet;
use crate::error::CfResult;

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Encrypts `plaintext` with a key given as a string of alphabet symbols.
pub fn encrypt(alphabet: &Alphabet, plaintext: &str, key: &str) -> CfResult<String> {
    let digits = alphabet.parse_key(key)?;
    Ok(transform(alphabet, plaintext, &digits, Direction::Encrypt))
}

/// Decrypts `ciphertext` with a key given as a string of alphabet symbols.
pub fn decrypt(alphabet: &Alphabet, ciphertext: &str, key: &str) -> CfResult<String> {
    let digits = alphabet.parse_key(key)?;
    Ok(transform(alphabet, ciphertext, &digits, Direction::Decrypt))
}

fn transform(alphabet: &Alphabet, text: &str, key: &[usize], dir: Direction) -> String {
    let n = alphabet.len();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    for c in text.chars() {
        match alphabet.index_of(c) {
            Some(idx) => {
                let k = key[pos % key.len()];
                pos += 1;
                let shifted = match dir {
                    Direction::Encrypt => (idx + k) % n,
                    Direction::Decrypt => (idx + n - k) % n,
                };
                out.push(restore_case(alphabet, shifted, c));
            }
            None => out.push(c),
        }
    }
    out
}

#[inline]
fn restore_case(alphabet: &Alphabet, idx: usize, original: char) -> char {
    if original.is_lowercase() {
        alphabet.lower_symbol(idx)
    } else {
        alphabet.symbol(idx)
    }
}

#[derive(Debug, Clone, Copy)]
enum Cell {
    Member { idx: u32, lower: bool },
    Other(char),
}

/// Ciphertext pre-split into alphabet indices so that the search loop does
/// no symbol lookups per key.
#[derive(Debug, Clone)]
pub struct PreparedText {
    cells: Vec<Cell>,
    members: usize,
}

impl PreparedText {
    pub fn new(alphabet: &Alphabet, text: &str) -> Self {
        let mut members = 0;
        let cells = text
            .chars()
            .map(|c| match alphabet.index_of(c) {
                Some(idx) => {
                    members += 1;
                    Cell::Member {
                        idx: idx as u32,
                        lower: c.is_lowercase(),
                    }
                }
                None => Cell::Other(c),
            })
            .collect();
        Self { cells, members }
    }

    /// Number of alphabet-member positions (the positions the key covers).
    pub fn member_count(&self) -> usize {
        self.members
    }

    /// Decrypts into `out` (cleared first) with key digits.
    pub fn decrypt_into(&self, alphabet: &Alphabet, key: &[usize], out: &mut String) {
        out.clear();
        let n = alphabet.len();
        let mut pos = 0;
        for cell in &self.cells {
            match *cell {
                Cell::Member { idx, lower } => {
                    let k = key[pos % key.len()];
                    pos += 1;
                    let p = (idx as usize + n - k) % n;
                    out.push(if lower {
                        alphabet.lower_symbol(p)
                    } else {
                        alphabet.symbol(p)
                    });
                }
                Cell::Other(c) => out.push(c),
            }
        }
    }

    pub fn decrypt(&self, alphabet: &Alphabet, key: &[usize]) -> String {
        let mut out = String::with_capacity(self.cells.len());
        self.decrypt_into(alphabet, key, &mut out);
        out
    }
}
