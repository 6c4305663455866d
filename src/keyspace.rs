//! Key enumeration.
//!
//! Keys are ordered by length first, then lexicographically by alphabet
//! position. Every key has a linear index in `[0, total)`, which is what the
//! scheduler partitions into batches.

use crate::alphabet::Alphabet;
use crate::error::{CfResult, CipherForgeError};

/// `Σ_{l=1..max_length} alphabet_size^l`, or `Overflow` if it does not fit in `u64`.
pub fn key_count(alphabet_size: usize, max_length: usize) -> CfResult<u64> {
    let overflow = || CipherForgeError::Overflow {
        alphabet_size,
        max_length,
    };
    let base = u64::try_from(alphabet_size).map_err(|_| overflow())?;
    let mut total: u64 = 0;
    let mut bucket: u64 = 1;
    for _ in 0..max_length {
        bucket = bucket.checked_mul(base).ok_or_else(overflow)?;
        total = total.checked_add(bucket).ok_or_else(overflow)?;
    }
    Ok(total)
}

/// Index bijection over the key space of one alphabet size and max length.
#[derive(Debug, Clone)]
pub struct KeySpace {
    alphabet_size: usize,
    max_length: usize,
    total: u64,
    // bucket_starts[l - 1] = index of the first key of length l
    bucket_starts: Vec<u64>,
}

impl KeySpace {
    pub fn new(alphabet_size: usize, max_length: usize) -> CfResult<Self> {
        if alphabet_size == 0 {
            return Err(CipherForgeError::InvalidConfiguration(
                "alphabet size must be positive".to_string(),
            ));
        }
        let total = key_count(alphabet_size, max_length)?;

        let mut bucket_starts = Vec::with_capacity(max_length);
        let mut start = 0u64;
        let mut size = 1u64;
        for _ in 0..max_length {
            bucket_starts.push(start);
            // Cannot overflow: the full sum was checked above.
            size *= alphabet_size as u64;
            start += size;
        }

        Ok(Self {
            alphabet_size,
            max_length,
            total,
            bucket_starts,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Key digits (alphabet positions) at linear `index`.
    pub fn key_at(&self, index: u64) -> Option<Vec<usize>> {
        let mut digits = Vec::with_capacity(self.max_length);
        if self.write_key_at(index, &mut digits) {
            Some(digits)
        } else {
            None
        }
    }

    fn write_key_at(&self, index: u64, digits: &mut Vec<usize>) -> bool {
        if index >= self.total {
            return false;
        }
        // Locate the length bucket.
        let len = self.bucket_starts.partition_point(|&s| s <= index);
        let mut offset = index - self.bucket_starts[len - 1];

        digits.clear();
        digits.resize(len, 0);
        let base = self.alphabet_size as u64;
        for slot in digits.iter_mut().rev() {
            *slot = (offset % base) as usize;
            offset /= base;
        }
        true
    }

    /// Inverse of [`key_at`](Self::key_at).
    pub fn index_of(&self, digits: &[usize]) -> Option<u64> {
        let len = digits.len();
        if len == 0 || len > self.max_length {
            return None;
        }
        let base = self.alphabet_size as u64;
        let mut value = 0u64;
        for &d in digits {
            if d >= self.alphabet_size {
                return None;
            }
            value = value * base + d as u64;
        }
        Some(self.bucket_starts[len - 1] + value)
    }

    /// Renders the key at `index` through `alphabet`.
    pub fn key_string_at(&self, alphabet: &Alphabet, index: u64) -> Option<String> {
        self.key_at(index).map(|d| alphabet.render_key(&d))
    }

    /// Lazy, restartable enumeration of every key in canonical order.
    pub fn keys<'a>(&self, alphabet: &'a Alphabet) -> Keys<'a> {
        Keys {
            cursor: KeyCursor::new(self, 0, self.total),
            alphabet,
        }
    }

    pub fn batch_count(&self, batch_size: u64) -> u64 {
        if batch_size == 0 {
            return 0;
        }
        self.total.div_ceil(batch_size)
    }

    /// Batch `id` of `batch_size` consecutive indices; the last one may be short.
    pub fn batch(&self, id: u64, batch_size: u64) -> Option<Batch> {
        if batch_size == 0 {
            return None;
        }
        let start = id.checked_mul(batch_size)?;
        if start >= self.total {
            return None;
        }
        let end = start.saturating_add(batch_size).min(self.total);
        Some(Batch { id, start, end })
    }

    pub fn batches(&self, batch_size: u64) -> Batches<'_> {
        Batches {
            space: self,
            batch_size,
            next_id: 0,
        }
    }
}

/// Contiguous `[start, end)` slice of the key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub id: u64,
    pub start: u64,
    pub end: u64,
}

impl Batch {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn cursor(&self, space: &KeySpace) -> KeyCursor {
        KeyCursor::new(space, self.start, self.end)
    }

    /// Materialised key list, for hosts that hand out explicit keys.
    pub fn key_list(&self, space: &KeySpace, alphabet: &Alphabet) -> Vec<String> {
        let mut cursor = self.cursor(space);
        let mut keys = Vec::with_capacity(self.len() as usize);
        while let Some(digits) = cursor.next_key() {
            keys.push(alphabet.render_key(digits));
        }
        keys
    }
}

pub struct Batches<'a> {
    space: &'a KeySpace,
    batch_size: u64,
    next_id: u64,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let b = self.space.batch(self.next_id, self.batch_size)?;
        self.next_id += 1;
        Some(b)
    }
}

/// Odometer over an index range. Decodes the first key once, then
/// increments in place, rolling over into the next length bucket.
#[derive(Debug, Clone)]
pub struct KeyCursor {
    base: usize,
    max_length: usize,
    digits: Vec<usize>,
    next_index: u64,
    end: u64,
    primed: bool,
}

impl KeyCursor {
    pub fn new(space: &KeySpace, start: u64, end: u64) -> Self {
        let end = end.min(space.total);
        let mut digits = Vec::with_capacity(space.max_length);
        let primed = start < end && space.write_key_at(start, &mut digits);
        Self {
            base: space.alphabet_size,
            max_length: space.max_length,
            digits,
            next_index: start,
            end,
            primed,
        }
    }

    /// Linear index of the key the next call will return.
    pub fn position(&self) -> u64 {
        self.next_index
    }

    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.next_index)
    }

    /// Returns the next key's digits, or `None` at the end of the range.
    pub fn next_key(&mut self) -> Option<&[usize]> {
        if self.next_index >= self.end {
            return None;
        }
        if self.primed {
            self.primed = false;
        } else {
            self.increment();
        }
        self.next_index += 1;
        Some(&self.digits)
    }

    fn increment(&mut self) {
        for slot in self.digits.iter_mut().rev() {
            *slot += 1;
            if *slot < self.base {
                return;
            }
            *slot = 0;
        }
        // Every position wrapped: first key of the next length.
        if self.digits.len() < self.max_length {
            self.digits.push(0);
        }
    }
}

/// Iterator of key strings, see [`KeySpace::keys`].
pub struct Keys<'a> {
    cursor: KeyCursor,
    alphabet: &'a Alphabet,
}

impl Iterator for Keys<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let alphabet = self.alphabet;
        self.cursor.next_key().map(|d| alphabet.render_key(d))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = usize::try_from(self.cursor.remaining()).unwrap_or(usize::MAX);
        (rem, Some(rem))
    }
}

/// Every key for `alphabet` up to `max_length`, lazily, in canonical order.
pub fn enumerate(alphabet: &Alphabet, max_length: usize) -> CfResult<Keys<'_>> {
    let space = KeySpace::new(alphabet.len(), max_length)?;
    Ok(space.keys(alphabet))
}
