use super::ScoringMethod;
use std::collections::HashMap;

// Rough per-entry overhead on top of the text bytes (String header, score, bucket).
const ENTRY_OVERHEAD: usize = 48;

/// What happened on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Stored,
    /// Entry limit reached; everything was dropped.
    Evicted,
    /// Byte estimate crossed the pressure threshold; everything was dropped.
    Pressure { bytes: usize },
}

/// Per-worker memo of `(method, text) -> score`. Never shared between workers.
/// Eviction is drop-all.
#[derive(Debug)]
pub struct ScoreCache {
    maps: HashMap<ScoringMethod, HashMap<String, f64>>,
    entries: usize,
    bytes: usize,
    limit: usize,
    pressure_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

impl ScoreCache {
    pub fn new(limit: usize, pressure_bytes: usize) -> Self {
        Self {
            maps: HashMap::new(),
            entries: 0,
            bytes: 0,
            limit,
            pressure_bytes,
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, method: ScoringMethod, text: &str) -> Option<f64> {
        let found = self.maps.get(&method).and_then(|m| m.get(text)).copied();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn insert(&mut self, method: ScoringMethod, text: &str, score: f64) -> CacheEvent {
        if self.limit == 0 {
            return CacheEvent::Stored;
        }
        let mut event = CacheEvent::Stored;
        if self.entries >= self.limit {
            self.clear();
            event = CacheEvent::Evicted;
        }

        self.maps
            .entry(method)
            .or_default()
            .insert(text.to_string(), score);
        self.entries += 1;
        self.bytes += text.len() + ENTRY_OVERHEAD;

        if self.bytes > self.pressure_bytes {
            let bytes = self.bytes;
            self.clear();
            return CacheEvent::Pressure { bytes };
        }
        event
    }

    pub fn clear(&mut self) {
        self.maps.clear();
        self.entries = 0;
        self.bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Approximate bytes held.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}
