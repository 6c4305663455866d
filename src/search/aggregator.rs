use super::ScoredCandidate;
use std::collections::HashSet;

/// Bounded, descending list of the best candidates.
///
/// Ties keep first-seen order (the sort is stable). A key already held is
/// ignored on re-insertion.
#[derive(Debug, Clone)]
pub struct ResultSet {
    capacity: usize,
    entries: Vec<ScoredCandidate>,
    keys: HashSet<String>,
    best: Option<f64>,
    sorted: bool,
}

impl ResultSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Vec::new(),
            keys: HashSet::new(),
            best: None,
            sorted: true,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts, re-sorts and truncates. Returns whether the held set changed.
    pub fn add<I>(&mut self, candidates: I) -> bool
    where
        I: IntoIterator<Item = ScoredCandidate>,
    {
        let before: Vec<(String, u64)> = self.fingerprint();
        for c in candidates {
            self.push(c);
        }
        self.compact();
        before != self.fingerprint()
    }

    /// Unsorted insert. Call [`ResultSet::compact`] (or read through
    /// [`ResultSet::top`]) before relying on order.
    pub fn push(&mut self, candidate: ScoredCandidate) {
        if !candidate.score.is_finite() {
            return;
        }
        if self.best.map_or(true, |b| candidate.score > b) {
            self.best = Some(candidate.score);
        }
        if self.keys.contains(&candidate.key) {
            return;
        }
        self.keys.insert(candidate.key.clone());
        self.entries.push(candidate);
        self.sorted = false;

        // Keep memory flat on large batches.
        if self.entries.len() >= self.capacity * 2 {
            self.compact();
        }
    }

    pub fn compact(&mut self) {
        if self.sorted {
            return;
        }
        self.entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        if self.entries.len() > self.capacity {
            for dropped in self.entries.drain(self.capacity..) {
                self.keys.remove(&dropped.key);
            }
        }
        self.sorted = true;
    }

    pub fn top(&mut self) -> &[ScoredCandidate] {
        self.compact();
        &self.entries
    }

    pub fn into_vec(mut self) -> Vec<ScoredCandidate> {
        self.compact();
        self.entries
    }

    pub fn to_vec(&mut self) -> Vec<ScoredCandidate> {
        self.top().to_vec()
    }

    /// Best score ever inserted, including candidates since truncated away.
    pub fn best(&self) -> Option<f64> {
        self.best
    }

    pub fn len(&self) -> usize {
        self.entries.len().min(self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fingerprint(&self) -> Vec<(String, u64)> {
        let mut f: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|c| (c.key.clone(), c.score.to_bits()))
            .collect();
        f.sort();
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(key: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            key: key.to_string(),
            plaintext: String::new(),
            score,
            breakdown: None,
        }
    }

    #[test]
    fn test_truncates_and_orders() {
        let mut set = ResultSet::new(2);
        set.add(vec![cand("A", 1.0), cand("B", 3.0), cand("C", 2.0)]);
        let keys: Vec<_> = set.top().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["B", "C"]);
        assert_eq!(set.best(), Some(3.0));
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let mut set = ResultSet::new(2);
        set.add(vec![cand("X", 5.0), cand("Y", 5.0)]);
        set.add(vec![cand("Z", 5.0)]);
        let keys: Vec<_> = set.top().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["X", "Y"]);
    }

    #[test]
    fn test_reinsertion_is_stable() {
        let mut set = ResultSet::new(3);
        assert!(set.add(vec![cand("K", 1.0), cand("L", 2.0)]));
        assert!(!set.add(vec![cand("K", 1.0)]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_unscoreable_is_ignored() {
        let mut set = ResultSet::new(3);
        set.add(vec![cand("A", f64::NEG_INFINITY)]);
        assert!(set.is_empty());
        assert_eq!(set.best(), None);
    }
}
