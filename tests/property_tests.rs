use cipherforge::search::{ResultSet, ScoredCandidate};
use proptest::prelude::*;
use std::collections::HashSet;

fn candidate(key: u8, score: f64) -> ScoredCandidate {
    ScoredCandidate {
        key: format!("K{}", key),
        plaintext: String::new(),
        score,
        breakdown: None,
    }
}

proptest! {
    #[test]
    fn prop_result_set_stays_bounded_and_sorted(
        k in 1usize..12,
        // Few distinct keys, so batches keep re-inserting the same ones.
        batches in prop::collection::vec(
            prop::collection::vec((0u8..24, -100.0f64..100.0), 0..30),
            1..20,
        ),
    ) {
        let mut set = ResultSet::new(k);
        let mut best_seen: Option<f64> = None;

        for batch in batches {
            for &(_, score) in &batch {
                best_seen = Some(best_seen.map_or(score, |b| b.max(score)));
            }
            set.add(batch.into_iter().map(|(key, score)| candidate(key, score)));

            let best = set.best();
            prop_assert_eq!(best, best_seen);
            let top = set.top();
            prop_assert!(top.len() <= k);
            prop_assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
            let keys: HashSet<&str> = top.iter().map(|c| c.key.as_str()).collect();
            prop_assert_eq!(keys.len(), top.len());
            // A re-inserted key keeps its first score, so the top entry can trail `best`.
            if let (Some(first), Some(b)) = (top.first(), best) {
                prop_assert!(first.score <= b);
            }
        }
    }
}
