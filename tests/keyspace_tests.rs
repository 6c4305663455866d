use cipherforge::alphabet::Alphabet;
use cipherforge::error::CipherForgeError;
use cipherforge::keyspace::{enumerate, key_count, KeySpace};
use proptest::prelude::*;
use rstest::rstest;

#[rstest]
#[case(26, 1, 26)]
#[case(26, 2, 702)]
#[case(26, 3, 18278)]
#[case(1, 5, 5)]
#[case(2, 3, 14)]
fn test_key_count(#[case] a: usize, #[case] m: usize, #[case] expected: u64) {
    assert_eq!(key_count(a, m).unwrap(), expected);
}

#[test]
fn test_key_count_overflow_is_explicit() {
    assert!(matches!(
        key_count(26, 14),
        Err(CipherForgeError::Overflow { .. })
    ));
    assert!(matches!(
        KeySpace::new(2, 64),
        Err(CipherForgeError::Overflow { .. })
    ));
}

#[test]
fn test_enumerate_is_canonical_and_restartable() {
    let a = Alphabet::new("ABC").unwrap();
    let keys: Vec<String> = enumerate(&a, 2).unwrap().collect();
    assert_eq!(
        keys,
        ["A", "B", "C", "AA", "AB", "AC", "BA", "BB", "BC", "CA", "CB", "CC"]
    );
    let again: Vec<String> = enumerate(&a, 2).unwrap().collect();
    assert_eq!(keys, again);
}

#[test]
fn test_enumerate_matches_key_at() {
    let a = Alphabet::english();
    let space = KeySpace::new(26, 3).unwrap();
    for (i, key) in enumerate(&a, 3).unwrap().enumerate() {
        assert_eq!(space.key_string_at(&a, i as u64).as_deref(), Some(key.as_str()));
    }
}

#[test]
fn test_batches_cover_space_once() {
    let space = KeySpace::new(26, 3).unwrap();
    let mut next = 0;
    let mut ids = Vec::new();
    for b in space.batches(400) {
        assert_eq!(b.start, next, "gap or overlap before batch {}", b.id);
        assert!(!b.is_empty());
        next = b.end;
        ids.push(b.id);
    }
    assert_eq!(next, space.total());
    assert_eq!(ids, (0..space.batch_count(400)).collect::<Vec<_>>());
}

proptest! {
    #[test]
    fn prop_index_key_bijection(a in 1usize..30, m in 1usize..5, seed in any::<u64>()) {
        let space = KeySpace::new(a, m).unwrap();
        let idx = seed % space.total();
        let key = space.key_at(idx).unwrap();
        prop_assert!(!key.is_empty() && key.len() <= m);
        prop_assert!(key.iter().all(|&d| d < a));
        prop_assert_eq!(space.index_of(&key), Some(idx));
        prop_assert!(space.key_at(space.total()).is_none());
    }

    #[test]
    fn prop_cursor_agrees_with_key_at(start in 0u64..700, len in 0u64..120) {
        let space = KeySpace::new(26, 2).unwrap();
        let end = (start + len).min(space.total());
        let mut cursor = cipherforge::keyspace::KeyCursor::new(&space, start, end);
        let mut idx = start;
        while let Some(digits) = cursor.next_key() {
            prop_assert_eq!(Some(digits.to_vec()), space.key_at(idx));
            idx += 1;
        }
        prop_assert_eq!(idx, end.max(start));
    }

    #[test]
    fn prop_batches_partition(a in 1usize..12, m in 1usize..4, size in 1u64..500) {
        let space = KeySpace::new(a, m).unwrap();
        let covered: u64 = space.batches(size).map(|b| b.len()).sum();
        prop_assert_eq!(covered, space.total());
        prop_assert_eq!(space.batches(size).count() as u64, space.batch_count(size));
    }
}
