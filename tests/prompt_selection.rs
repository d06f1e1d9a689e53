use adventure_session::prompts::{opening_index, select_opening, DEFAULT_OPENING_PROMPTS};
use adventure_session::SessionKey;
use proptest::prelude::*;

#[test]
fn deterministic_selection() {
    let key = SessionKey::parse("p1").expect("key");
    let a = select_opening(&key, DEFAULT_OPENING_PROMPTS);
    let b = select_opening(&key, DEFAULT_OPENING_PROMPTS);
    assert_eq!(a, b);
}

#[test]
fn single_character_keys_are_supported() {
    for raw in ["a", "b", "0", "é"] {
        let key = SessionKey::parse(raw).expect("key");
        assert!(select_opening(&key, DEFAULT_OPENING_PROMPTS).is_some());
    }
}

#[test]
fn selection_is_not_tied_to_first_byte() {
    // Keys sharing a first byte still land on different prompts.
    let picks: std::collections::HashSet<_> = (0..100)
        .map(|n| {
            let key = SessionKey::parse(format!("x{n}")).expect("key");
            opening_index(&key, DEFAULT_OPENING_PROMPTS.len())
        })
        .collect();
    assert!(picks.len() > 1);
}

proptest! {
    #[test]
    fn selection_is_stable(raw in "\\PC+") {
        let key = SessionKey::parse(raw.clone()).expect("non-empty key");
        let again = SessionKey::parse(raw).expect("non-empty key");
        prop_assert_eq!(
            select_opening(&key, DEFAULT_OPENING_PROMPTS),
            select_opening(&again, DEFAULT_OPENING_PROMPTS)
        );
    }

    #[test]
    fn index_is_in_range(raw in "\\PC+", len in 1usize..64) {
        let key = SessionKey::parse(raw).expect("non-empty key");
        prop_assert!(opening_index(&key, len) < len);
    }
}
