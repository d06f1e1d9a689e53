use crate::model::SessionKey;
use sha2::{Digest, Sha256};

/// Opening prompts used when no list is configured.
pub const DEFAULT_OPENING_PROMPTS: &[&str] = &[
    "Write a story about a hero who is on a quest to save the world.",
    "Write a story about a unicorn who is on a quest to find their family.",
    "Write a story about a dragon who is on a quest to find treasure.",
    "Write a story about a wizard who is on a quest to find a lost spell.",
    "Write a story about a knight who is on a quest to find a lost sword.",
    "Write a story about a princess who is on a quest to find a lost crown.",
    "Write a story about a king who is on a quest to find a lost kingdom.",
    "Write a story about a queen who is on a quest to find a lost throne.",
    "Write a story about a prince who is on a quest to find a lost castle.",
    "Write a story about a villain who is on a quest to take over the world.",
];

/// Index of the opening prompt for `key`: the first eight bytes of SHA-256(key),
/// read big-endian, modulo `len`. Stable across runs and platforms.
///
/// Returns 0 when `len` is 0.
pub fn opening_index(key: &SessionKey, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let digest = Sha256::digest(key.as_str().as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % len as u64) as usize
}

/// Picks the opening prompt for `key` from `prompts`.
pub fn select_opening<'a, S: AsRef<str>>(key: &SessionKey, prompts: &'a [S]) -> Option<&'a str> {
    prompts
        .get(opening_index(key, prompts.len()))
        .map(|prompt| prompt.as_ref())
}

/// Short hex digest used to identify keys in logs.
pub fn key_digest(key: &SessionKey) -> String {
    let digest = Sha256::digest(key.as_str().as_bytes());
    hex::encode(&digest[..6])
}
