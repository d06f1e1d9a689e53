use crate::error::{already_exists, not_found, SessionResult};
use crate::model::{ConversationRecord, Message, SessionKey};
use crate::prompts::key_digest;
use crate::store::ConversationStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
use tracing::debug;

const DEFAULT_TTL: Duration = Duration::minutes(10);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::seconds(60);

/// In-memory implementation backed by a concurrent hash map.
///
/// Per-key exclusion comes from the map's shard locks: every read, write, and expiry
/// decision for a key is taken while holding that key's shard guard.
pub struct InMemoryConversationStore {
    entries: DashMap<SessionKey, ConversationRecord>,
    ttl: Duration,
    sweep_interval: Duration,
    cleanup_hint: Mutex<OffsetDateTime>,
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            cleanup_hint: Mutex::new(OffsetDateTime::now_utc()),
        }
    }
}

impl InMemoryConversationStore {
    /// Constructs a store with the default ten-minute TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a store with the given sliding TTL. A zero TTL never expires.
    pub fn with_ttl(ttl: std::time::Duration) -> Self {
        Self {
            ttl: to_time(ttl),
            ..Self::default()
        }
    }

    /// Sets how often normal operations may opportunistically sweep expired records.
    /// Zero disables the opportunistic sweep; lazy expiry on access still applies.
    pub fn sweep_every(mut self, interval: std::time::Duration) -> Self {
        self.sweep_interval = to_time(interval);
        self
    }

    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::try_from(self.ttl).unwrap_or_default()
    }

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn maybe_cleanup(&self, now: OffsetDateTime) {
        if self.sweep_interval.is_zero() {
            return;
        }
        let Some(mut guard) = self.cleanup_hint.try_lock() else {
            return;
        };
        if now - *guard < self.sweep_interval {
            return;
        }
        *guard = now;
        drop(guard);
        self.sweep(now);
    }

    fn sweep(&self, now: OffsetDateTime) -> usize {
        let ttl = self.ttl;
        let mut removed = 0;
        self.entries.retain(|_, record| {
            let keep = !record.is_expired(ttl, now);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!(op = "expire", removed, "dropped idle conversations");
        }
        removed
    }

    /// Removes `key` only if it is still expired as of `now`; a concurrent touch wins.
    fn evict(&self, key: &SessionKey, now: OffsetDateTime) {
        let ttl = self.ttl;
        if self
            .entries
            .remove_if(key, |_, record| record.is_expired(ttl, now))
            .is_some()
        {
            debug!(op = "expire", key = %key_digest(key), "evicted idle conversation on access");
        }
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn exists(&self, key: &SessionKey) -> bool {
        let now = Self::now();
        self.maybe_cleanup(now);
        let Some(record) = self.entries.get(key) else {
            return false;
        };
        if record.is_expired(self.ttl, now) {
            drop(record);
            self.evict(key, now);
            return false;
        }
        true
    }

    fn create(&self, key: &SessionKey, messages: Vec<Message>) -> SessionResult<()> {
        let now = Self::now();
        self.maybe_cleanup(now);
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occ) => {
                if !occ.get().is_expired(self.ttl, now) {
                    return Err(already_exists(key));
                }
                occ.insert(ConversationRecord::new(key.clone(), messages, now));
            }
            Entry::Vacant(vac) => {
                vac.insert(ConversationRecord::new(key.clone(), messages, now));
            }
        }
        Ok(())
    }

    fn append(&self, key: &SessionKey, message: Message) -> SessionResult<()> {
        self.extend(key, vec![message])
    }

    fn extend(&self, key: &SessionKey, messages: Vec<Message>) -> SessionResult<()> {
        let now = Self::now();
        self.maybe_cleanup(now);
        let Some(mut guard) = self.entries.get_mut(key) else {
            return Err(not_found(key));
        };
        if guard.is_expired(self.ttl, now) {
            drop(guard);
            self.evict(key, now);
            return Err(not_found(key));
        }
        guard.messages.extend(messages);
        guard.touch(now);
        Ok(())
    }

    fn get(&self, key: &SessionKey) -> SessionResult<Vec<Message>> {
        let now = Self::now();
        self.maybe_cleanup(now);
        let Some(mut guard) = self.entries.get_mut(key) else {
            return Err(not_found(key));
        };
        if guard.is_expired(self.ttl, now) {
            drop(guard);
            self.evict(key, now);
            return Err(not_found(key));
        }
        guard.touch(now);
        Ok(guard.messages.clone())
    }

    fn remove(&self, key: &SessionKey) -> SessionResult<bool> {
        let now = Self::now();
        Ok(self
            .entries
            .remove(key)
            .map(|(_, record)| !record.is_expired(self.ttl, now))
            .unwrap_or(false))
    }

    fn remove_if_unchanged(&self, key: &SessionKey, expected: &[Message]) -> SessionResult<bool> {
        Ok(self
            .entries
            .remove_if(key, |_, record| record.messages == expected)
            .is_some())
    }

    fn expire(&self) -> usize {
        self.sweep(Self::now())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn to_time(duration: std::time::Duration) -> Duration {
    Duration::try_from(duration).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> SessionKey {
        SessionKey::parse(raw).expect("key")
    }

    #[test]
    fn sweep_keeps_live_records() {
        let store = InMemoryConversationStore::with_ttl(std::time::Duration::from_secs(60));
        store
            .create(&key("live"), vec![Message::system("sys")])
            .expect("create");
        let later = OffsetDateTime::now_utc() + Duration::seconds(30);
        assert_eq!(store.sweep(later), 0);
        let much_later = OffsetDateTime::now_utc() + Duration::seconds(120);
        assert_eq!(store.sweep(much_later), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn evict_spares_records_touched_after_decision() {
        let store = InMemoryConversationStore::with_ttl(std::time::Duration::from_secs(60));
        let k = key("touched");
        store.create(&k, vec![Message::system("sys")]).expect("create");
        let stale_now = OffsetDateTime::now_utc() - Duration::seconds(120);
        store.evict(&k, stale_now);
        assert!(store.exists(&k));
    }

    #[test]
    fn remove_if_unchanged_checks_history() {
        let store = InMemoryConversationStore::new();
        let k = key("rollback");
        let seed = vec![Message::system("sys"), Message::user("go")];
        store.create(&k, seed.clone()).expect("create");
        store.append(&k, Message::assistant("{}")).expect("append");
        assert!(!store.remove_if_unchanged(&k, &seed).expect("remove"));
        assert!(store.exists(&k));
    }
}
