use crate::error::SessionResult;
use crate::inmemory::InMemoryConversationStore;
use crate::model::{Message, SessionKey};
use std::sync::Arc;
use std::time::Duration;

/// Conversation history storage used by the narrator.
///
/// Each key holds the ordered message history of one story with a sliding time-to-live.
/// Every successful `create`, `append` and `get` resets the key's expiry clock, and an
/// expired key behaves exactly like a key that never existed. All operations on one key
/// are mutually exclusive; operations on different keys do not interfere.
pub trait ConversationStore: Send + Sync + 'static {
    /// Returns true iff a live record exists for `key`. Does not refresh the TTL.
    fn exists(&self, key: &SessionKey) -> bool;

    /// Inserts a new record, failing with `AlreadyExists` if a live one is present.
    fn create(&self, key: &SessionKey, messages: Vec<Message>) -> SessionResult<()>;

    /// Appends one message, failing with `NotFound` if no live record is present.
    fn append(&self, key: &SessionKey, message: Message) -> SessionResult<()>;

    /// Appends several messages as one all-or-nothing write.
    fn extend(&self, key: &SessionKey, messages: Vec<Message>) -> SessionResult<()>;

    /// Returns a snapshot of the ordered history, failing with `NotFound` if absent.
    fn get(&self, key: &SessionKey) -> SessionResult<Vec<Message>>;

    /// Removes the record for `key`, returning whether one was live.
    fn remove(&self, key: &SessionKey) -> SessionResult<bool>;

    /// Removes the record only while its history still equals `expected`.
    fn remove_if_unchanged(&self, key: &SessionKey, expected: &[Message]) -> SessionResult<bool>;

    /// Drops every expired record and returns how many were removed.
    fn expire(&self) -> usize;

    /// Number of records currently held, expired or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Storage backend selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackendConfig {
    /// Memory-only store; `ttl` of zero never expires, `sweep_interval` of zero turns
    /// off the opportunistic sweep.
    InMemory {
        ttl: Duration,
        sweep_interval: Duration,
    },
}

/// Builds a conversation store for the requested backend.
pub fn create_conversation_store(config: StoreBackendConfig) -> Arc<dyn ConversationStore> {
    match config {
        StoreBackendConfig::InMemory {
            ttl,
            sweep_interval,
        } => Arc::new(InMemoryConversationStore::with_ttl(ttl).sweep_every(sweep_interval)),
    }
}
