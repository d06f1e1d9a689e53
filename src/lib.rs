#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod inmemory;
pub mod model;
pub mod narrator;
#[cfg(feature = "openai")]
pub mod openai;
pub mod prompts;
pub mod store;
pub mod sweeper;
pub mod testing;

pub use config::NarratorConfig;
pub use error::{ConfigError, ErrorCode, GatewayError, NarratorError, SessionResult};
pub use gateway::CompletionGateway;
pub use model::{Message, Role, SessionKey, StoryView, Turn};
pub use narrator::Narrator;
pub use store::{create_conversation_store, ConversationStore, StoreBackendConfig};
pub use sweeper::spawn_sweeper;
