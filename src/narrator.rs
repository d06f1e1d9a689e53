use crate::codec;
use crate::config::NarratorConfig;
use crate::error::{ConfigError, GatewayError, NarratorError, SessionResult};
use crate::gateway::CompletionGateway;
use crate::model::{Message, Role, SessionKey, StoryView, Turn};
use crate::prompts::{key_digest, opening_index};
use crate::store::ConversationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the two player-facing operations on top of a conversation store and a
/// completion gateway.
///
/// Per key the story is either absent or active. `create_story` moves it from absent to
/// active; `advance_story` keeps it active. An expired key is absent again and can only be
/// restarted with `create_story`.
pub struct Narrator {
    store: Arc<dyn ConversationStore>,
    gateway: Arc<dyn CompletionGateway>,
    system_prompt: String,
    opening_prompts: Vec<String>,
    request_timeout: Option<Duration>,
    release_key_on_failed_opening: bool,
}

impl Narrator {
    /// Builds a narrator, appending the JSON reply contract to the configured base prompt.
    pub fn new(
        config: &NarratorConfig,
        store: Arc<dyn ConversationStore>,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let timeout = config.openai.request_timeout();
        Ok(Self {
            store,
            gateway,
            system_prompt: codec::build_system_prompt(&config.openai.system_prompt),
            opening_prompts: config.story.opening_prompts.clone(),
            request_timeout: (!timeout.is_zero()).then_some(timeout),
            release_key_on_failed_opening: config.story.release_key_on_failed_opening,
        })
    }

    /// The augmented prompt stored as the first message of every story.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The opening prompt `key` will always start with.
    pub fn opening_prompt(&self, key: &SessionKey) -> &str {
        &self.opening_prompts[opening_index(key, self.opening_prompts.len())]
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Starts a new story for `key` and returns its first turn.
    pub async fn create_story(
        &self,
        key: &SessionKey,
        cancel: &CancellationToken,
    ) -> SessionResult<Turn> {
        let seed = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(self.opening_prompt(key)),
        ];
        self.store.create(key, seed.clone())?;
        debug!(op = "create_story", key = %key_digest(key), prompt = %seed[1].content, "creating story");

        match self.next_turn(key, &seed, Vec::new(), cancel).await {
            Ok(turn) => {
                info!(op = "create_story", key = %key_digest(key), choices = turn.choices.len(), "story started");
                Ok(turn)
            }
            Err(err) => {
                warn!(op = "create_story", key = %key_digest(key), error = %err, "opening turn failed");
                if self.release_key_on_failed_opening {
                    self.store.remove_if_unchanged(key, &seed)?;
                }
                Err(err)
            }
        }
    }

    /// Applies `choice` to the story for `key` and returns the next turn.
    ///
    /// `choice` must exactly match one of the choices of the latest turn. The choice and the
    /// reply are appended together once the reply has decoded, so a failed call leaves the
    /// history as it was.
    pub async fn advance_story(
        &self,
        key: &SessionKey,
        choice: &str,
        cancel: &CancellationToken,
    ) -> SessionResult<Turn> {
        let mut history = self.store.get(key)?;
        let current = latest_turn(&history)?;
        if !current.offers(choice) {
            debug!(op = "advance_story", key = %key_digest(key), choice, "rejected choice");
            return Err(NarratorError::InvalidChoice {
                choice: choice.to_string(),
            });
        }

        let prompt = Message::user(choice);
        history.push(prompt.clone());
        let turn = self.next_turn(key, &history, vec![prompt], cancel).await?;
        debug!(op = "advance_story", key = %key_digest(key), messages = history.len() + 1, "story advanced");
        Ok(turn)
    }

    /// Player-facing form of [`Narrator::create_story`].
    pub async fn begin(
        &self,
        key: &SessionKey,
        cancel: &CancellationToken,
    ) -> SessionResult<StoryView> {
        self.create_story(key, cancel).await.map(StoryView::from)
    }

    /// Player-facing form of [`Narrator::advance_story`].
    pub async fn advance(
        &self,
        key: &SessionKey,
        choice: &str,
        cancel: &CancellationToken,
    ) -> SessionResult<StoryView> {
        self.advance_story(key, choice, cancel)
            .await
            .map(StoryView::from)
    }

    async fn next_turn(
        &self,
        key: &SessionKey,
        history: &[Message],
        mut pending: Vec<Message>,
        cancel: &CancellationToken,
    ) -> SessionResult<Turn> {
        let raw = self.complete(key, history, cancel).await?;
        let turn = codec::decode(&raw)?;
        pending.push(Message::assistant(raw));
        self.store.extend(key, pending)?;
        Ok(turn)
    }

    async fn complete(
        &self,
        key: &SessionKey,
        history: &[Message],
        cancel: &CancellationToken,
    ) -> Result<String, GatewayError> {
        let call = self.gateway.complete(key, history);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            reply = async move {
                match self.request_timeout {
                    Some(limit) => tokio::time::timeout(limit, call)
                        .await
                        .unwrap_or(Err(GatewayError::TimedOut(limit))),
                    None => call.await,
                }
            } => reply,
        }
    }
}

/// Decodes the latest assistant turn of a stored history.
fn latest_turn(history: &[Message]) -> SessionResult<Turn> {
    match history.last() {
        Some(message) if message.role == Role::Assistant => codec::decode(&message.content),
        _ => Err(NarratorError::MalformedTurn(
            "history does not end with an assistant turn".into(),
        )),
    }
}
