use crate::error::ConfigError;
use crate::prompts::DEFAULT_OPENING_PROMPTS;
use crate::store::StoreBackendConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Settings consumed by the narrator, the store and the OpenAI gateway.
///
/// Loaded from TOML, then overridden from the environment:
///
/// ```toml
/// [openai]
/// api_key = "sk-..."
/// max_tokens = 500
/// system_prompt = "You are the narrator of a choose-your-own-adventure story"
///
/// [session]
/// ttl_secs = 600
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NarratorConfig {
    pub openai: OpenAiConfig,
    pub session: SessionConfig,
    pub story: StoryConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Upper bound on the length of each model reply, in tokens.
    pub max_tokens: u32,
    /// Base system prompt; the JSON reply contract is appended to it.
    pub system_prompt: String,
    pub request_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-3.5-turbo".into(),
            base_url: "https://api.openai.com/v1".into(),
            max_tokens: 500,
            system_prompt: String::new(),
            request_timeout_secs: 45,
        }
    }
}

impl OpenAiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which a story is forgotten. Zero keeps stories forever.
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            sweep_interval_secs: 60,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn backend(&self) -> StoreBackendConfig {
        StoreBackendConfig::InMemory {
            ttl: self.ttl(),
            sweep_interval: self.sweep_interval(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    pub opening_prompts: Vec<String>,
    /// Forget the key again when the very first turn fails, so the player can retry it.
    pub release_key_on_failed_opening: bool,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            opening_prompts: DEFAULT_OPENING_PROMPTS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            release_key_on_failed_opening: true,
        }
    }
}

impl NarratorConfig {
    /// Reads a TOML file and applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides using `lookup` in place of the process environment.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = value;
        }
        if let Some(value) = lookup("OPENAI_MODEL") {
            self.openai.model = value;
        }
        if let Some(value) = lookup("OPENAI_MAX_TOKENS") {
            self.openai.max_tokens = parse_number("OPENAI_MAX_TOKENS", value)?;
        }
        if let Some(value) = lookup("OPENAI_SYSTEM_PROMPT") {
            self.openai.system_prompt = value;
        }
        if let Some(value) = lookup("SESSION_TTL_SECS") {
            self.session.ttl_secs = parse_number("SESSION_TTL_SECS", value)?;
        }
        Ok(())
    }

    /// Checks what the narrator needs; the api key is checked by the gateway itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai.system_prompt.trim().is_empty() {
            return Err(ConfigError::Missing("openai.system_prompt"));
        }
        if self.openai.max_tokens == 0 {
            return Err(ConfigError::Invalid("openai.max_tokens must be positive".into()));
        }
        if self.story.opening_prompts.is_empty() {
            return Err(ConfigError::Missing("story.opening_prompts"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::NotANumber { name, value })
}
