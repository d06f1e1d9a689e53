use crate::config::OpenAiConfig;
use crate::error::{ConfigError, GatewayError};
use crate::gateway::CompletionGateway;
use crate::model::{Message, SessionKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chat-completion gateway for OpenAI-compatible `POST /chat/completions` endpoints.
pub struct OpenAiGateway {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [Message],
    user: &'a str,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGateway {
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, ConfigError> {
        if config.api_key.is_empty() {
            return Err(ConfigError::Missing("openai.api_key"));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            max_tokens: config.max_tokens,
        })
    }

    fn request<'a>(&'a self, key: &'a SessionKey, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages,
            user: key.as_str(),
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(
        &self,
        key: &SessionKey,
        messages: &[Message],
    ) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(key, messages))
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply = extract_reply(&body)?;
        debug!(op = "complete", bytes = reply.len(), "chat completion");
        Ok(reply)
    }
}

fn extract_reply(body: &str) -> Result<String, GatewayError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|err| GatewayError::Transport(err.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GatewayError::EmptyReply)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OpenAiConfig {
        OpenAiConfig {
            api_key: "sk-test".into(),
            base_url: "http://localhost:9999/v1/".into(),
            ..OpenAiConfig::default()
        }
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let err = OpenAiGateway::from_config(&OpenAiConfig::default())
            .err()
            .expect("api key required");
        assert!(matches!(err, ConfigError::Missing("openai.api_key")));
    }

    #[test]
    fn request_carries_contract_fields() {
        let gateway = OpenAiGateway::from_config(&config()).expect("gateway");
        assert_eq!(gateway.endpoint, "http://localhost:9999/v1/chat/completions");
        let key = SessionKey::parse("player-1").expect("key");
        let messages = vec![Message::system("sys"), Message::user("go")];
        let body = serde_json::to_value(gateway.request(&key, &messages)).expect("json");
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["user"], "player-1");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "go");
    }

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"plot\":\"X\"}"}}]}"#;
        assert_eq!(extract_reply(body).expect("reply"), r#"{"plot":"X"}"#);
    }

    #[test]
    fn empty_choices_are_an_error() {
        assert!(matches!(
            extract_reply(r#"{"choices":[]}"#),
            Err(GatewayError::EmptyReply)
        ));
        assert!(matches!(
            extract_reply(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(GatewayError::EmptyReply)
        ));
    }
}
