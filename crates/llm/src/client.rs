//! Streaming chat-completion client for an OpenAI-compatible local LLM
//! server (llama.cpp's `/v1/chat/completions` with `stream: true`).
//!
//! Shared across connections: the client itself holds no conversation
//! state. Each connection assembles its own message list (via
//! `voice_agent_core::ConversationHistory`) and passes it in whole on every
//! call, per the server's stateless shared-process model.

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use voice_agent_config::LlmConfig;
use voice_agent_core::traits::{FinishReason, LanguageModel, Message, Role, StreamChunk};
use voice_agent_core::Result as CoreResult;

use crate::error::LlmError;

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for WireMessage {
    fn from(m: &Message) -> Self {
        Self {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: m.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunkWire {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LlmError::Connect(e.to_string()))?;

        Ok(Self { http, config })
    }

    async fn post_stream(
        &self,
        messages: &[Message],
    ) -> crate::error::Result<reqwest::Response> {
        let wire_messages: Vec<WireMessage> = messages.iter().map(WireMessage::from).collect();
        let request = ChatRequest {
            messages: wire_messages,
            stream: true,
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    LlmError::Connect(e.to_string())
                } else {
                    LlmError::Status(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status(format!("HTTP {}: {}", status, body)));
        }

        Ok(response)
    }

    /// POST with retry on connect/timeout errors only; HTTP status errors
    /// (4xx/5xx reached the server) do not retry.
    async fn post_stream_with_retry(
        &self,
        messages: &[Message],
    ) -> crate::error::Result<reqwest::Response> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.post_stream(messages).await {
                Ok(response) => return Ok(response),
                Err(LlmError::Connect(e)) => {
                    tracing::warn!(attempt, max_attempts = attempts, error = %e, "llm connect failed");
                    last_error = Some(LlmError::Connect(e));
                    if attempt < attempts {
                        let backoff = Duration::from_secs_f32(self.config.retry_delay_secs * attempt as f32);
                        tokio::time::sleep(backoff).await;
                    }
                },
                Err(other) => return Err(other),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Connect("llm request failed".to_string())))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    fn generate_stream<'a>(
        &'a self,
        messages: Vec<Message>,
    ) -> Pin<Box<dyn Stream<Item = CoreResult<StreamChunk>> + Send + 'a>> {
        Box::pin(async_stream::stream! {
            let response = match self.post_stream_with_retry(&messages).await {
                Ok(r) => r,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };

            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(LlmError::Status(e.to_string()).into());
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() {
                        continue;
                    }
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if data == "[DONE]" {
                        return;
                    }

                    match serde_json::from_str::<StreamChunkWire>(data) {
                        Ok(wire) => {
                            let Some(choice) = wire.choices.into_iter().next() else { continue };
                            let finish_reason = choice.finish_reason.as_deref().map(parse_finish_reason);
                            let delta = choice.delta.content.unwrap_or_default();
                            if !delta.is_empty() || finish_reason.is_some() {
                                yield Ok(StreamChunk { delta, finish_reason });
                            }
                        }
                        Err(_) => continue,
                    }
                }
            }
        })
    }

    async fn is_available(&self) -> bool {
        self.http
            .get(&self.config.endpoint)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }

    fn model_name(&self) -> &str {
        "local-llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_role_mapping() {
        let m = Message::user("hi");
        let wire = WireMessage::from(&m);
        assert_eq!(wire.role, "user");
        assert_eq!(wire.content, "hi");
    }

    #[test]
    fn test_parse_finish_reason() {
        assert_eq!(parse_finish_reason("stop"), FinishReason::Stop);
        assert_eq!(parse_finish_reason("length"), FinishReason::Length);
    }

    #[tokio::test]
    async fn test_is_available_false_when_unreachable() {
        let mut config = LlmConfig::default();
        config.endpoint = "http://127.0.0.1:1".to_string();
        let client = LlmClient::new(config).unwrap();
        assert!(!client.is_available().await);
    }
}
