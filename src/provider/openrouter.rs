//! OpenRouter streaming provider
//!
//! Implements `ChatProvider` against the OpenRouter chat-completions API
//! (OpenAI-compatible). Requests are issued with `stream: true`; the SSE
//! body is parsed incrementally and forwarded as `StreamEvent`s through an
//! unbounded channel, so the caller starts receiving deltas before the
//! response is complete.

use crate::config::OpenRouterConfig;
use crate::error::{ColloquyError, Result};
use crate::provider::base::{ChatProvider, ChatRequest, ProviderStream, StreamEvent, WireMessage};
use crate::provider::sse::SseParser;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// OpenRouter provider
pub struct OpenRouterProvider {
    config: OpenRouterConfig,
    api_key: String,
    client: reqwest::Client,
}

/// Request body for the chat-completions endpoint
#[derive(Debug, Serialize)]
struct CompletionsRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

/// One parsed SSE chunk from the completions stream
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    message: String,
}

impl OpenRouterProvider {
    /// Create a provider reading the API key from the configured
    /// environment variable
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` when the variable is unset or empty.
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        if api_key.is_empty() {
            return Err(ColloquyError::MissingCredentials(format!(
                "openrouter (set {})",
                config.api_key_env
            ))
            .into());
        }
        Ok(Self::new_with_key(config, api_key))
    }

    /// Create a provider with an explicit API key
    pub fn new_with_key(config: OpenRouterConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ProviderStream> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage::new("system", request.system_prompt.clone()));
        messages.extend(request.messages);

        let body = CompletionsRequest {
            model: request.model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ColloquyError::Provider(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format_api_error(status, &body).into());
        }

        let (tx, rx) = mpsc::unbounded_channel::<Result<StreamEvent>>();
        let byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut parser = SseParser::new();
            tokio::pin!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(Err(ColloquyError::Provider(format!(
                            "Stream read failed: {}",
                            e
                        ))
                        .into()));
                        return;
                    }
                };

                for payload in parser.push(&chunk) {
                    if payload == "[DONE]" {
                        let _ = tx.send(Ok(StreamEvent::Done));
                        return;
                    }
                    for event in parse_chunk_payload(&payload) {
                        // A closed receiver means the consumer is gone; stop
                        // forwarding and abandon the provider stream.
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                }
            }

            // Stream ended without an explicit [DONE]; treat as completion.
            let _ = tx.send(Ok(StreamEvent::Done));
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

/// Translate one SSE data payload into zero or more stream events
fn parse_chunk_payload(payload: &str) -> Vec<Result<StreamEvent>> {
    let chunk: StreamChunk = match serde_json::from_str(payload) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Skipping malformed stream chunk: {}", e);
            return Vec::new();
        }
    };

    if let Some(error) = chunk.error {
        return vec![Err(ColloquyError::Provider(error.message).into())];
    }

    let mut events = Vec::new();
    for choice in chunk.choices {
        if let Some(reasoning) = choice.delta.reasoning {
            if !reasoning.is_empty() {
                events.push(Ok(StreamEvent::ReasoningDelta(reasoning)));
            }
        }
        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                events.push(Ok(StreamEvent::TextDelta(content)));
            }
        }
    }
    events
}

fn format_api_error(status: reqwest::StatusCode, body: &str) -> ColloquyError {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        ColloquyError::Authentication(format!(
            "OpenRouter returned error {}: {}. The API key may be invalid or expired",
            status, body
        ))
    } else {
        ColloquyError::Provider(format!("OpenRouter returned error {}: {}", status, body))
    }
}
