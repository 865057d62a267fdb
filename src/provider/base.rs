//! Base provider trait and common types
//!
//! This module defines the `ChatProvider` trait that model providers
//! implement, along with the wire-level message and stream event types.

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A role-tagged message in the provider's wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Role of the message sender ("system", "user", "assistant")
    pub role: String,
    /// Plain-text content
    pub content: String,
}

impl WireMessage {
    /// Create a new wire message
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::provider::WireMessage;
    ///
    /// let msg = WireMessage::new("user", "Hello");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A streaming chat request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier (e.g., "openai/gpt-4o-mini")
    pub model: String,
    /// System instruction sent ahead of the history
    pub system_prompt: String,
    /// Translated conversation history
    pub messages: Vec<WireMessage>,
}

/// One increment of streamed provider output
///
/// A well-behaved stream is a finite sequence of deltas terminated by a
/// single `Done`. Consumers may stop reading at any point; producers stop
/// forwarding when the consumer goes away.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Partial response text
    TextDelta(String),
    /// Partial reasoning text
    ReasoningDelta(String),
    /// End of stream
    Done,
}

/// A lazy, finite, non-restartable sequence of stream events
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Trait implemented by model providers
///
/// # Examples
///
/// ```no_run
/// use colloquy::provider::{ChatProvider, ChatRequest, ProviderStream};
/// use colloquy::error::Result;
/// use async_trait::async_trait;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl ChatProvider for MyProvider {
///     async fn stream_chat(&self, _request: ChatRequest) -> Result<ProviderStream> {
///         Ok(Box::pin(futures::stream::empty()))
///     }
/// }
/// ```
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Open a streaming exchange with the provider
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be issued or the provider
    /// rejects it. Mid-stream failures surface as `Err` items on the
    /// returned stream.
    async fn stream_chat(&self, request: ChatRequest) -> Result<ProviderStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_new() {
        let msg = WireMessage::new("assistant", "Hi there");
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "Hi there");
    }

    #[test]
    fn test_wire_message_serialization() {
        let msg = WireMessage::new("user", "Test");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Test"}"#);
    }

    #[test]
    fn test_stream_event_equality() {
        assert_eq!(
            StreamEvent::TextDelta("a".to_string()),
            StreamEvent::TextDelta("a".to_string())
        );
        assert_ne!(StreamEvent::Done, StreamEvent::TextDelta(String::new()));
    }
}
