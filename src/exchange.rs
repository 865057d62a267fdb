//! Streaming exchange orchestration
//!
//! Given a thread's persisted history plus new canonical input, this module
//! rebuilds the model-facing conversation, opens a streaming call to the
//! provider, forwards increments to the caller as they arrive, and persists
//! the exchanged turns exactly once after the stream completes.
//!
//! Delivery and persistence are deliberately decoupled: user-visible
//! latency tracks the provider's time-to-first-token, while the single
//! `append_messages` call happens once the full response is known. The
//! finalizer is consumed by value, so the finish step structurally cannot
//! run twice.

use crate::codec::{self, CanonicalMessage, Part};
use crate::error::{ColloquyError, Result};
use crate::provider::{ChatProvider, ChatRequest, StreamEvent, WireMessage};
use crate::store::{MessageRole, StoredMessage, ThreadStore};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Input to one streaming exchange
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    /// Thread whose history seeds the exchange
    pub thread_id: String,
    /// New canonical turns appended after the persisted history
    pub new_messages: Vec<CanonicalMessage>,
    /// Model identifier for the provider call
    pub model: String,
    /// Skip persisting the user turn (already persisted by the caller)
    pub skip_user_persist: bool,
}

/// One increment delivered to the exchange consumer
///
/// A stream is a finite sequence of deltas terminated by exactly one
/// `Error` or `Finished` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExchangeEvent {
    TextDelta { delta: String },
    ReasoningDelta { delta: String },
    Error { error: String },
    Finished { persisted: bool },
}

/// Stream of exchange events
pub type ExchangeStream = UnboundedReceiverStream<ExchangeEvent>;

/// Drives streaming exchanges against a provider and persists the outcome
pub struct ExchangeOrchestrator {
    store: Arc<ThreadStore>,
    provider: Arc<dyn ChatProvider>,
    request_timeout: Duration,
}

impl ExchangeOrchestrator {
    /// Create an orchestrator
    pub fn new(
        store: Arc<ThreadStore>,
        provider: Arc<dyn ChatProvider>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            request_timeout,
        }
    }

    /// Run one streaming exchange
    ///
    /// Returns a live stream of increments; persistence happens as a side
    /// effect once the provider stream completes. Dropping the returned
    /// stream stops forwarding and abandons persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be loaded or the provider
    /// call cannot be opened (including timeout). Mid-stream provider
    /// failures surface as a terminal `Error` event instead.
    pub async fn run(&self, request: ExchangeRequest) -> Result<ExchangeStream> {
        let prior = self.store.list_messages(&request.thread_id)?;
        let history = rebuild_history(&prior, &request.new_messages);
        let wire = translate(&history);

        let chat_request = ChatRequest {
            model: request.model.clone(),
            system_prompt: crate::prompts::CHAT_SYSTEM_PROMPT.to_string(),
            messages: wire,
        };

        let provider_stream =
            tokio::time::timeout(self.request_timeout, self.provider.stream_chat(chat_request))
                .await
                .map_err(|_| {
                    ColloquyError::Provider(format!(
                        "Provider call exceeded {}s",
                        self.request_timeout.as_secs()
                    ))
                })??;

        let finalizer = ExchangeFinalizer::new(Arc::clone(&self.store), &request);
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            drive(provider_stream, tx, finalizer).await;
        });

        Ok(UnboundedReceiverStream::new(rx))
    }
}

/// Forward provider increments and run the finish step on completion
async fn drive(
    mut provider_stream: crate::provider::ProviderStream,
    tx: mpsc::UnboundedSender<ExchangeEvent>,
    finalizer: ExchangeFinalizer,
) {
    let mut text = String::new();
    let mut reasoning = String::new();

    while let Some(item) = provider_stream.next().await {
        match item {
            Ok(StreamEvent::TextDelta(delta)) => {
                text.push_str(&delta);
                if tx.send(ExchangeEvent::TextDelta { delta }).is_err() {
                    // Consumer is gone: stop forwarding, abandon persistence.
                    return;
                }
            }
            Ok(StreamEvent::ReasoningDelta(delta)) => {
                reasoning.push_str(&delta);
                if tx.send(ExchangeEvent::ReasoningDelta { delta }).is_err() {
                    return;
                }
            }
            Ok(StreamEvent::Done) => break,
            Err(e) => {
                // Terminal: no assistant turn is persisted after a provider
                // failure.
                tracing::warn!("Provider stream failed: {}", e);
                let _ = tx.send(ExchangeEvent::Error {
                    error: e.to_string(),
                });
                return;
            }
        }
    }

    let mut assistant_parts = Vec::new();
    if !reasoning.is_empty() {
        assistant_parts.push(Part::reasoning(reasoning));
    }
    if !text.is_empty() {
        assistant_parts.push(Part::text(text));
    }

    let persisted = finalizer.persist(assistant_parts);
    let _ = tx.send(ExchangeEvent::Finished { persisted });
}

/// Queued persistence for one exchange
///
/// Holds everything needed for the single `append_messages` call. `persist`
/// consumes the finalizer, making a duplicate finish step unrepresentable.
struct ExchangeFinalizer {
    store: Arc<ThreadStore>,
    thread_id: String,
    model: String,
    user_turn: Option<CanonicalMessage>,
}

impl ExchangeFinalizer {
    fn new(store: Arc<ThreadStore>, request: &ExchangeRequest) -> Self {
        let user_turn = if request.skip_user_persist {
            None
        } else {
            request
                .new_messages
                .last()
                .filter(|m| m.role == MessageRole::User)
                .cloned()
        };

        Self {
            store,
            thread_id: request.thread_id.clone(),
            model: request.model.clone(),
            user_turn,
        }
    }

    /// Append the queued user turn and the assembled assistant turn in one
    /// repository call
    ///
    /// Returns whether persistence succeeded. Failure is logged; the
    /// already-delivered stream is never retracted.
    fn persist(self, assistant_parts: Vec<Part>) -> bool {
        let mut batch = Vec::new();

        if let Some(user) = &self.user_turn {
            batch.push(StoredMessage::user(
                self.thread_id.clone(),
                codec::encode_parts(&user.parts),
                Some(self.model.clone()),
            ));
        }

        if !assistant_parts.is_empty() {
            batch.push(StoredMessage::assistant(
                self.thread_id.clone(),
                codec::encode_parts(&assistant_parts),
                Some(self.model.clone()),
            ));
        }

        if batch.is_empty() {
            return true;
        }

        match self.store.append_messages(&self.thread_id, &batch) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to persist exchange for thread {}: {}", self.thread_id, e);
                false
            }
        }
    }
}

/// Rebuild canonical history: decoded prior messages (omitted ones
/// discarded) followed by the new turns
pub(crate) fn rebuild_history(
    prior: &[StoredMessage],
    new_messages: &[CanonicalMessage],
) -> Vec<CanonicalMessage> {
    let mut history: Vec<CanonicalMessage> = prior.iter().filter_map(codec::decode).collect();
    history.extend(new_messages.iter().cloned());
    history
}

/// Translate canonical history into the provider's wire format
///
/// Strict translation is attempted first; if any message carries an
/// unsupported part shape, the whole history falls back to a degraded
/// translation that concatenates text parts and drops messages left empty.
/// The exchange proceeds either way.
pub(crate) fn translate(history: &[CanonicalMessage]) -> Vec<WireMessage> {
    match translate_strict(history) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::warn!("Strict translation failed, using degraded translation: {}", e);
            translate_degraded(history)
        }
    }
}

fn translate_strict(history: &[CanonicalMessage]) -> std::result::Result<Vec<WireMessage>, ColloquyError> {
    history
        .iter()
        .map(|message| {
            let mut chunks = Vec::new();
            for part in &message.parts {
                match part {
                    Part::Text { text } => chunks.push(text.as_str()),
                    // Reasoning is never echoed back to the model.
                    Part::Reasoning { .. } => {}
                    Part::Other(value) => {
                        let kind = value
                            .get("type")
                            .and_then(|t| t.as_str())
                            .unwrap_or("unknown");
                        return Err(ColloquyError::Translation(format!(
                            "unsupported part kind: {}",
                            kind
                        )));
                    }
                }
            }
            Ok(WireMessage::new(message.role.wire_name(), chunks.join("\n")))
        })
        .collect()
}

fn translate_degraded(history: &[CanonicalMessage]) -> Vec<WireMessage> {
    history
        .iter()
        .filter_map(|message| {
            let content = message.text_content();
            if content.is_empty() {
                None
            } else {
                Some(WireMessage::new(message.role.wire_name(), content))
            }
        })
        .collect()
}

/// Collected outcome of a drained exchange stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeOutcome {
    /// Accumulated response text
    pub text: String,
    /// Accumulated reasoning text
    pub reasoning: String,
    /// Terminal error, if the stream failed
    pub error: Option<String>,
    /// Whether the finish step reported successful persistence
    pub persisted: bool,
}

/// Drain an exchange stream to completion, accumulating its increments
pub async fn collect_exchange(mut stream: ExchangeStream) -> ExchangeOutcome {
    let mut outcome = ExchangeOutcome::default();

    while let Some(event) = stream.next().await {
        match event {
            ExchangeEvent::TextDelta { delta } => outcome.text.push_str(&delta),
            ExchangeEvent::ReasoningDelta { delta } => outcome.reasoning.push_str(&delta),
            ExchangeEvent::Error { error } => {
                outcome.error = Some(error);
                break;
            }
            ExchangeEvent::Finished { persisted } => {
                outcome.persisted = persisted;
                break;
            }
        }
    }

    outcome
}
