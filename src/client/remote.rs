//! Remote chat boundary
//!
//! The `RemoteChat` trait is the seam between the client-side coordinator
//! and the server; `HttpRemote` is the production implementation speaking
//! the serve API over HTTP with the opaque identity header.

use crate::error::{ColloquyError, Result};
use crate::exchange::ExchangeEvent;
use crate::provider::sse::SseParser;
use crate::server::{ActionResponse, AppendMessageData, ChatBody, CreateMessageBody, CreateThreadBody};
use crate::store::Thread;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Stream of exchange events read from the server
pub type RemoteEventStream = Pin<Box<dyn Stream<Item = Result<ExchangeEvent>> + Send>>;

/// Client-side view of the server's conversation API
#[async_trait]
pub trait RemoteChat: Send + Sync {
    /// List the caller's threads, newest first
    async fn list_threads(&self) -> Result<Vec<Thread>>;

    /// Fetch one thread; `None` when unknown or not owned
    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// Create a thread seeded with its first message
    async fn create_thread(&self, content: &str, model: Option<&str>) -> Result<Thread>;

    /// Append a message and run a full exchange, returning both persisted
    /// records
    async fn append_message(
        &self,
        thread_id: &str,
        content: &str,
        model: Option<&str>,
    ) -> Result<AppendMessageData>;

    /// Delete a thread and its messages
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Open a streaming exchange
    async fn stream_exchange(&self, request: &ChatBody) -> Result<RemoteEventStream>;
}

/// HTTP implementation of the remote boundary
pub struct HttpRemote {
    base_url: String,
    user_id: String,
    client: reqwest::Client,
}

impl HttpRemote {
    /// Create a remote for a server base URL, acting as the given user
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Parse an action envelope, turning `success: false` into an error
    async fn parse_action<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let envelope: ActionResponse<T> = response.json().await?;
        if !envelope.success {
            return Err(ColloquyError::Remote(envelope.message).into());
        }
        envelope
            .data
            .ok_or_else(|| ColloquyError::Remote("response carried no data".to_string()).into())
    }
}

#[async_trait]
impl RemoteChat for HttpRemote {
    async fn list_threads(&self) -> Result<Vec<Thread>> {
        let response = self
            .client
            .get(self.url("/api/threads"))
            .header("x-user-id", &self.user_id)
            .send()
            .await?;
        Self::parse_action(response).await
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let response = self
            .client
            .get(self.url(&format!("/api/threads/{}", thread_id)))
            .header("x-user-id", &self.user_id)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::parse_action(response).await?))
    }

    async fn create_thread(&self, content: &str, model: Option<&str>) -> Result<Thread> {
        let body = CreateThreadBody {
            content: content.to_string(),
            model: model.map(|m| m.to_string()),
        };
        let response = self
            .client
            .post(self.url("/api/threads"))
            .header("x-user-id", &self.user_id)
            .json(&body)
            .send()
            .await?;
        Self::parse_action(response).await
    }

    async fn append_message(
        &self,
        thread_id: &str,
        content: &str,
        model: Option<&str>,
    ) -> Result<AppendMessageData> {
        let body = CreateMessageBody {
            content: content.to_string(),
            model: model.map(|m| m.to_string()),
        };
        let response = self
            .client
            .post(self.url(&format!("/api/threads/{}/messages", thread_id)))
            .header("x-user-id", &self.user_id)
            .json(&body)
            .send()
            .await?;
        Self::parse_action(response).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/threads/{}", thread_id)))
            .header("x-user-id", &self.user_id)
            .send()
            .await?;

        let envelope: ActionResponse<serde_json::Value> = response.json().await?;
        if !envelope.success {
            return Err(ColloquyError::Remote(envelope.message).into());
        }
        Ok(())
    }

    async fn stream_exchange(&self, request: &ChatBody) -> Result<RemoteEventStream> {
        let response = self
            .client
            .post(self.url("/api/chat"))
            .header("x-user-id", &self.user_id)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(ColloquyError::Remote(format!("{}: {}", status, error)).into());
        }

        let (tx, rx) = mpsc::unbounded_channel::<Result<ExchangeEvent>>();
        let byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut parser = SseParser::new();
            tokio::pin!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(Err(ColloquyError::Remote(format!(
                            "Stream read failed: {}",
                            e
                        ))
                        .into()));
                        return;
                    }
                };

                for payload in parser.push(&chunk) {
                    match serde_json::from_str::<ExchangeEvent>(&payload) {
                        Ok(event) => {
                            let terminal = matches!(
                                event,
                                ExchangeEvent::Error { .. } | ExchangeEvent::Finished { .. }
                            );
                            if tx.send(Ok(event)).is_err() || terminal {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Skipping malformed exchange event: {}", e);
                        }
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
