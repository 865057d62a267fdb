//! Mutation coordinator
//!
//! Implements the optimistic-update protocol between the session cache and
//! the server: snapshot-before-mutate, apply-locally, invoke-remote,
//! commit-or-rollback. Sends are queued and processed strictly in order,
//! one active mutation at a time, each applied against the latest
//! confirmed-or-pending snapshot. The cache never permanently diverges
//! from server truth, even when the user fires several sends before the
//! first resolves.

use crate::client::cache::SessionCache;
use crate::client::remote::RemoteChat;
use crate::error::Result;
use crate::store::{StoredMessage, Thread};
use std::collections::VecDeque;
use ulid::Ulid;

/// A pending send-message mutation
#[derive(Debug, Clone)]
pub struct QueuedSend {
    pub thread_id: String,
    pub content: String,
    pub model: Option<String>,
}

/// Result of processing one queued send
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Server confirmed; the cache holds the confirmed records
    Applied {
        thread_id: String,
        user_message: StoredMessage,
        assistant_message: Option<StoredMessage>,
    },
    /// Remote failed; the cache was restored to its pre-mutation snapshot
    RolledBack { thread_id: String, notice: String },
}

/// Coordinates optimistic mutations against a remote server
pub struct MutationCoordinator<R: RemoteChat> {
    remote: R,
    queue: VecDeque<QueuedSend>,
}

impl<R: RemoteChat> MutationCoordinator<R> {
    /// Create a coordinator over a remote boundary
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            queue: VecDeque::new(),
        }
    }

    /// Access the remote boundary directly (for non-optimistic reads)
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Number of sends waiting to be processed
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue a send-message mutation
    pub fn enqueue_send(
        &mut self,
        thread_id: impl Into<String>,
        content: impl Into<String>,
        model: Option<String>,
    ) {
        self.queue.push_back(QueuedSend {
            thread_id: thread_id.into(),
            content: content.into(),
            model,
        });
    }

    /// Process all queued sends in order
    pub async fn drain(&mut self, cache: &mut SessionCache) -> Vec<SendOutcome> {
        let mut outcomes = Vec::new();
        while let Some(send) = self.queue.pop_front() {
            outcomes.push(self.process(cache, send).await);
        }
        outcomes
    }

    /// Process one send: snapshot, optimistic apply, remote call, then
    /// commit or rollback
    async fn process(&self, cache: &mut SessionCache, send: QueuedSend) -> SendOutcome {
        let snapshot_messages = cache.messages().to_vec();
        let snapshot_thread = cache.thread(&send.thread_id).cloned();

        let optimistic = optimistic_user_message(&send);
        cache.add_message(optimistic);
        cache.update_thread_messages(&send.thread_id, cache.messages().to_vec());

        match self
            .remote
            .append_message(&send.thread_id, &send.content, send.model.as_deref())
            .await
        {
            Ok(data) => {
                let mut confirmed = snapshot_messages;
                confirmed.push(data.user_message.clone());
                if let Some(assistant) = &data.assistant_message {
                    confirmed.push(assistant.clone());
                }
                cache.set_messages(confirmed.clone());
                cache.update_thread_messages(&send.thread_id, confirmed);
                cache.invalidate_threads();

                SendOutcome::Applied {
                    thread_id: send.thread_id,
                    user_message: data.user_message,
                    assistant_message: data.assistant_message,
                }
            }
            Err(e) => {
                // No partial optimistic state survives a failure.
                cache.set_messages(snapshot_messages);
                if let Some(thread) = snapshot_thread {
                    cache.restore_thread(thread);
                }
                cache.invalidate_threads();

                SendOutcome::RolledBack {
                    thread_id: send.thread_id,
                    notice: format!("Failed to send message: {}", e),
                }
            }
        }
    }

    /// Create a new thread with its first message
    ///
    /// No optimistic apply: the thread does not exist locally until the
    /// server confirms it. On success the cache gains the thread, makes it
    /// active, and adopts its message list.
    pub async fn create_thread(
        &mut self,
        cache: &mut SessionCache,
        content: &str,
        model: Option<&str>,
    ) -> Result<Thread> {
        let thread = self.remote.create_thread(content, model).await?;

        cache.add_thread(thread.clone());
        cache.set_active_thread(thread.id.clone());
        cache.set_messages(thread.messages.clone());
        cache.invalidate_threads();

        Ok(thread)
    }
}

/// Synthesize the optimistic placeholder for a send
fn optimistic_user_message(send: &QueuedSend) -> StoredMessage {
    let mut message = StoredMessage::user(
        send.thread_id.clone(),
        send.content.clone(),
        send.model.clone(),
    );
    message.id = format!("temp-{}", Ulid::new());
    message
}
