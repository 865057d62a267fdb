//! Client conversation cache
//!
//! A per-session, in-memory projection of the server's conversation state:
//! the known threads, the active thread, the message list currently
//! displayed, and the set of threads whose initial generation has already
//! been auto-triggered. Not durable; rebuilt from the repository's
//! authoritative data on load. Single-threaded cooperative access, so no
//! locking, only ordering discipline.

use crate::store::{StoredMessage, Thread};
use std::collections::HashSet;

/// Session-scoped conversation cache
#[derive(Debug, Default)]
pub struct SessionCache {
    threads: Vec<Thread>,
    active_thread_id: Option<String>,
    messages: Vec<StoredMessage>,
    triggered: HashSet<String>,
    threads_stale: bool,
}

impl SessionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Known threads, most recently added first
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Messages of the active thread
    pub fn messages(&self) -> &[StoredMessage] {
        &self.messages
    }

    /// Identity of the active thread
    pub fn active_thread_id(&self) -> Option<&str> {
        self.active_thread_id.as_deref()
    }

    /// Look up a cached thread by id
    pub fn thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    /// Replace the full thread list (fresh load); clears staleness
    pub fn set_threads(&mut self, threads: Vec<Thread>) {
        self.threads = threads;
        self.threads_stale = false;
    }

    /// Prepend a newly created thread
    pub fn add_thread(&mut self, thread: Thread) {
        self.threads.insert(0, thread);
    }

    /// Replace a cached thread entry in place (rollback path)
    pub fn restore_thread(&mut self, thread: Thread) {
        if let Some(slot) = self.threads.iter_mut().find(|t| t.id == thread.id) {
            *slot = thread;
        }
    }

    /// Replace a cached thread's message list, if the thread is cached
    pub fn update_thread_messages(&mut self, thread_id: &str, messages: Vec<StoredMessage>) {
        if let Some(thread) = self.threads.iter_mut().find(|t| t.id == thread_id) {
            thread.messages = messages;
        }
    }

    /// Set the active thread
    pub fn set_active_thread(&mut self, thread_id: impl Into<String>) {
        self.active_thread_id = Some(thread_id.into());
    }

    /// Replace the active message list (fresh load or reconcile)
    pub fn set_messages(&mut self, messages: Vec<StoredMessage>) {
        self.messages = messages;
    }

    /// Append one message (user or assistant)
    pub fn add_message(&mut self, message: StoredMessage) {
        self.messages.push(message);
    }

    /// Clear messages when switching threads
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Record that a thread's initial generation has been triggered
    pub fn mark_triggered(&mut self, thread_id: impl Into<String>) {
        self.triggered.insert(thread_id.into());
    }

    /// Whether a thread's initial generation has already been triggered
    pub fn has_been_triggered(&self, thread_id: &str) -> bool {
        self.triggered.contains(thread_id)
    }

    /// Mark the thread list stale; the next load refetches
    pub fn invalidate_threads(&mut self) {
        self.threads_stale = true;
    }

    /// Whether the thread list needs a refetch
    pub fn threads_stale(&self) -> bool {
        self.threads_stale
    }
}
