//! Test utilities for Colloquy
//!
//! Scripted provider fakes and temporary-store helpers shared by the unit
//! test modules.

use crate::error::{ColloquyError, Result};
use crate::exchange::ExchangeOrchestrator;
use crate::provider::{ChatProvider, ChatRequest, ProviderStream, StreamEvent};
use crate::store::ThreadStore;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// One scripted provider event
#[derive(Debug, Clone)]
pub enum ScriptedEvent {
    Text(String),
    Reasoning(String),
    Error(String),
    Done,
}

/// Provider that replays a fixed script and records incoming requests
pub struct FakeProvider {
    pub script: Vec<ScriptedEvent>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl FakeProvider {
    pub fn new(script: Vec<ScriptedEvent>) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatProvider for FakeProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ProviderStream> {
        self.requests.lock().unwrap().push(request);

        let events: Vec<Result<StreamEvent>> = self
            .script
            .iter()
            .map(|event| match event {
                ScriptedEvent::Text(text) => Ok(StreamEvent::TextDelta(text.clone())),
                ScriptedEvent::Reasoning(text) => Ok(StreamEvent::ReasoningDelta(text.clone())),
                ScriptedEvent::Error(message) => {
                    Err(ColloquyError::Provider(message.clone()).into())
                }
                ScriptedEvent::Done => Ok(StreamEvent::Done),
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(events)))
    }
}

/// Create a temporary thread store
///
/// Returns both the store and the `TempDir` so the caller keeps ownership
/// of the directory.
pub fn temp_store() -> (Arc<ThreadStore>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let db_path = dir.path().join("threads.db");
    let store = ThreadStore::new_with_path(db_path).expect("Failed to create store");
    (Arc::new(store), dir)
}

/// Build an orchestrator over a scripted provider
pub fn scripted_orchestrator(
    store: Arc<ThreadStore>,
    script: Vec<ScriptedEvent>,
) -> (ExchangeOrchestrator, Arc<FakeProvider>) {
    let provider = Arc::new(FakeProvider::new(script));
    let orchestrator = ExchangeOrchestrator::new(
        store,
        Arc::clone(&provider) as Arc<dyn ChatProvider>,
        Duration::from_secs(5),
    );
    (orchestrator, provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_fake_provider_replays_script() {
        let provider = FakeProvider::new(vec![
            ScriptedEvent::Text("a".to_string()),
            ScriptedEvent::Done,
        ]);

        let mut stream = provider
            .stream_chat(ChatRequest {
                model: "m".to_string(),
                system_prompt: "s".to_string(),
                messages: vec![],
            })
            .await
            .unwrap();

        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            StreamEvent::TextDelta("a".to_string())
        );
        assert_eq!(stream.next().await.unwrap().unwrap(), StreamEvent::Done);
        assert!(stream.next().await.is_none());
        assert_eq!(provider.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_temp_store_is_usable() {
        let (store, _dir) = temp_store();
        let thread = store.create_thread("user-1", "hi", None).unwrap();
        assert_eq!(thread.messages.len(), 1);
    }
}
