//! Shared helpers for integration tests

use async_trait::async_trait;
use colloquy::error::{ColloquyError, Result};
use colloquy::exchange::ExchangeOrchestrator;
use colloquy::provider::{ChatProvider, ChatRequest, ProviderStream, StreamEvent};
use colloquy::server::{build_router, AppState};
use colloquy::store::ThreadStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// One scripted provider event
#[derive(Debug, Clone)]
#[allow(dead_code)]
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
pub fn temp_store() -> (Arc<ThreadStore>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let db_path = dir.path().join("threads.db");
    let store = ThreadStore::new_with_path(db_path).expect("Failed to create store");
    (Arc::new(store), dir)
}

/// Build a router over a temp store and a scripted provider
#[allow(dead_code)]
pub fn test_app(script: Vec<ScriptedEvent>) -> (axum::Router, Arc<ThreadStore>, TempDir) {
    let (store, dir) = temp_store();
    let provider = Arc::new(FakeProvider::new(script));
    let orchestrator = Arc::new(ExchangeOrchestrator::new(
        Arc::clone(&store),
        provider as Arc<dyn ChatProvider>,
        Duration::from_secs(5),
    ));

    let state = Arc::new(AppState {
        store: Arc::clone(&store),
        orchestrator,
        default_model: "test-model".to_string(),
    });

    (build_router(state), store, dir)
}
