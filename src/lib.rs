//! Colloquy - conversational assistant library
//!
//! This library implements the message synchronization and streaming
//! pipeline behind a conversational assistant: a codec normalizing stored
//! message payloads into one canonical shape, a SQLite-backed conversation
//! repository, a streaming exchange orchestrator persisting each exchange
//! exactly once, and a client-side cache with optimistic mutations.
//!
//! # Architecture
//!
//! - `codec`: stored payload <-> canonical part-based message translation
//! - `store`: thread/message persistence with ownership scoping
//! - `provider`: model-provider abstraction and OpenRouter implementation
//! - `exchange`: streaming exchange orchestration and persistence
//! - `server`: HTTP surface (streaming endpoint + mutation actions)
//! - `client`: session cache, mutation coordinator, remote boundary
//! - `config`, `error`, `cli`, `prompts`: supporting infrastructure
//!
//! # Example
//!
//! ```no_run
//! use colloquy::{Config, ThreadStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! config.validate()?;
//!
//! let store = ThreadStore::new()?;
//! let thread = store.create_thread("user-1", "Hello", None)?;
//! assert_eq!(thread.messages.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod codec;
pub mod commands;
pub mod config;
pub mod error;
pub mod exchange;
pub mod prompts;
pub mod provider;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use client::{MutationCoordinator, SessionCache};
pub use codec::{CanonicalMessage, Part};
pub use config::Config;
pub use error::{ColloquyError, Result};
pub use exchange::{ExchangeEvent, ExchangeOrchestrator, ExchangeRequest};
pub use store::{MessageKind, MessageRole, StoredMessage, Thread, ThreadStore};

#[cfg(test)]
pub mod test_utils;
