//! Client-side conversation state
//!
//! The session cache, the optimistic mutation coordinator, and the remote
//! boundary they talk through.

pub mod cache;
pub mod coordinator;
pub mod remote;

pub use cache::SessionCache;
pub use coordinator::{MutationCoordinator, QueuedSend, SendOutcome};
pub use remote::{HttpRemote, RemoteChat, RemoteEventStream};
