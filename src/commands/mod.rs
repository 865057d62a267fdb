//! Command handlers for the Colloquy CLI

pub mod chat;
pub mod history;
pub mod serve;
