//! Command-line interface definition for Colloquy
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving the HTTP API, interactive chat,
//! and thread history inspection.

use clap::{Parser, Subcommand};

/// Colloquy - conversational assistant server
///
/// Serve a streaming chat API backed by a model provider, or talk to a
/// running server from the terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "colloquy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the thread database path
    #[arg(long, env = "COLLOQUY_DB")]
    pub storage_path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Colloquy
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Override the bind address from config
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port from config
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start an interactive chat session against a running server
    Chat {
        /// Base URL of the server
        #[arg(short, long, default_value = "http://127.0.0.1:8080")]
        server: String,

        /// User identity to act as
        #[arg(short, long, env = "COLLOQUY_USER")]
        user: String,

        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,

        /// Open an existing thread by id
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// Inspect stored conversation threads
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List a user's threads
    List {
        /// User identity whose threads to list
        #[arg(short, long)]
        user: String,
    },

    /// Show a thread with its messages
    Show {
        /// Thread id
        id: String,

        /// User identity owning the thread
        #[arg(short, long)]
        user: String,
    },

    /// Delete a thread and its messages
    Delete {
        /// Thread id
        id: String,

        /// User identity owning the thread
        #[arg(short, long)]
        user: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: None,
            storage_path: None,
            verbose: false,
            command: Commands::Serve {
                host: None,
                port: None,
            },
        }
    }
}
