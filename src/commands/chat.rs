//! Interactive chat command
//!
//! A terminal client driving the session cache and mutation coordinator
//! against a running server. Creating a thread persists the user turn
//! server-side; the first generation is then auto-triggered exactly once
//! with user persistence suppressed, streaming increments to the terminal.

use crate::client::{HttpRemote, MutationCoordinator, RemoteChat, SendOutcome, SessionCache};
use crate::codec;
use crate::config::Config;
use crate::error::Result;
use crate::exchange::ExchangeEvent;
use crate::server::ChatBody;
use crate::store::{MessageRole, StoredMessage, Thread};
use colored::Colorize;
use futures::StreamExt;
use std::io::Write;

/// Run the interactive chat loop
pub async fn run_chat(
    config: Config,
    server: String,
    user: String,
    model: Option<String>,
    thread: Option<String>,
) -> Result<()> {
    let model = model.unwrap_or_else(|| config.provider.openrouter.model.clone());
    let remote = HttpRemote::new(server, user);
    let mut cache = SessionCache::new();
    let mut coordinator = MutationCoordinator::new(remote);

    refresh_threads(&mut coordinator, &mut cache).await?;

    if let Some(thread_id) = thread {
        open_thread(&mut coordinator, &mut cache, &thread_id).await?;
    }

    println!("{}", "Colloquy chat. /help for commands, /quit to exit.".dimmed());

    let mut rl = rustyline::DefaultEditor::new()
        .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}", format!("Input error: {}", e).red());
                break;
            }
        };

        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(&line);

        if line == "/quit" || line == "/exit" {
            break;
        } else if line == "/help" {
            print_help();
        } else if line == "/threads" {
            refresh_threads(&mut coordinator, &mut cache).await?;
            print_threads(&cache);
        } else if let Some(thread_id) = line.strip_prefix("/open ") {
            if let Err(e) = open_thread(&mut coordinator, &mut cache, thread_id.trim()).await {
                eprintln!("{}", format!("Failed to open thread: {}", e).red());
            }
        } else if let Some(content) = line.strip_prefix("/new ") {
            if let Err(e) =
                create_and_trigger(&mut coordinator, &mut cache, content.trim(), &model).await
            {
                eprintln!("{}", format!("Failed to create thread: {}", e).red());
            }
        } else if line == "/delete" {
            delete_active_thread(&mut coordinator, &mut cache).await;
        } else if line.starts_with('/') {
            eprintln!("{}", format!("Unknown command: {}", line).yellow());
        } else {
            send_message(&mut coordinator, &mut cache, &line, &model).await;
        }
    }

    Ok(())
}

fn print_help() {
    println!("  /new <message>   start a new thread");
    println!("  /threads         list threads");
    println!("  /open <id>       open a thread");
    println!("  /delete          delete the active thread");
    println!("  /quit            exit");
    println!("  anything else is sent to the active thread");
}

async fn refresh_threads(
    coordinator: &mut MutationCoordinator<HttpRemote>,
    cache: &mut SessionCache,
) -> Result<()> {
    let threads = coordinator.remote().list_threads().await?;
    cache.set_threads(threads);
    Ok(())
}

fn print_threads(cache: &SessionCache) {
    if cache.threads().is_empty() {
        println!("{}", "No threads yet. Start one with /new <message>.".yellow());
        return;
    }
    for thread in cache.threads() {
        let marker = if cache.active_thread_id() == Some(thread.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {}",
            marker,
            thread.id[..8].cyan(),
            thread.title
        );
    }
}

async fn open_thread(
    coordinator: &mut MutationCoordinator<HttpRemote>,
    cache: &mut SessionCache,
    thread_id: &str,
) -> Result<()> {
    // Accept an 8-char prefix against the cached list.
    let resolved = cache
        .threads()
        .iter()
        .find(|t| t.id == thread_id || t.id.starts_with(thread_id))
        .map(|t| t.id.clone())
        .unwrap_or_else(|| thread_id.to_string());

    match coordinator.remote().get_thread(&resolved).await? {
        Some(thread) => {
            cache.set_active_thread(thread.id.clone());
            cache.clear_messages();
            cache.set_messages(thread.messages.clone());
            print_history(&thread);
            Ok(())
        }
        None => {
            Err(crate::error::ColloquyError::Remote("Thread not found".to_string()).into())
        }
    }
}

fn print_history(thread: &Thread) {
    println!("{}", format!("── {} ──", thread.title).dimmed());
    for message in &thread.messages {
        print_message(message);
    }
}

fn print_message(message: &StoredMessage) {
    let Some(canonical) = codec::decode(message) else {
        return;
    };
    let text = canonical.text_content();
    match message.role {
        MessageRole::User => println!("{} {}", "you:".green().bold(), text),
        MessageRole::Assistant => println!("{} {}", "assistant:".blue().bold(), text),
        MessageRole::System => {}
    }
}

/// Create a thread, then auto-trigger its first generation exactly once
async fn create_and_trigger(
    coordinator: &mut MutationCoordinator<HttpRemote>,
    cache: &mut SessionCache,
    content: &str,
    model: &str,
) -> Result<()> {
    let thread = coordinator
        .create_thread(cache, content, Some(model))
        .await?;
    println!("{}", format!("Created thread {}", &thread.id[..8]).dimmed());

    // The seed user turn is already persisted with the thread, so the
    // triggered exchange must not persist it again.
    if cache.has_been_triggered(&thread.id) {
        return Ok(());
    }
    cache.mark_triggered(thread.id.clone());

    let seed = thread
        .messages
        .last()
        .and_then(|m| codec::decode(m))
        .unwrap_or_else(|| codec::CanonicalMessage::user_text(content));

    let request = ChatBody {
        thread_id: thread.id.clone(),
        new_messages: vec![seed],
        model: model.to_string(),
        skip_user_message: true,
    };

    let mut stream = coordinator.remote().stream_exchange(&request).await?;

    print!("{} ", "assistant:".blue().bold());
    let mut failed = false;
    while let Some(event) = stream.next().await {
        match event {
            Ok(ExchangeEvent::TextDelta { delta }) => {
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            }
            Ok(ExchangeEvent::ReasoningDelta { delta }) => {
                print!("{}", delta.dimmed());
                let _ = std::io::stdout().flush();
            }
            Ok(ExchangeEvent::Error { error }) => {
                println!();
                eprintln!("{}", format!("Exchange failed: {}", error).red());
                failed = true;
                break;
            }
            Ok(ExchangeEvent::Finished { persisted }) => {
                println!();
                if !persisted {
                    eprintln!("{}", "Warning: response was not persisted".yellow());
                }
                break;
            }
            Err(e) => {
                println!();
                eprintln!("{}", format!("Stream error: {}", e).red());
                failed = true;
                break;
            }
        }
    }

    // Reconcile from the authoritative store.
    if !failed {
        if let Some(fresh) = coordinator.remote().get_thread(&thread.id).await? {
            cache.set_messages(fresh.messages.clone());
            cache.update_thread_messages(&thread.id, fresh.messages);
        }
    }

    Ok(())
}

/// Send a message to the active thread through the coordinator
async fn send_message(
    coordinator: &mut MutationCoordinator<HttpRemote>,
    cache: &mut SessionCache,
    content: &str,
    model: &str,
) {
    let Some(thread_id) = cache.active_thread_id().map(String::from) else {
        eprintln!(
            "{}",
            "No active thread. Start one with /new <message> or /open <id>.".yellow()
        );
        return;
    };

    coordinator.enqueue_send(thread_id, content, Some(model.to_string()));

    for outcome in coordinator.drain(cache).await {
        match outcome {
            SendOutcome::Applied {
                assistant_message, ..
            } => match assistant_message {
                Some(message) => print_message(&message),
                None => println!("{}", "(no response)".dimmed()),
            },
            SendOutcome::RolledBack { notice, .. } => {
                eprintln!("{}", notice.red());
            }
        }
    }
}

async fn delete_active_thread(
    coordinator: &mut MutationCoordinator<HttpRemote>,
    cache: &mut SessionCache,
) {
    let Some(thread_id) = cache.active_thread_id().map(String::from) else {
        eprintln!("{}", "No active thread.".yellow());
        return;
    };

    match coordinator.remote().delete_thread(&thread_id).await {
        Ok(()) => {
            cache.clear_messages();
            cache.invalidate_threads();
            println!("{}", format!("Deleted thread {}", &thread_id[..8]).green());
        }
        Err(e) => {
            eprintln!("{}", format!("Failed to delete thread: {}", e).red());
        }
    }
}
