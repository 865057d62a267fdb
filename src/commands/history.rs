//! History command handler
//!
//! Direct repository inspection from the terminal: list, show, and delete
//! threads without going through the HTTP surface.

use crate::cli::HistoryCommand;
use crate::codec;
use crate::error::Result;
use crate::store::{MessageRole, ThreadStore};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub fn handle_history(command: HistoryCommand) -> Result<()> {
    let store = ThreadStore::new()?;

    match command {
        HistoryCommand::List { user } => {
            let threads = store.list_threads(&user)?;

            if threads.is_empty() {
                println!("{}", "No threads found.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Model".bold(),
                "Messages".bold(),
                "Created".bold()
            ]);

            for thread in threads {
                let id_short = &thread.id[..8];
                let title = if thread.title.len() > 40 {
                    format!("{}...", &thread.title[..37])
                } else {
                    thread.title
                };
                let model = thread.model.unwrap_or_else(|| "-".to_string());
                let created = thread.created_at.format("%Y-%m-%d %H:%M").to_string();

                table.add_row(prettytable::row![
                    id_short.cyan(),
                    title,
                    model,
                    thread.messages.len(),
                    created
                ]);
            }

            println!("\nThreads:");
            table.printstd();
            println!();
        }
        HistoryCommand::Show { id, user } => match store.get_thread(&id, &user)? {
            Some(thread) => {
                println!("{} {}", thread.title.bold(), format!("({})", thread.id).dimmed());
                for message in &thread.messages {
                    let Some(canonical) = codec::decode(message) else {
                        continue;
                    };
                    let role = match message.role {
                        MessageRole::User => "user".green(),
                        MessageRole::Assistant => "assistant".blue(),
                        MessageRole::System => "system".yellow(),
                    };
                    println!("[{}] {}", role, canonical.text_content());
                }
            }
            None => {
                println!("{}", "Thread not found.".yellow());
            }
        },
        HistoryCommand::Delete { id, user } => {
            if store.delete_thread(&id, &user)? {
                println!("{}", format!("Deleted thread {}", id).green());
            } else {
                println!("{}", "Thread not found.".yellow());
            }
        }
    }

    Ok(())
}
