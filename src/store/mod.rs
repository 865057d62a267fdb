//! Conversation persistence
//!
//! SQLite-backed storage for threads and their messages. Each operation is
//! a single logical transaction scoped to the caller's identity; a thread
//! owned by another user is indistinguishable from a missing thread.

use crate::error::{ColloquyError, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use uuid::Uuid;

pub mod types;
pub use types::{MessageKind, MessageRole, StoredMessage, Thread};

/// Maximum title length derived from the seed message, in characters
const TITLE_MAX_CHARS: usize = 50;

/// Storage backend for conversation threads
pub struct ThreadStore {
    db_path: PathBuf,
}

impl ThreadStore {
    /// Create a new store instance
    ///
    /// Initializes the database file in the user's data directory.
    pub fn new() -> Result<Self> {
        // Allow override of the DB path via environment variable so the
        // binary can be pointed at a test DB or alternate file without
        // changing the application data dir.
        if let Ok(override_path) = std::env::var("COLLOQUY_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "colloquy-dev", "colloquy")
            .ok_or_else(|| ColloquyError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        let db_path = data_dir.join("threads.db");
        let store = Self { db_path };

        store.init()?;

        Ok(store)
    }

    /// Create a store instance that uses the specified database path
    ///
    /// Primarily useful for tests where the default application data
    /// directory is not desirable.
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ColloquyError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Open a connection with foreign keys enforced
    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        Ok(conn)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS threads (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                model TEXT,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                kind TEXT NOT NULL,
                model TEXT,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_thread
                ON messages(thread_id, created_at);",
        )
        .context("Failed to create tables")
        .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Create a thread seeded with its first USER message
    ///
    /// The thread and the seed message are inserted in one transaction; a
    /// thread is never observable without at least one message. The title
    /// is the seed content truncated to a bounded length.
    pub fn create_thread(
        &self,
        user_id: &str,
        content: &str,
        model: Option<&str>,
    ) -> Result<Thread> {
        let mut conn = self.open()?;

        let thread_id = Uuid::new_v4().to_string();
        let title = derive_title(content);
        let now = Utc::now();
        let seed =
            StoredMessage::user(thread_id.clone(), content, model.map(|m| m.to_string()));

        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        tx.execute(
            "INSERT INTO threads (id, title, model, user_id, created_at)
            VALUES (?, ?, ?, ?, ?)",
            params![thread_id, title, model, user_id, now.to_rfc3339()],
        )
        .context("Failed to insert thread")
        .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        insert_message(&tx, &thread_id, &seed)?;

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        Ok(Thread {
            id: thread_id,
            title,
            model: model.map(|m| m.to_string()),
            user_id: user_id.to_string(),
            messages: vec![seed],
            created_at: now,
        })
    }

    /// List the user's threads, newest first, messages included
    pub fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, model, user_id, created_at
                FROM threads
                WHERE user_id = ?
                ORDER BY created_at DESC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id], row_to_thread)
            .context("Failed to query threads")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        let mut threads = Vec::new();
        for row in rows.flatten() {
            threads.push(row);
        }
        drop(stmt);

        for thread in &mut threads {
            thread.messages = query_messages(&conn, &thread.id)?;
        }

        Ok(threads)
    }

    /// Fetch a thread by id, scoped to the owning user
    ///
    /// Returns `None` for unknown ids and for threads owned by other users.
    pub fn get_thread(&self, thread_id: &str, user_id: &str) -> Result<Option<Thread>> {
        let conn = self.open()?;

        let thread = conn
            .query_row(
                "SELECT id, title, model, user_id, created_at
                FROM threads
                WHERE id = ? AND user_id = ?",
                params![thread_id, user_id],
                row_to_thread,
            )
            .optional()
            .context("Failed to query thread")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        match thread {
            Some(mut thread) => {
                thread.messages = query_messages(&conn, &thread.id)?;
                Ok(Some(thread))
            }
            None => Ok(None),
        }
    }

    /// Fetch a thread's messages in creation order
    pub fn list_messages(&self, thread_id: &str) -> Result<Vec<StoredMessage>> {
        let conn = self.open()?;
        query_messages(&conn, thread_id)
    }

    /// Append one or more messages to a thread, preserving call order
    ///
    /// All messages are inserted in one transaction. Ownership is not
    /// re-validated here; callers check it before handing over a thread id.
    pub fn append_messages(&self, thread_id: &str, messages: &[StoredMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut conn = self.open()?;

        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        for message in messages {
            insert_message(&tx, thread_id, message)?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Delete a thread and all of its messages
    ///
    /// Returns `false` when no thread was deleted, covering both unknown
    /// ids and threads owned by other users.
    pub fn delete_thread(&self, thread_id: &str, user_id: &str) -> Result<bool> {
        let conn = self.open()?;

        let deleted = conn
            .execute(
                "DELETE FROM threads WHERE id = ? AND user_id = ?",
                params![thread_id, user_id],
            )
            .context("Failed to delete thread")
            .map_err(|e| ColloquyError::Storage(e.to_string()))?;

        Ok(deleted > 0)
    }
}

/// Derive a thread title from seed content: first 50 characters plus an
/// ellipsis marker when truncated
pub(crate) fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str("...");
        title
    } else {
        content.to_string()
    }
}

fn insert_message(conn: &Connection, thread_id: &str, message: &StoredMessage) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, thread_id, role, kind, model, content, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            message.id,
            thread_id,
            message.role.as_str(),
            message.kind.as_str(),
            message.model,
            message.content,
            message.created_at.to_rfc3339()
        ],
    )
    .context("Failed to insert message")
    .map_err(|e| ColloquyError::Storage(e.to_string()))?;

    Ok(())
}

fn query_messages(conn: &Connection, thread_id: &str) -> Result<Vec<StoredMessage>> {
    let mut stmt = conn
        .prepare(
            // rowid breaks ties for messages created in the same instant,
            // keeping insertion order.
            "SELECT id, thread_id, role, kind, model, content, created_at
            FROM messages
            WHERE thread_id = ?
            ORDER BY created_at ASC, rowid ASC",
        )
        .context("Failed to prepare statement")
        .map_err(|e| ColloquyError::Storage(e.to_string()))?;

    let rows = stmt
        .query_map(params![thread_id], row_to_message)
        .context("Failed to query messages")
        .map_err(|e| ColloquyError::Storage(e.to_string()))?;

    let mut messages = Vec::new();
    for row in rows.flatten() {
        messages.push(row);
    }

    Ok(messages)
}

fn row_to_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<Thread> {
    let created_at_str: String = row.get(4)?;
    Ok(Thread {
        id: row.get(0)?,
        title: row.get(1)?,
        model: row.get(2)?,
        user_id: row.get(3)?,
        messages: Vec::new(),
        created_at: parse_timestamp(&created_at_str),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let role_str: String = row.get(2)?;
    let kind_str: String = row.get(3)?;
    let created_at_str: String = row.get(6)?;

    Ok(StoredMessage {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        role: MessageRole::parse_str(&role_str).unwrap_or(MessageRole::User),
        kind: MessageKind::parse_str(&kind_str).unwrap_or(MessageKind::Normal),
        model: row.get(4)?,
        content: row.get(5)?,
        created_at: parse_timestamp(&created_at_str),
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    fn create_test_store() -> (ThreadStore, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("threads.db");
        let store = ThreadStore::new_with_path(db_path).expect("failed to create store");
        (store, dir)
    }

    #[test]
    fn test_init_creates_tables() {
        let (store, _dir) = create_test_store();
        let conn = Connection::open(&store.db_path).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table'
                AND name IN ('threads', 'messages')",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_create_thread_includes_seed_message() {
        let (store, _dir) = create_test_store();
        let thread = store
            .create_thread("user-1", "Hello", Some("gpt-4o"))
            .expect("create failed");

        assert_eq!(thread.title, "Hello");
        assert_eq!(thread.user_id, "user-1");
        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].role, MessageRole::User);
        assert_eq!(thread.messages[0].content, "Hello");

        let fetched = store
            .get_thread(&thread.id, "user-1")
            .expect("get failed")
            .expect("thread should exist");
        assert_eq!(fetched.messages.len(), 1);
        assert_eq!(fetched.messages[0].content, "Hello");
    }

    #[test]
    fn test_title_is_truncated_with_ellipsis() {
        let (store, _dir) = create_test_store();
        let long_content = "x".repeat(80);
        let thread = store
            .create_thread("user-1", &long_content, None)
            .expect("create failed");

        assert_eq!(thread.title.chars().count(), 53);
        assert!(thread.title.ends_with("..."));
    }

    #[test]
    fn test_short_title_is_not_truncated() {
        assert_eq!(derive_title("Hello"), "Hello");
        let exactly_fifty = "y".repeat(50);
        assert_eq!(derive_title(&exactly_fifty), exactly_fifty);
    }

    #[test]
    fn test_derive_title_is_char_boundary_safe() {
        let content = "é".repeat(60);
        let title = derive_title(&content);
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn test_get_thread_returns_none_for_missing_id() {
        let (store, _dir) = create_test_store();
        let result = store.get_thread("missing", "user-1").expect("get failed");
        assert!(result.is_none());
    }

    // Another user's thread must be indistinguishable from an unknown id.
    #[test]
    fn test_get_thread_enforces_ownership() {
        let (store, _dir) = create_test_store();
        let thread = store
            .create_thread("user-1", "private", None)
            .expect("create failed");

        let result = store.get_thread(&thread.id, "user-2").expect("get failed");
        assert!(result.is_none());
    }

    #[test]
    fn test_list_threads_newest_first() {
        let (store, _dir) = create_test_store();
        let first = store
            .create_thread("user-1", "first", None)
            .expect("create failed");
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = store
            .create_thread("user-1", "second", None)
            .expect("create failed");

        let threads = store.list_threads("user-1").expect("list failed");
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, second.id);
        assert_eq!(threads[1].id, first.id);
        assert_eq!(threads[0].messages.len(), 1);
    }

    #[test]
    fn test_list_threads_scoped_to_user() {
        let (store, _dir) = create_test_store();
        store
            .create_thread("user-1", "mine", None)
            .expect("create failed");
        store
            .create_thread("user-2", "theirs", None)
            .expect("create failed");

        let threads = store.list_threads("user-1").expect("list failed");
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].title, "mine");
    }

    #[test]
    fn test_append_preserves_call_order() {
        let (store, _dir) = create_test_store();
        let thread = store
            .create_thread("user-1", "seed", None)
            .expect("create failed");

        let a = StoredMessage::user(thread.id.clone(), "A", None);
        let b = StoredMessage::assistant(thread.id.clone(), "B", None);
        store
            .append_messages(&thread.id, &[a, b])
            .expect("append failed");

        let messages = store.list_messages(&thread.id).expect("list failed");
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["seed", "A", "B"]);
    }

    #[test]
    fn test_messages_ordered_by_creation_time() {
        let (store, _dir) = create_test_store();
        let thread = store
            .create_thread("user-1", "seed", None)
            .expect("create failed");

        for i in 0..5 {
            let message = StoredMessage::user(thread.id.clone(), format!("m{}", i), None);
            store
                .append_messages(&thread.id, &[message])
                .expect("append failed");
        }

        let messages = store.list_messages(&thread.id).expect("list failed");
        for pair in messages.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[test]
    fn test_append_empty_slice_is_noop() {
        let (store, _dir) = create_test_store();
        let thread = store
            .create_thread("user-1", "seed", None)
            .expect("create failed");
        store.append_messages(&thread.id, &[]).expect("append failed");
        assert_eq!(store.list_messages(&thread.id).expect("list failed").len(), 1);
    }

    #[test]
    fn test_delete_thread_cascades_to_messages() {
        let (store, _dir) = create_test_store();
        let thread = store
            .create_thread("user-1", "seed", None)
            .expect("create failed");
        store
            .append_messages(
                &thread.id,
                &[StoredMessage::assistant(thread.id.clone(), "reply", None)],
            )
            .expect("append failed");

        let deleted = store.delete_thread(&thread.id, "user-1").expect("delete failed");
        assert!(deleted);

        assert!(store
            .get_thread(&thread.id, "user-1")
            .expect("get failed")
            .is_none());
        assert!(store.list_messages(&thread.id).expect("list failed").is_empty());
    }

    #[test]
    fn test_delete_thread_enforces_ownership() {
        let (store, _dir) = create_test_store();
        let thread = store
            .create_thread("user-1", "seed", None)
            .expect("create failed");

        let deleted = store.delete_thread(&thread.id, "user-2").expect("delete failed");
        assert!(!deleted);
        assert!(store
            .get_thread(&thread.id, "user-1")
            .expect("get failed")
            .is_some());
    }

    #[test]
    fn test_delete_missing_thread_reports_not_found() {
        let (store, _dir) = create_test_store();
        let deleted = store.delete_thread("missing", "user-1").expect("delete failed");
        assert!(!deleted);
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("nested").join("threads.db");
        env::set_var("COLLOQUY_DB", db_path.to_string_lossy().to_string());

        let store = ThreadStore::new().expect("new failed with env override");
        assert_eq!(store.db_path, db_path);
        assert!(db_path.parent().unwrap().exists());

        env::remove_var("COLLOQUY_DB");
    }
}
