//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `spendscope-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, ownership checks in SQL.
//!
//! The statement helpers take a bare `SqliteConnection` so single operations
//! and `commit_turn` (which runs them inside one transaction) share the same SQL.

use chrono::{DateTime, SecondsFormat, Utc};
use spendscope_core::chat::repository::ChatRepository;
use spendscope_types::chat::{ChatMessage, ChatSession, HistoryEdit, MessageRole, TurnCommit};
use spendscope_types::error::RepositoryError;
use spendscope_types::user::UserId;
use sqlx::{Row, Sqlite, SqliteConnection, Transaction};
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRepository`.
#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Open a write transaction that takes SQLite's write lock up front.
    ///
    /// A second writer on the same file (another process) waits on
    /// `busy_timeout` here instead of failing mid-transaction with
    /// `SQLITE_BUSY`, so a moved head surfaces as `Conflict` in `commit_turn`.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, RepositoryError> {
        self.pool
            .writer
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(db_err)
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain ChatSession.
struct ChatSessionRow {
    id: String,
    user_id: String,
    title: String,
    created_at: String,
    updated_at: String,
}

impl ChatSessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        Ok(ChatSession {
            id: parse_uuid(&self.id, "session id")?,
            user_id: UserId(parse_uuid(&self.user_id, "user_id")?),
            title: self.title,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Internal row type for mapping SQLite rows to domain ChatMessage.
struct ChatMessageRow {
    id: String,
    session_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ChatMessage {
            id: parse_uuid(&self.id, "message id")?,
            session_id: parse_uuid(&self.session_id, "session_id")?,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 with microseconds, so string comparison in SQL
/// matches chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_messages(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<ChatMessage>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let msg_row = ChatMessageRow::from_row(row).map_err(db_err)?;
        messages.push(msg_row.into_message()?);
    }
    Ok(messages)
}

async fn fetch_owned_session(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    session_id: &Uuid,
) -> Result<ChatSession, RepositoryError> {
    let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ? AND user_id = ?")
        .bind(session_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

    ChatSessionRow::from_row(&row)
        .map_err(db_err)?
        .into_session()
}

async fn insert_session(
    conn: &mut SqliteConnection,
    session: &ChatSession,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"INSERT INTO chat_sessions (id, user_id, title, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(session.id.to_string())
    .bind(session.user_id.to_string())
    .bind(&session.title)
    .bind(format_datetime(&session.created_at))
    .bind(format_datetime(&session.updated_at))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn insert_message(
    conn: &mut SqliteConnection,
    message: &ChatMessage,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"INSERT INTO chat_messages (id, session_id, role, content, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(message.id.to_string())
    .bind(message.session_id.to_string())
    .bind(message.role.to_string())
    .bind(&message.content)
    .bind(format_datetime(&message.created_at))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn select_messages(
    conn: &mut SqliteConnection,
    session_id: &Uuid,
) -> Result<Vec<ChatMessage>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT * FROM chat_messages WHERE session_id = ? ORDER BY created_at ASC, rowid ASC",
    )
    .bind(session_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;

    map_messages(&rows)
}

/// Id of the session's last message, if any.
async fn head_message_id(
    conn: &mut SqliteConnection,
    session_id: &Uuid,
) -> Result<Option<Uuid>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id FROM chat_messages WHERE session_id = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )
    .bind(session_id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;

    match row {
        Some(row) => {
            let id: String = row.try_get("id").map_err(db_err)?;
            Ok(Some(parse_uuid(&id, "message id")?))
        }
        None => Ok(None),
    }
}

async fn rewrite_message(
    conn: &mut SqliteConnection,
    session_id: &Uuid,
    message_id: &Uuid,
    content: &str,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("UPDATE chat_messages SET content = ? WHERE id = ? AND session_id = ?")
        .bind(content)
        .bind(message_id.to_string())
        .bind(session_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

async fn truncate_after(
    conn: &mut SqliteConnection,
    session_id: &Uuid,
    after: &DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM chat_messages WHERE session_id = ? AND created_at > ?")
        .bind(session_id.to_string())
        .bind(format_datetime(after))
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(result.rows_affected())
}

async fn remove_message(
    conn: &mut SqliteConnection,
    session_id: &Uuid,
    message_id: &Uuid,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM chat_messages WHERE id = ? AND session_id = ?")
        .bind(message_id.to_string())
        .bind(session_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

async fn touch_session(
    conn: &mut SqliteConnection,
    session_id: &Uuid,
    at: &DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE id = ?")
        .bind(format_datetime(at))
        .bind(session_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, RepositoryError> {
        let mut conn = self.pool.writer.acquire().await.map_err(db_err)?;
        insert_session(&mut conn, session).await?;
        Ok(session.clone())
    }

    async fn get_session(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
    ) -> Result<ChatSession, RepositoryError> {
        let mut conn = self.pool.reader.acquire().await.map_err(db_err)?;
        fetch_owned_session(&mut conn, user_id, session_id).await
    }

    async fn list_sessions(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        // LIMIT -1 is "no limit" in SQLite.
        let rows = sqlx::query(
            r#"SELECT * FROM chat_sessions WHERE user_id = ?
               ORDER BY updated_at DESC, rowid DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(user_id.to_string())
        .bind(limit.unwrap_or(-1))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(db_err)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_row = ChatSessionRow::from_row(row).map_err(db_err)?;
            sessions.push(session_row.into_session()?);
        }

        Ok(sessions)
    }

    async fn delete_session(&self, user_id: &UserId, session_id: &Uuid) -> Result<(), RepositoryError> {
        // Messages go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = ? AND user_id = ?")
            .bind(session_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn save_message(&self, user_id: &UserId, message: &ChatMessage) -> Result<(), RepositoryError> {
        let mut tx = self.begin_write().await?;
        fetch_owned_session(&mut tx, user_id, &message.session_id).await?;
        insert_message(&mut tx, message).await?;
        touch_session(&mut tx, &message.session_id, &message.created_at).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_messages(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut conn = self.pool.reader.acquire().await.map_err(db_err)?;
        fetch_owned_session(&mut conn, user_id, session_id).await?;
        select_messages(&mut conn, session_id).await
    }

    async fn get_message(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
        message_id: &Uuid,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut conn = self.pool.reader.acquire().await.map_err(db_err)?;
        fetch_owned_session(&mut conn, user_id, session_id).await?;

        let row = sqlx::query("SELECT * FROM chat_messages WHERE id = ? AND session_id = ?")
            .bind(message_id.to_string())
            .bind(session_id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        ChatMessageRow::from_row(&row).map_err(db_err)?.into_message()
    }

    async fn delete_messages_after(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
        after: &DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.begin_write().await?;
        fetch_owned_session(&mut tx, user_id, session_id).await?;
        let deleted = truncate_after(&mut tx, session_id, after).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(deleted)
    }

    async fn delete_message(
        &self,
        user_id: &UserId,
        session_id: &Uuid,
        message_id: &Uuid,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.begin_write().await?;
        fetch_owned_session(&mut tx, user_id, session_id).await?;
        remove_message(&mut tx, session_id, message_id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn recent_messages_excluding(
        &self,
        user_id: &UserId,
        exclude_session: &Uuid,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT m.* FROM chat_messages m
               JOIN chat_sessions s ON s.id = m.session_id
               WHERE s.user_id = ? AND m.session_id != ?
               ORDER BY m.created_at DESC, m.rowid DESC
               LIMIT ?"#,
        )
        .bind(user_id.to_string())
        .bind(exclude_session.to_string())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(db_err)?;

        map_messages(&rows)
    }

    async fn commit_turn(&self, commit: &TurnCommit) -> Result<(), RepositoryError> {
        // Dropping `tx` on any early return rolls the whole turn back.
        let mut tx = self.begin_write().await?;

        let creates_session = commit
            .edits
            .iter()
            .any(|e| matches!(e, HistoryEdit::CreateSession(_)));
        if !creates_session {
            fetch_owned_session(&mut tx, &commit.user_id, &commit.session_id).await?;
            let head = head_message_id(&mut tx, &commit.session_id).await?;
            if head != commit.expected_head {
                return Err(RepositoryError::Conflict(
                    "session history changed during the turn".to_string(),
                ));
            }
        }

        for edit in &commit.edits {
            match edit {
                HistoryEdit::CreateSession(session) => {
                    if session.user_id != commit.user_id || session.id != commit.session_id {
                        return Err(RepositoryError::Query(
                            "new session does not match the turn".to_string(),
                        ));
                    }
                    insert_session(&mut tx, session).await?;
                }
                HistoryEdit::Append(message) => insert_message(&mut tx, message).await?,
                HistoryEdit::Rewrite { message_id, content } => {
                    rewrite_message(&mut tx, &commit.session_id, message_id, content).await?;
                }
                HistoryEdit::TruncateAfter { created_at } => {
                    truncate_after(&mut tx, &commit.session_id, created_at).await?;
                }
                HistoryEdit::Remove { message_id } => {
                    remove_message(&mut tx, &commit.session_id, message_id).await?;
                }
            }
        }

        insert_message(&mut tx, &commit.reply).await?;
        touch_session(&mut tx, &commit.session_id, &commit.reply.created_at).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
