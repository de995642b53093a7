//! Repository layer for database operations
//!
//! CRUD and query operations for notes. The repository is the only
//! component that talks SQL; ordering guarantees of the two list
//! queries are established here.

use super::models::Note;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Repository for note persistence
#[derive(Clone)]
pub struct NoteRepository {
    pool: SqlitePool,
}

impl NoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new note; the store assigns the id.
    pub async fn insert(
        &self,
        content: &str,
        reminder_time: Option<DateTime<Utc>>,
    ) -> Result<Note> {
        let now = Utc::now();

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (content, created_at, updated_at, reminder_time)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(content)
        .bind(now)
        .bind(now)
        .bind(reminder_time)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created note: {}", note.id);
        Ok(note)
    }

    /// Point lookup; absent rather than erroring when missing.
    pub async fn get(&self, id: i64) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(note)
    }

    /// Replace content and reminder, bumping `updated_at`.
    /// `created_at` is left untouched.
    pub async fn update(
        &self,
        id: i64,
        content: &str,
        reminder_time: Option<DateTime<Utc>>,
    ) -> Result<Note> {
        let now = Utc::now();

        let rows = sqlx::query(
            r#"
            UPDATE notes SET content = ?, reminder_time = ?, updated_at = ? WHERE id = ?
            "#,
        )
        .bind(content)
        .bind(reminder_time)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(id));
        }

        tracing::debug!("Updated note: {}", id);

        self.get(id).await?.ok_or(AppError::NotFound(id))
    }

    /// Delete a note.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(id));
        }

        tracing::debug!("Deleted note: {}", id);
        Ok(())
    }

    /// All notes, most recently updated first.
    pub async fn list_by_updated(&self) -> Result<Vec<Note>> {
        let notes =
            sqlx::query_as::<_, Note>("SELECT * FROM notes ORDER BY updated_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(notes)
    }

    /// Notes carrying a reminder, earliest reminder first.
    pub async fn list_with_reminder(&self) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT * FROM notes
            WHERE reminder_time IS NOT NULL
            ORDER BY reminder_time ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }
}
