//! Note store
//!
//! Durable keyed storage of notes with point lookups and two live
//! queries. Every successful mutation republishes a fresh snapshot of
//! both queries. Mutations are serialized per note id; edits of
//! different notes proceed concurrently.

use crate::database::{Note, NoteRepository};
use crate::error::{AppError, Result};
use crate::services::live::LiveQuery;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Durable note storage with live queries.
pub struct NoteStore {
    repo: NoteRepository,
    all_notes: watch::Sender<Vec<Note>>,
    reminder_notes: watch::Sender<Vec<Note>>,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl NoteStore {
    /// Open the store over an initialized repository and publish the
    /// initial snapshots.
    pub async fn new(repo: NoteRepository) -> Result<Self> {
        let all = repo.list_by_updated().await?;
        let with_reminder = repo.list_with_reminder().await?;

        let (all_notes, _) = watch::channel(all);
        let (reminder_notes, _) = watch::channel(with_reminder);

        Ok(Self {
            repo,
            all_notes,
            reminder_notes,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Create a new note. Fails with a validation error when the content
    /// is empty after trimming; no id is allocated in that case.
    pub async fn create(
        &self,
        content: &str,
        reminder_time: Option<DateTime<Utc>>,
    ) -> Result<Note> {
        let content = validated_content(content)?;

        let note = self.repo.insert(content, reminder_time).await?;
        self.publish().await?;

        tracing::info!("Note created: {}", note.id);
        Ok(note)
    }

    /// Replace a note's content and reminder. `updated_at` is bumped,
    /// `created_at` stays untouched.
    pub async fn update(
        &self,
        id: i64,
        content: &str,
        reminder_time: Option<DateTime<Utc>>,
    ) -> Result<Note> {
        let content = validated_content(content)?;

        let lock = self.note_lock(id).await;
        let _guard = lock.lock().await;

        let note = self.repo.update(id, content, reminder_time).await?;
        self.publish().await?;

        tracing::debug!("Note updated: {}", id);
        Ok(note)
    }

    /// Delete a note.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let lock = self.note_lock(id).await;
        let _guard = lock.lock().await;

        self.repo.delete(id).await?;
        self.locks.lock().await.remove(&id);
        self.publish().await?;

        tracing::info!("Note deleted: {}", id);
        Ok(())
    }

    /// Point lookup; absent rather than erroring when missing.
    pub async fn get(&self, id: i64) -> Result<Option<Note>> {
        self.repo.get(id).await
    }

    /// Live query over all notes, ordered by `updated_at` descending.
    pub fn query_all(&self) -> LiveQuery<Vec<Note>> {
        LiveQuery::new(self.all_notes.subscribe())
    }

    /// Live query over notes carrying a reminder, ordered by
    /// `reminder_time` ascending.
    pub fn query_with_reminder(&self) -> LiveQuery<Vec<Note>> {
        LiveQuery::new(self.reminder_notes.subscribe())
    }

    /// Re-run both queries and publish fresh snapshots. Both reads
    /// happen before either send, so a read failure emits nothing
    /// rather than a stale or false-empty snapshot.
    async fn publish(&self) -> Result<()> {
        let all = self.repo.list_by_updated().await?;
        let with_reminder = self.repo.list_with_reminder().await?;

        self.all_notes.send_replace(all);
        self.reminder_notes.send_replace(with_reminder);

        Ok(())
    }

    async fn note_lock(&self, id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id).or_default())
    }
}

fn validated_content(content: &str) -> Result<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "note content must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_store() -> NoteStore {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        NoteStore::new(NoteRepository::new(pool)).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_round_trip() {
        let store = create_test_store().await;

        let note = store.create("Buy milk", None).await.unwrap();
        let fetched = store.get(note.id).await.unwrap().unwrap();

        assert_eq!(fetched.content, "Buy milk");
        assert!(fetched.reminder_time.is_none());
    }

    #[tokio::test]
    async fn test_whitespace_content_rejected_without_id_allocation() {
        let store = create_test_store().await;

        let result = store.create("   ", None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        // Nothing was persisted and no snapshot was published.
        assert!(store.query_all().snapshot().is_empty());

        // The next id is still the first one.
        let note = store.create("real note", None).await.unwrap();
        assert_eq!(note.id, 1);
    }

    #[tokio::test]
    async fn test_content_is_trimmed_on_save() {
        let store = create_test_store().await;

        let note = store.create("  padded  ", None).await.unwrap();
        assert_eq!(note.content, "padded");
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = create_test_store().await;

        let result = store.update(7, "content", None).await;
        assert!(matches!(result, Err(AppError::NotFound(7))));
    }

    #[tokio::test]
    async fn test_live_query_receives_fresh_snapshots() {
        let store = create_test_store().await;
        let mut all = store.query_all();

        assert!(all.snapshot().is_empty());

        let note = store.create("watch me", None).await.unwrap();
        assert!(all.changed().await);

        let snapshot = all.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, note.id);
    }

    #[tokio::test]
    async fn test_query_all_ordered_by_updated_at_desc() {
        let store = create_test_store().await;

        let first = store.create("first", None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.create("second", None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.update(first.id, "first again", None).await.unwrap();

        let snapshot = store.query_all().snapshot();
        assert_eq!(snapshot[0].id, first.id);
    }

    #[tokio::test]
    async fn test_query_with_reminder_filters_and_orders() {
        let store = create_test_store().await;

        let later = Utc::now() + Duration::hours(2);
        let sooner = Utc::now() + Duration::hours(1);

        store.create("plain", None).await.unwrap();
        let b = store.create("later", Some(later)).await.unwrap();
        let a = store.create("sooner", Some(sooner)).await.unwrap();

        let snapshot = store.query_with_reminder().snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, a.id);
        assert_eq!(snapshot[1].id, b.id);
    }

    #[tokio::test]
    async fn test_delete_updates_reminder_query() {
        let store = create_test_store().await;

        let note = store
            .create("with reminder", Some(Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(store.query_with_reminder().snapshot().len(), 1);

        store.delete(note.id).await.unwrap();
        assert!(store.query_with_reminder().snapshot().is_empty());
    }
}
