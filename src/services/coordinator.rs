//! Reminder coordinator
//!
//! Glue between note edits and the reminder machinery. On every save it
//! diffs the prior and new reminder state and drives the scheduler and
//! dispatcher so both stay consistent with the store; on delete it tears
//! the reminder down before the note row goes away.

use crate::alarm::ArmMode;
use crate::database::Note;
use crate::error::{AppError, Result};
use crate::notify::NotificationDispatcher;
use crate::services::notes::NoteStore;
use crate::services::scheduler::ReminderScheduler;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Edit-surface input for a note save.
#[derive(Debug, Clone)]
pub struct NoteDraft {
    id: Option<i64>,
    pub content: String,
    reminder: Option<DateTime<Utc>>,
}

impl NoteDraft {
    /// Draft for a new note.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            reminder: None,
        }
    }

    /// Draft editing an existing note, seeded from its current state.
    pub fn edit_of(note: &Note) -> Self {
        Self {
            id: Some(note.id),
            content: note.content.clone(),
            reminder: note.reminder_time,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn reminder(&self) -> Option<DateTime<Utc>> {
        self.reminder
    }

    /// Attach a reminder. A timestamp not strictly in the future is
    /// rejected and the draft keeps its previous reminder, so the caller
    /// can prompt again.
    pub fn pick_reminder(&mut self, at: DateTime<Utc>) -> Result<()> {
        if at <= Utc::now() {
            return Err(AppError::Validation(
                "reminder time must be in the future".to_string(),
            ));
        }
        self.reminder = Some(at);
        Ok(())
    }

    /// Remove the reminder from the draft.
    pub fn clear_reminder(&mut self) {
        self.reminder = None;
    }
}

/// How the reminder of a saved note ended up armed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleStatus {
    /// The note carries no reminder.
    NotRequested,
    /// Armed as an exact wake.
    Armed,
    /// Armed best-effort; the exact-wake capability is unavailable.
    ArmedInexact,
    /// The timer facility rejected the request. The note is persisted
    /// with its reminder and can be re-armed on the next startup.
    Failed { reason: String },
}

/// Result of a successful save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub note: Note,
    pub scheduling: ScheduleStatus,
}

/// Coordinates note mutations with reminder scheduling and alert state.
pub struct ReminderCoordinator {
    store: Arc<NoteStore>,
    scheduler: Arc<ReminderScheduler>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl ReminderCoordinator {
    pub fn new(
        store: Arc<NoteStore>,
        scheduler: Arc<ReminderScheduler>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            scheduler,
            dispatcher,
        }
    }

    /// Save a draft: validate, persist, tear down the superseded
    /// reminder, arm the new one. A reminder in the past fails the whole
    /// save before anything is persisted.
    pub async fn save(&self, draft: NoteDraft) -> Result<SaveOutcome> {
        if draft.content.trim().is_empty() {
            return Err(AppError::Validation(
                "note content must not be empty".to_string(),
            ));
        }

        // The draft's reminder was validated at pick time, but it may
        // have slipped into the past while the edit sat open.
        if let Some(at) = draft.reminder {
            if at <= Utc::now() {
                return Err(AppError::Validation(
                    "reminder time must be in the future".to_string(),
                ));
            }
        }

        let prior_reminder = match draft.id {
            Some(id) => self
                .store
                .get(id)
                .await?
                .ok_or(AppError::NotFound(id))?
                .reminder_time,
            None => None,
        };

        let note = match draft.id {
            Some(id) => self.store.update(id, &draft.content, draft.reminder).await?,
            None => self.store.create(&draft.content, draft.reminder).await?,
        };

        if prior_reminder.is_some() {
            self.scheduler.cancel(note.id).await;
            // The prior reminder may have already fired and still be on
            // screen.
            self.dispatcher.cancel_visible(note.id).await;
        }

        let scheduling = match note.reminder_time {
            None => ScheduleStatus::NotRequested,
            Some(at) => match self.scheduler.schedule(note.id, at, &note.content).await {
                Ok(ArmMode::Exact) => ScheduleStatus::Armed,
                Ok(ArmMode::Inexact) => ScheduleStatus::ArmedInexact,
                Err(e) => {
                    tracing::error!("Failed to arm reminder for note {}: {}", note.id, e);
                    ScheduleStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            },
        };

        Ok(SaveOutcome { note, scheduling })
    }

    /// Delete a note. Its reminder and any visible alert are torn down
    /// first, so no wake can fire referencing the deleted note.
    pub async fn remove(&self, id: i64) -> Result<()> {
        let note = self.store.get(id).await?.ok_or(AppError::NotFound(id))?;

        if note.reminder_time.is_some() {
            self.scheduler.cancel(id).await;
            self.dispatcher.cancel_visible(id).await;
        }

        self.store.delete(id).await
    }
}
