//! Reminder scheduler
//!
//! Maps note ids to one-shot wake timers and enforces at-most-one
//! pending registration per note. The payload shown at fire time is
//! captured here at schedule time; the wake path never re-reads the
//! note, so an edit between scheduling and firing is not reflected in
//! the delivered alert.

use crate::alarm::{AlarmTimer, ArmMode, WakeHandler};
use crate::error::{AppError, Result};
use crate::notify::NotificationDispatcher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Payload crossing the timer boundary as opaque JSON. Self-contained:
/// the fire-time path uses only this value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakePayload {
    pub key: i64,
    pub token: Uuid,
    pub body: String,
}

/// A pending reminder registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub token: Uuid,
    pub fire_at: DateTime<Utc>,
    pub payload: String,
}

type RegistrationTable = Arc<Mutex<HashMap<i64, Registration>>>;

/// Per-note one-shot reminder scheduling.
pub struct ReminderScheduler {
    timer: AlarmTimer,
    table: RegistrationTable,
}

impl ReminderScheduler {
    /// Create the scheduler. Fired wakes deliver through `dispatcher`;
    /// `exact` reflects the probed exact-wake capability.
    pub async fn new(
        dispatcher: Arc<NotificationDispatcher>,
        exact: bool,
        poll_interval: Duration,
    ) -> Result<Self> {
        let table: RegistrationTable = Arc::new(Mutex::new(HashMap::new()));
        let handler = wake_handler(Arc::clone(&table), dispatcher);
        let timer = AlarmTimer::new(exact, poll_interval, handler).await?;

        Ok(Self { timer, table })
    }

    /// Register a reminder for a note, superseding any registration the
    /// note already has. Fails with a validation error when `fire_at` is
    /// not in the future. Returns how the wake was armed; `Inexact` is
    /// the degraded-capability warning, not a failure.
    pub async fn schedule(
        &self,
        note_id: i64,
        fire_at: DateTime<Utc>,
        payload: &str,
    ) -> Result<ArmMode> {
        if fire_at <= Utc::now() {
            return Err(AppError::Validation(
                "reminder time must be in the future".to_string(),
            ));
        }

        let token = Uuid::new_v4();
        let wire = serde_json::to_string(&WakePayload {
            key: note_id,
            token,
            body: payload.to_string(),
        })?;

        // The table lock is held across the arm so a concurrent
        // reschedule of the same note cannot leave two registrations.
        let mut table = self.table.lock().await;
        table.remove(&note_id);

        let mode = self.timer.arm(note_id, fire_at, wire).await?;
        table.insert(
            note_id,
            Registration {
                token,
                fire_at,
                payload: payload.to_string(),
            },
        );

        match mode {
            ArmMode::Exact => {
                tracing::info!("Reminder for note {} armed at {}", note_id, fire_at);
            }
            ArmMode::Inexact => {
                tracing::warn!(
                    "Exact wake unavailable, reminder for note {} armed best-effort at {}",
                    note_id,
                    fire_at
                );
            }
        }

        Ok(mode)
    }

    /// Cancel the registration for a note if one exists; no-op otherwise.
    pub async fn cancel(&self, note_id: i64) {
        let mut table = self.table.lock().await;
        if table.remove(&note_id).is_some() {
            if let Err(e) = self.timer.disarm(note_id).await {
                tracing::error!("Failed to disarm wake for note {}: {}", note_id, e);
            }
            tracing::info!("Reminder for note {} cancelled", note_id);
        }
    }

    /// The pending registration for a note, if any.
    pub async fn registration(&self, note_id: i64) -> Option<Registration> {
        self.table.lock().await.get(&note_id).cloned()
    }

    /// Ids of all notes with a pending registration.
    pub async fn pending(&self) -> Vec<i64> {
        self.table.lock().await.keys().copied().collect()
    }
}

/// Build the fire-time callback. It is a function of the table and
/// dispatcher handles captured here plus the fired payload; it never
/// reads the note store.
fn wake_handler(table: RegistrationTable, dispatcher: Arc<NotificationDispatcher>) -> WakeHandler {
    Arc::new(move |key, wire| {
        let table = Arc::clone(&table);
        let dispatcher = Arc::clone(&dispatcher);
        Box::pin(async move {
            let payload: WakePayload = match serde_json::from_str(&wire) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("Malformed wake payload for key {}: {}", key, e);
                    return;
                }
            };

            // One-shot: the registration dies with the fire, unless a
            // newer registration superseded this wake mid-flight.
            {
                let mut table = table.lock().await;
                match table.get(&key) {
                    Some(registration) if registration.token == payload.token => {
                        table.remove(&key);
                    }
                    _ => {
                        tracing::debug!("Wake for superseded registration on note {}", key);
                        return;
                    }
                }
            }

            if let Err(e) = dispatcher.deliver(key, &payload.body).await {
                tracing::error!("Failed to deliver reminder for note {}: {}", key, e);
            }
        })
    })
}
