//! Application state and initialization
//!
//! All services are constructed here and made available through `App`.
//! Startup also reconciles stored reminders against the (empty) timer
//! state left behind by the previous process.

use crate::config::REMINDER_POLL_INTERVAL;
use crate::database::{create_pool, NoteRepository};
use crate::error::Result;
use crate::notify::{init_channel, AlertSink, NotificationDispatcher, TracingAlertSink};
use crate::platform::Capabilities;
use crate::services::{CalendarFilterView, NoteStore, ReminderCoordinator, ReminderScheduler};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Startup configuration.
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Probed at startup when not supplied.
    pub capabilities: Option<Capabilities>,
    /// Sweep interval for the best-effort wake fallback.
    pub poll_interval: Duration,
    /// Alert rendering boundary; defaults to the process log.
    pub alert_sink: Option<Arc<dyn AlertSink>>,
}

impl AppConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            capabilities: None,
            poll_interval: REMINDER_POLL_INTERVAL,
            alert_sink: None,
        }
    }
}

/// Central application state holding all services.
pub struct App {
    pub store: Arc<NoteStore>,
    pub scheduler: Arc<ReminderScheduler>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub coordinator: ReminderCoordinator,
    pub calendar: CalendarFilterView,
    pub capabilities: Capabilities,
}

impl App {
    /// Initialize the application: notification channel, capability
    /// probe, database pool, services, and the reminder reconciliation
    /// pass.
    pub async fn init(config: AppConfig) -> Result<Self> {
        tracing::info!("Initializing application");

        init_channel();

        let capabilities = config.capabilities.unwrap_or_else(Capabilities::probe);

        let pool = create_pool(&config.db_path).await?;
        let store = Arc::new(NoteStore::new(NoteRepository::new(pool)).await?);

        let sink = config
            .alert_sink
            .unwrap_or_else(|| Arc::new(TracingAlertSink));
        let dispatcher = Arc::new(NotificationDispatcher::new(sink, capabilities.alerts));

        let scheduler = Arc::new(
            ReminderScheduler::new(
                Arc::clone(&dispatcher),
                capabilities.exact_wake,
                config.poll_interval,
            )
            .await?,
        );

        let coordinator = ReminderCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&scheduler),
            Arc::clone(&dispatcher),
        );
        let calendar = CalendarFilterView::new(Arc::clone(&store));

        let app = Self {
            store,
            scheduler,
            dispatcher,
            coordinator,
            calendar,
            capabilities,
        };

        let armed = app.rearm_pending().await?;
        tracing::info!("Application initialized, {} stored reminders re-armed", armed);

        Ok(app)
    }

    /// Reconcile stored reminders against live registrations: every note
    /// whose reminder is still in the future gets its wake re-armed.
    /// Past-due reminders are left unarmed; a failed arm on one note
    /// does not abort the rest.
    pub async fn rearm_pending(&self) -> Result<usize> {
        let notes = self.store.query_with_reminder().snapshot();
        let now = Utc::now();
        let mut armed = 0;

        for note in notes {
            let Some(fire_at) = note.reminder_time else {
                continue;
            };

            if fire_at <= now {
                tracing::debug!("Skipping past-due reminder for note {}", note.id);
                continue;
            }

            match self
                .scheduler
                .schedule(note.id, fire_at, &note.content)
                .await
            {
                Ok(_) => armed += 1,
                Err(e) => {
                    tracing::error!("Failed to re-arm reminder for note {}: {}", note.id, e);
                }
            }
        }

        Ok(armed)
    }
}
