//! Notification dispatcher
//!
//! Shows and withdraws the user-visible alert for a note id. A second
//! deliver for the same id replaces the visible alert rather than
//! stacking a duplicate. Depends only on its constructor parameters, so
//! it can be rebuilt inside a fire-time context with no other live
//! application state.

use crate::config::{ALERT_PREVIEW_LEN, ALERT_TITLE};
use crate::error::Result;
use crate::notify::channel::{init_channel, NotificationChannel};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// A user-visible alert. Collapsed presentations use `preview`, expanded
/// ones the full `body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub preview: String,
    pub body: String,
}

impl Alert {
    fn for_note(content: &str) -> Self {
        Self {
            title: ALERT_TITLE.to_string(),
            preview: content.chars().take(ALERT_PREVIEW_LEN).collect(),
            body: content.to_string(),
        }
    }
}

/// Platform boundary that renders alerts.
pub trait AlertSink: Send + Sync {
    fn show(&self, key: i64, alert: &Alert) -> Result<()>;
    fn withdraw(&self, key: i64);
}

/// Sink that writes alerts to the process log. Stands in wherever no
/// desktop notification surface is attached.
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn show(&self, key: i64, alert: &Alert) -> Result<()> {
        tracing::info!("Alert [{}]: {} - {}", key, alert.title, alert.preview);
        Ok(())
    }

    fn withdraw(&self, key: i64) {
        tracing::debug!("Alert [{}] withdrawn", key);
    }
}

/// In-memory sink recording shown alerts, for tests and headless
/// consumers that poll instead of render.
#[derive(Default)]
pub struct MemoryAlertSink {
    shown: std::sync::Mutex<HashMap<i64, Alert>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible(&self, key: i64) -> Option<Alert> {
        self.shown.lock().ok()?.get(&key).cloned()
    }

    pub fn count(&self) -> usize {
        self.shown.lock().map(|shown| shown.len()).unwrap_or(0)
    }
}

impl AlertSink for MemoryAlertSink {
    fn show(&self, key: i64, alert: &Alert) -> Result<()> {
        if let Ok(mut shown) = self.shown.lock() {
            shown.insert(key, alert.clone());
        }
        Ok(())
    }

    fn withdraw(&self, key: i64) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.remove(&key);
        }
    }
}

/// Dispatches reminder alerts keyed by note id.
pub struct NotificationDispatcher {
    channel: &'static NotificationChannel,
    sink: Arc<dyn AlertSink>,
    alerts_allowed: bool,
    visible: Mutex<HashMap<i64, Alert>>,
    tap_tx: mpsc::UnboundedSender<i64>,
    tap_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<i64>>>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn AlertSink>, alerts_allowed: bool) -> Self {
        // Re-establishes the channel when constructed from a fire-time
        // context that never ran the normal startup path.
        let channel = init_channel();
        let (tap_tx, tap_rx) = mpsc::unbounded_channel();

        Self {
            channel,
            sink,
            alerts_allowed,
            visible: Mutex::new(HashMap::new()),
            tap_tx,
            tap_rx: std::sync::Mutex::new(Some(tap_rx)),
        }
    }

    /// The channel alerts are posted on.
    pub fn channel(&self) -> &'static NotificationChannel {
        self.channel
    }

    /// Show the alert for a note, replacing any alert already visible
    /// under the same id.
    pub async fn deliver(&self, note_id: i64, content: &str) -> Result<()> {
        if !self.alerts_allowed {
            tracing::warn!("Alert capability denied, dropping alert for note {}", note_id);
            return Ok(());
        }

        let alert = Alert::for_note(content);
        self.sink.show(note_id, &alert)?;
        self.visible.lock().await.insert(note_id, alert);

        tracing::info!("Alert delivered for note {}", note_id);
        Ok(())
    }

    /// Withdraw the alert for a note if one is visible; no-op otherwise.
    pub async fn cancel_visible(&self, note_id: i64) {
        if self.visible.lock().await.remove(&note_id).is_some() {
            self.sink.withdraw(note_id);
            tracing::debug!("Alert withdrawn for note {}", note_id);
        }
    }

    /// Currently visible alert for a note, if any.
    pub async fn visible(&self, note_id: i64) -> Option<Alert> {
        self.visible.lock().await.get(&note_id).cloned()
    }

    /// Report a tap on the alert for `note_id`. The alert dismisses and
    /// a navigation signal is emitted for the consumer to route.
    pub async fn alert_tapped(&self, note_id: i64) {
        if self.visible.lock().await.remove(&note_id).is_some() {
            self.sink.withdraw(note_id);
        }
        let _ = self.tap_tx.send(note_id);
    }

    /// Take the navigation signal stream. Yields the note id for every
    /// tapped alert; can be taken once.
    pub fn taps(&self) -> Option<mpsc::UnboundedReceiver<i64>> {
        self.tap_rx.lock().ok()?.take()
    }
}
