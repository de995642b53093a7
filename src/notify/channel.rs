//! Notification channel lifecycle
//!
//! The channel descriptor is process-wide state: initialized once at
//! startup, idempotent to re-initialize, and passed by handle into the
//! dispatcher. Fire-time contexts re-establish it on demand instead of
//! assuming earlier setup ran.

use crate::config::{NOTIFICATION_CHANNEL_ID, NOTIFICATION_CHANNEL_NAME};
use std::sync::OnceLock;

/// Descriptor of the channel reminder alerts are posted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: &'static str,
    pub name: &'static str,
}

static CHANNEL: OnceLock<NotificationChannel> = OnceLock::new();

/// Initialize the process-wide notification channel. Safe to call any
/// number of times; the first call registers, later calls return the
/// same handle.
pub fn init_channel() -> &'static NotificationChannel {
    CHANNEL.get_or_init(|| {
        tracing::info!("Registering notification channel: {}", NOTIFICATION_CHANNEL_ID);
        NotificationChannel {
            id: NOTIFICATION_CHANNEL_ID,
            name: NOTIFICATION_CHANNEL_NAME,
        }
    })
}
