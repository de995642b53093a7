//! Application configuration constants
//!
//! Central location for all configuration constants and validation
//! boundaries used throughout the crate.

use std::time::Duration;

// ===== Notification Settings =====

/// Title used for every reminder alert.
pub const ALERT_TITLE: &str = "Note Reminder";

/// Collapsed alert line is truncated to this many characters.
/// The full note content still travels in the alert body.
pub const ALERT_PREVIEW_LEN: usize = 100;

/// Identifier of the process-wide notification channel.
pub const NOTIFICATION_CHANNEL_ID: &str = "notes_reminder_channel";

/// Human-readable name of the notification channel.
pub const NOTIFICATION_CHANNEL_NAME: &str = "Notes Reminders";

// ===== Scheduling Settings =====

/// Sweep interval for the best-effort reminder fallback, used when the
/// exact-wake capability is unavailable.
pub const REMINDER_POLL_INTERVAL: Duration = Duration::from_secs(60);

// ===== Calendar Settings =====

/// Length of one local calendar day in milliseconds.
pub const DAY_LENGTH_MS: i64 = 86_400_000;

/// Date format for calendar day bucket labels (e.g. "Aug 06, 2026").
pub const DAY_LABEL_FORMAT: &str = "%b %d, %Y";
