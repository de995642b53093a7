//! Notification module
//!
//! User-visible alert delivery for fired reminders: the process-wide
//! notification channel, the alert sink boundary, and the dispatcher
//! with keyed replace/withdraw semantics.

pub mod channel;
pub mod dispatcher;

pub use channel::{init_channel, NotificationChannel};
pub use dispatcher::{Alert, AlertSink, MemoryAlertSink, NotificationDispatcher, TracingAlertSink};
