//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization across the consumer surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A free-text note, optionally carrying a one-shot reminder.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Note {
    /// Assigned by the store on creation, stable for the note's lifetime.
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// None when the note has no reminder attached.
    pub reminder_time: Option<DateTime<Utc>>,
}
