//! Services module
//!
//! Business logic services that coordinate between the consumer surface
//! and the repository, timer, and notification boundaries.

pub mod calendar;
pub mod coordinator;
pub mod live;
pub mod notes;
pub mod scheduler;

pub use calendar::{CalendarFilterView, DayBucket, NoteListFeed};
pub use coordinator::{NoteDraft, ReminderCoordinator, SaveOutcome, ScheduleStatus};
pub use live::LiveQuery;
pub use notes::NoteStore;
pub use scheduler::{Registration, ReminderScheduler, WakePayload};
