//! Calendar filtering
//!
//! Derives the set of local calendar days that hold at least one
//! reminder, and live subsets of notes whose reminder falls within one
//! chosen day. Everything here is derived from the reminder-bearing
//! live query; this module never talks to the scheduler.

use crate::config::{DAY_LABEL_FORMAT, DAY_LENGTH_MS};
use crate::database::Note;
use crate::services::live::LiveQuery;
use crate::services::notes::NoteStore;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A local calendar day holding at least one reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    /// Local midnight opening the day.
    pub day_start: DateTime<Utc>,
    /// Number of reminders falling within the day.
    pub count: usize,
    /// Display label, e.g. "Aug 06, 2026".
    pub label: String,
}

/// Day-bucketed views over the reminder-bearing notes.
#[derive(Clone)]
pub struct CalendarFilterView {
    store: Arc<NoteStore>,
}

impl CalendarFilterView {
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }

    /// Live set of distinct local days with reminders, ascending.
    pub fn day_buckets(&self) -> LiveQuery<Vec<DayBucket>> {
        self.store
            .query_with_reminder()
            .map(|notes| bucket_days(notes))
    }

    /// Live subset of notes whose reminder falls within the day opening
    /// at `day` (local midnight), i.e. `[day, day + 24h)`.
    pub fn notes_on_day(&self, day: DateTime<Utc>) -> LiveQuery<Vec<Note>> {
        let end = day + Duration::milliseconds(DAY_LENGTH_MS);
        self.store.query_with_reminder().map(move |notes| {
            notes
                .iter()
                .filter(|note| {
                    note.reminder_time
                        .is_some_and(|at| at >= day && at < end)
                })
                .cloned()
                .collect()
        })
    }
}

/// Truncate a timestamp to the local midnight opening its day.
pub fn local_midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    let start = at.with_timezone(&Local).date_naive().and_time(NaiveTime::MIN);
    match start.and_local_timezone(Local) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        // Midnight skipped by a DST transition; fall back to the naive
        // instant read as UTC so the bucket stays stable.
        LocalResult::None => Utc.from_utc_datetime(&start),
    }
}

fn bucket_days(notes: &[Note]) -> Vec<DayBucket> {
    let mut days: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();

    for note in notes {
        if let Some(at) = note.reminder_time {
            *days.entry(local_midnight(at)).or_default() += 1;
        }
    }

    days.into_iter()
        .map(|(day_start, count)| DayBucket {
            day_start,
            count,
            label: day_start
                .with_timezone(&Local)
                .format(DAY_LABEL_FORMAT)
                .to_string(),
        })
        .collect()
}

/// Drives one consumer's note list. At most one live subscription is
/// active per feed; selecting a day or clearing the filter supersedes
/// the previous subscription rather than stacking another one.
pub struct NoteListFeed {
    store: Arc<NoteStore>,
    calendar: CalendarFilterView,
    task: Option<JoinHandle<()>>,
}

impl NoteListFeed {
    pub fn new(store: Arc<NoteStore>) -> Self {
        let calendar = CalendarFilterView::new(Arc::clone(&store));
        Self {
            store,
            calendar,
            task: None,
        }
    }

    /// Follow all notes, newest update first.
    pub fn show_all<F, Fut>(&mut self, submit: F)
    where
        F: FnMut(Vec<Note>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let query = self.store.query_all();
        self.replace(query, submit);
    }

    /// Follow only the notes whose reminder falls on the given day.
    pub fn show_day<F, Fut>(&mut self, day: DateTime<Utc>, submit: F)
    where
        F: FnMut(Vec<Note>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let query = self.calendar.notes_on_day(day);
        self.replace(query, submit);
    }

    /// Stop following; the consumer keeps its last submitted list.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn replace<F, Fut>(&mut self, query: LiveQuery<Vec<Note>>, submit: F)
    where
        F: FnMut(Vec<Note>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        self.task = Some(tokio::spawn(query.follow(submit)));
    }
}

impl Drop for NoteListFeed {
    fn drop(&mut self) {
        self.stop();
    }
}
