//! Integration tests for notebell
//!
//! These tests verify end-to-end functionality including:
//! - Note CRUD through the coordinator and live queries
//! - Reminder scheduling, firing, and teardown
//! - Reconciliation of stored reminders across a restart

use chrono::{Duration as ChronoDuration, Utc};
use notebell::app::{App, AppConfig};
use notebell::notify::{AlertSink, MemoryAlertSink};
use notebell::platform::Capabilities;
use notebell::services::{NoteDraft, ScheduleStatus};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notebell=debug,info".into()),
        )
        .try_init();
}

fn test_config(db_path: &Path, sink: Arc<MemoryAlertSink>, exact_wake: bool) -> AppConfig {
    let mut config = AppConfig::new(db_path);
    config.capabilities = Some(Capabilities {
        alerts: true,
        exact_wake,
    });
    config.poll_interval = Duration::from_millis(50);
    config.alert_sink = Some(sink as Arc<dyn AlertSink>);
    config
}

async fn wait_for_alert(sink: &MemoryAlertSink, note_id: i64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.visible(note_id).is_none() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("reminder did not fire in time");
}

#[tokio::test]
async fn test_note_lifecycle_and_live_queries() {
    init_tracing();

    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemoryAlertSink::new());
    let app = App::init(test_config(&temp.path().join("notes.db"), sink, false))
        .await
        .unwrap();

    // Create
    let outcome = app.coordinator.save(NoteDraft::new("Buy milk")).await.unwrap();
    assert_eq!(outcome.scheduling, ScheduleStatus::NotRequested);
    let id = outcome.note.id;

    let fetched = app.store.get(id).await.unwrap().unwrap();
    assert_eq!(fetched.content, "Buy milk");
    assert!(fetched.reminder_time.is_none());

    // Update through an edit draft
    let mut edit = NoteDraft::edit_of(&fetched);
    edit.content = "Buy oat milk".to_string();
    app.coordinator.save(edit).await.unwrap();

    let all = app.store.query_all().snapshot();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].content, "Buy oat milk");

    // Delete
    app.coordinator.remove(id).await.unwrap();
    assert!(app.store.get(id).await.unwrap().is_none());
    assert!(app.store.query_all().snapshot().is_empty());
}

#[tokio::test]
async fn test_reminder_fires_and_navigates() {
    init_tracing();

    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemoryAlertSink::new());
    let app = App::init(test_config(
        &temp.path().join("notes.db"),
        Arc::clone(&sink),
        false,
    ))
    .await
    .unwrap();

    let mut taps = app.dispatcher.taps().unwrap();

    let mut draft = NoteDraft::new("Call mom");
    draft
        .pick_reminder(Utc::now() + ChronoDuration::milliseconds(400))
        .unwrap();

    let outcome = app.coordinator.save(draft).await.unwrap();
    // Without the exact-wake capability the arm degrades, it does not fail.
    assert_eq!(outcome.scheduling, ScheduleStatus::ArmedInexact);
    let id = outcome.note.id;

    wait_for_alert(&sink, id).await;

    let alert = sink.visible(id).unwrap();
    assert_eq!(alert.body, "Call mom");

    // One-shot: the registration died with the fire.
    assert!(app.scheduler.registration(id).await.is_none());

    // Tapping routes the consumer to the note and dismisses the alert.
    app.dispatcher.alert_tapped(id).await;
    assert_eq!(taps.recv().await, Some(id));
    assert!(sink.visible(id).is_none());
}

#[tokio::test]
async fn test_exact_wake_fires() {
    init_tracing();

    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemoryAlertSink::new());
    let app = App::init(test_config(
        &temp.path().join("notes.db"),
        Arc::clone(&sink),
        true,
    ))
    .await
    .unwrap();

    let mut draft = NoteDraft::new("Stand up");
    draft
        .pick_reminder(Utc::now() + ChronoDuration::milliseconds(500))
        .unwrap();

    let outcome = app.coordinator.save(draft).await.unwrap();
    assert_eq!(outcome.scheduling, ScheduleStatus::Armed);

    wait_for_alert(&sink, outcome.note.id).await;
    assert_eq!(sink.visible(outcome.note.id).unwrap().body, "Stand up");
}

#[tokio::test]
async fn test_fired_alert_shows_payload_captured_at_schedule_time() {
    init_tracing();

    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemoryAlertSink::new());
    let app = App::init(test_config(
        &temp.path().join("notes.db"),
        Arc::clone(&sink),
        false,
    ))
    .await
    .unwrap();

    let fire_at = Utc::now() + ChronoDuration::milliseconds(600);
    let mut draft = NoteDraft::new("original wording");
    draft.pick_reminder(fire_at).unwrap();
    let outcome = app.coordinator.save(draft).await.unwrap();
    let id = outcome.note.id;

    // Edit the content behind the scheduler's back; the registration and
    // its captured payload stay as they were.
    app.store
        .update(id, "rewritten wording", Some(fire_at))
        .await
        .unwrap();

    wait_for_alert(&sink, id).await;
    assert_eq!(sink.visible(id).unwrap().body, "original wording");
}

#[tokio::test]
async fn test_restart_rearms_only_future_reminders() {
    init_tracing();

    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("notes.db");

    let future_id;
    let past_id;
    {
        let sink = Arc::new(MemoryAlertSink::new());
        let app = App::init(test_config(&db_path, sink, false)).await.unwrap();

        let mut draft = NoteDraft::new("future meeting");
        draft
            .pick_reminder(Utc::now() + ChronoDuration::hours(1))
            .unwrap();
        future_id = app.coordinator.save(draft).await.unwrap().note.id;

        // A reminder that will be past due by the time the next process
        // starts. It is written through the store so no wake fires for
        // it before shutdown.
        let past = app
            .store
            .create(
                "already over",
                Some(Utc::now() + ChronoDuration::milliseconds(5)),
            )
            .await
            .unwrap();
        past_id = past.id;

        tokio::time::sleep(Duration::from_millis(20)).await;
        // Process ends; in-memory timers die with it.
    }

    let sink = Arc::new(MemoryAlertSink::new());
    let app = App::init(test_config(&db_path, Arc::clone(&sink), false))
        .await
        .unwrap();

    // The future reminder came back, the past-due one stayed unarmed.
    let pending = app.scheduler.pending().await;
    assert_eq!(pending, vec![future_id]);
    assert!(app.scheduler.registration(past_id).await.is_none());

    let registration = app.scheduler.registration(future_id).await.unwrap();
    assert_eq!(registration.payload, "future meeting");

    // Both notes kept their stored reminder either way.
    assert!(app
        .store
        .get(past_id)
        .await
        .unwrap()
        .unwrap()
        .reminder_time
        .is_some());
}

#[tokio::test]
async fn test_delete_after_fire_withdraws_alert() {
    init_tracing();

    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemoryAlertSink::new());
    let app = App::init(test_config(
        &temp.path().join("notes.db"),
        Arc::clone(&sink),
        false,
    ))
    .await
    .unwrap();

    let mut draft = NoteDraft::new("Water plants");
    draft
        .pick_reminder(Utc::now() + ChronoDuration::milliseconds(400))
        .unwrap();
    let id = app.coordinator.save(draft).await.unwrap().note.id;

    wait_for_alert(&sink, id).await;

    app.coordinator.remove(id).await.unwrap();

    assert!(sink.visible(id).is_none());
    assert!(app.store.get(id).await.unwrap().is_none());
    assert!(app.scheduler.pending().await.is_empty());
}

#[tokio::test]
async fn test_calendar_buckets_follow_saves() {
    init_tracing();

    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemoryAlertSink::new());
    let app = App::init(test_config(&temp.path().join("notes.db"), sink, false))
        .await
        .unwrap();

    let mut buckets = app.calendar.day_buckets();
    assert!(buckets.snapshot().is_empty());

    let mut draft = NoteDraft::new("Dentist");
    draft
        .pick_reminder(Utc::now() + ChronoDuration::days(3))
        .unwrap();
    app.coordinator.save(draft).await.unwrap();

    assert!(buckets.changed().await);

    let snapshot = buckets.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].count, 1);
}
