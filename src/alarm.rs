//! One-shot alarm timers
//!
//! The timer boundary: arms keyed one-shot wake callbacks for an exact
//! instant via tokio-cron-scheduler, or falls back to a periodic sweep
//! when the exact-wake capability is unavailable. The wake handler is
//! fixed at construction and receives only the key and the payload
//! captured at arm time; it must not reach for any other live state.

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

pub type WakeFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callback invoked when a wake fires, with the key and the opaque
/// payload captured at arm time.
pub type WakeHandler = Arc<dyn Fn(i64, String) -> WakeFuture + Send + Sync>;

/// How a wake was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    /// Armed as an exact-time one-shot job.
    Exact,
    /// Armed in the best-effort sweep; fires at the first sweep tick at
    /// or after the requested instant.
    Inexact,
}

struct DueEntry {
    fire_at: DateTime<Utc>,
    payload: String,
}

enum Backend {
    Exact {
        scheduler: Arc<RwLock<JobScheduler>>,
        jobs: Arc<Mutex<HashMap<i64, Uuid>>>,
    },
    Polling {
        due: Arc<Mutex<HashMap<i64, DueEntry>>>,
    },
}

/// Keyed one-shot wake timers.
pub struct AlarmTimer {
    backend: Backend,
    handler: WakeHandler,
}

impl AlarmTimer {
    /// Create the timer. When `exact` is false, or the exact scheduler
    /// cannot be brought up, wakes degrade to the polling sweep.
    pub async fn new(
        exact: bool,
        poll_interval: Duration,
        handler: WakeHandler,
    ) -> Result<Self> {
        let backend = if exact {
            match Self::start_exact_scheduler().await {
                Ok(scheduler) => Backend::Exact {
                    scheduler,
                    jobs: Arc::new(Mutex::new(HashMap::new())),
                },
                Err(e) => {
                    tracing::warn!("Exact wake scheduler unavailable ({}), using polling sweep", e);
                    Self::start_polling_sweep(poll_interval, Arc::clone(&handler))
                }
            }
        } else {
            Self::start_polling_sweep(poll_interval, Arc::clone(&handler))
        };

        Ok(Self { backend, handler })
    }

    async fn start_exact_scheduler() -> Result<Arc<RwLock<JobScheduler>>> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduling(format!("Failed to create scheduler: {}", e)))?;

        scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduling(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Exact wake scheduler started");
        Ok(Arc::new(RwLock::new(scheduler)))
    }

    fn start_polling_sweep(poll_interval: Duration, handler: WakeHandler) -> Backend {
        let due: Arc<Mutex<HashMap<i64, DueEntry>>> = Arc::new(Mutex::new(HashMap::new()));

        let sweep = Arc::clone(&due);
        tokio::spawn(async move {
            tracing::info!("Best-effort wake sweep started ({:?} interval)", poll_interval);

            let mut interval = tokio::time::interval(poll_interval);

            loop {
                interval.tick().await;

                let now = Utc::now();
                let fired: Vec<(i64, String)> = {
                    let mut due = sweep.lock().await;
                    let keys: Vec<i64> = due
                        .iter()
                        .filter(|(_, entry)| entry.fire_at <= now)
                        .map(|(key, _)| *key)
                        .collect();
                    keys.into_iter()
                        .filter_map(|key| due.remove(&key).map(|entry| (key, entry.payload)))
                        .collect()
                };

                for (key, payload) in fired {
                    tracing::debug!("Sweep firing wake for key {}", key);
                    handler(key, payload).await;
                }
            }
        });

        Backend::Polling { due }
    }

    /// Arm a wake for `key` at `fire_at`, replacing any wake already
    /// armed for the same key.
    pub async fn arm(&self, key: i64, fire_at: DateTime<Utc>, payload: String) -> Result<ArmMode> {
        match &self.backend {
            Backend::Exact { scheduler, jobs } => {
                let mut jobs_guard = jobs.lock().await;

                if let Some(old) = jobs_guard.remove(&key) {
                    let scheduler = scheduler.write().await;
                    if let Err(e) = scheduler.remove(&old).await {
                        tracing::warn!("Failed to remove superseded job for key {}: {}", key, e);
                    }
                }

                let delay = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                let handler = Arc::clone(&self.handler);
                let jobs_for_fire = Arc::clone(jobs);

                let job = Job::new_one_shot_async(delay, move |uuid, _l| {
                    let handler = Arc::clone(&handler);
                    let jobs = Arc::clone(&jobs_for_fire);
                    let payload = payload.clone();
                    Box::pin(async move {
                        // One-shot: retire this job's map entry unless a
                        // newer job already took the key.
                        {
                            let mut jobs = jobs.lock().await;
                            if jobs.get(&key) == Some(&uuid) {
                                jobs.remove(&key);
                            }
                        }
                        handler(key, payload).await;
                    })
                })
                .map_err(|e| AppError::Scheduling(format!("Failed to create wake job: {}", e)))?;

                let job_id = job.guid();

                let scheduler = scheduler.write().await;
                scheduler
                    .add(job)
                    .await
                    .map_err(|e| AppError::Scheduling(format!("Failed to schedule wake: {}", e)))?;

                jobs_guard.insert(key, job_id);

                tracing::debug!("Armed exact wake for key {} at {}", key, fire_at);
                Ok(ArmMode::Exact)
            }
            Backend::Polling { due } => {
                due.lock()
                    .await
                    .insert(key, DueEntry { fire_at, payload });

                tracing::debug!("Armed best-effort wake for key {} at {}", key, fire_at);
                Ok(ArmMode::Inexact)
            }
        }
    }

    /// Disarm the wake for `key` if one is armed; no-op otherwise.
    pub async fn disarm(&self, key: i64) -> Result<()> {
        match &self.backend {
            Backend::Exact { scheduler, jobs } => {
                if let Some(job_id) = jobs.lock().await.remove(&key) {
                    let scheduler = scheduler.write().await;
                    scheduler
                        .remove(&job_id)
                        .await
                        .map_err(|e| AppError::Scheduling(format!("Failed to remove wake: {}", e)))?;

                    tracing::debug!("Disarmed wake for key {}", key);
                }
                Ok(())
            }
            Backend::Polling { due } => {
                due.lock().await.remove(&key);
                Ok(())
            }
        }
    }

    /// Number of currently armed wakes.
    pub async fn armed(&self) -> usize {
        match &self.backend {
            Backend::Exact { jobs, .. } => jobs.lock().await.len(),
            Backend::Polling { due } => due.lock().await.len(),
        }
    }
}
