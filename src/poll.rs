//! Bounded polling for roadmap availability.
//!
//! After a webhook submission the external automation writes task rows out of
//! band; the only way to learn they exist is to keep asking. The poller
//! queries at a fixed interval until rows appear, a fetch fails, or the
//! attempt budget runs out. Attempts are strictly sequential: attempt N+1 is
//! never issued before attempt N's fetch has resolved.
//!
//! Every session carries a [`CancelHandle`]. Cancelling clears the pending
//! timer; it does not abort an in-flight request, whose result is simply
//! discarded. The [`PollRegistry`] keeps at most one live session per user.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::store::{RoadmapStore, StoreError};
use crate::types::Roadmap;

/// Timing and budget constants for one poll session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between attempts in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Attempt budget before the session times out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first attempt when the planner has not yet
    /// confirmed completion, in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    8_000
}

fn default_max_attempts() -> u32 {
    75
}

fn default_initial_delay_ms() -> u64 {
    10_000
}

/// Progress report for one poll attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollProgress {
    pub attempt: u32,
    pub max_attempts: u32,
}

impl fmt::Display for PollProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fetching your roadmap data... ({}/{})",
            self.attempt, self.max_attempts
        )
    }
}

/// Callback invoked before each attempt.
pub type ProgressFn = Arc<dyn Fn(&PollProgress) + Send + Sync>;

/// Error types for a poll session.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Attempt budget exhausted with no data
    #[error("Timeout: Could not fetch roadmap data after {attempts} attempts. Please try again or contact support.")]
    Timeout { attempts: u32 },

    /// A fetch failed; only "no rows yet" is retried
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session was cancelled
    #[error("Polling cancelled")]
    Cancelled,
}

/// Cancellation token for one poll session.
#[derive(Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the session this handle belongs to.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once the handle is cancelled.
    async fn wait(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }

    fn same_as(&self, other: &CancelHandle) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// A running poll session.
pub struct PollHandle {
    cancel: CancelHandle,
    join: JoinHandle<Result<Roadmap, PollError>>,
}

impl PollHandle {
    /// Cancel the session, clearing its pending timer.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A detached handle that can cancel this session later.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the session's terminal outcome.
    pub async fn outcome(self) -> Result<Roadmap, PollError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Poll task ended abnormally");
                Err(PollError::Cancelled)
            }
        }
    }
}

/// Start a poll session outside of any registry.
pub fn spawn_poll(
    store: Arc<dyn RoadmapStore>,
    user_id: impl Into<String>,
    config: PollConfig,
    initial_delay: Option<Duration>,
    on_progress: Option<ProgressFn>,
) -> PollHandle {
    let cancel = CancelHandle::new();
    let join = tokio::spawn(run_poll(
        store,
        user_id.into(),
        config,
        initial_delay,
        on_progress,
        cancel.clone(),
    ));
    PollHandle { cancel, join }
}

/// Tracks the live poll session per user.
///
/// Starting a session for a user that already has one cancels the old session
/// first, so overlapping generations can never race each other's timers.
#[derive(Default)]
pub struct PollRegistry {
    sessions: Arc<DashMap<String, CancelHandle>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `user_id`, replacing any session already running.
    pub fn begin(
        &self,
        store: Arc<dyn RoadmapStore>,
        user_id: impl Into<String>,
        config: PollConfig,
        initial_delay: Option<Duration>,
        on_progress: Option<ProgressFn>,
    ) -> PollHandle {
        let user_id = user_id.into();
        let cancel = CancelHandle::new();

        if let Some(previous) = self.sessions.insert(user_id.clone(), cancel.clone()) {
            warn!(user_id = %user_id, "Cancelling previous poll session for user");
            previous.cancel();
        }

        let sessions = Arc::clone(&self.sessions);
        let task_cancel = cancel.clone();
        let task_user_id = user_id.clone();

        let join = tokio::spawn(async move {
            let result = run_poll(
                store,
                task_user_id.clone(),
                config,
                initial_delay,
                on_progress,
                task_cancel.clone(),
            )
            .await;

            // Deregister, unless a newer session already took the slot.
            sessions.remove_if(&task_user_id, |_, active| active.same_as(&task_cancel));
            result
        });

        PollHandle { cancel, join }
    }

    /// Cancel the live session for a user, if any.
    pub fn cancel(&self, user_id: &str) -> bool {
        match self.sessions.remove(user_id) {
            Some((_, handle)) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_polling(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

async fn run_poll(
    store: Arc<dyn RoadmapStore>,
    user_id: String,
    config: PollConfig,
    initial_delay: Option<Duration>,
    on_progress: Option<ProgressFn>,
    cancel: CancelHandle,
) -> Result<Roadmap, PollError> {
    if let Some(delay) = initial_delay {
        debug!(user_id = %user_id, delay_ms = delay.as_millis() as u64, "Waiting before first poll attempt");
        tokio::select! {
            _ = sleep(delay) => {}
            _ = cancel.wait() => return Err(PollError::Cancelled),
        }
    }

    let max_attempts = config.max_attempts;
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }

        attempt += 1;
        debug!(user_id = %user_id, attempt, max_attempts, "Polling for roadmap data");
        if let Some(on_progress) = &on_progress {
            on_progress(&PollProgress {
                attempt,
                max_attempts,
            });
        }

        let fetched = store.fetch_roadmap(&user_id).await;

        // A result arriving after cancellation is discarded.
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }

        match fetched {
            Ok(Some(roadmap)) if !roadmap.tasks.is_empty() => {
                info!(user_id = %user_id, tasks = roadmap.tasks.len(), "Roadmap data found");
                return Ok(roadmap);
            }
            Ok(_) => {
                if attempt >= max_attempts {
                    warn!(user_id = %user_id, attempts = attempt, "Poll budget exhausted");
                    return Err(PollError::Timeout { attempts: attempt });
                }
            }
            // Only "no rows yet" is retried; a failed fetch ends the session.
            Err(e) => return Err(PollError::Store(e)),
        }

        tokio::select! {
            _ = sleep(config.interval()) => {}
            _ = cancel.wait() => return Err(PollError::Cancelled),
        }
    }
}
