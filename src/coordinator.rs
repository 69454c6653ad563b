//! Generation workflow coordination.
//!
//! The [`Coordinator`] is the main entry point for a UI layer: it drives a
//! request through submission and polling, caches the resulting roadmap,
//! applies optimistic task toggles, and owns the view-state machine
//! (`Idle → Submitting → Polling → Completed | Error`) that the UI observes
//! to decide what to render and which controls are enabled.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::classify::{classify, ErrorCategory};
use crate::planner::{Planner, PlannerError};
use crate::poll::{PollConfig, PollError, PollProgress, PollRegistry, ProgressFn};
use crate::request::{RoadmapRequest, ValidationError};
use crate::session::{SessionError, SessionState, SessionStore};
use crate::store::{RoadmapStore, StoreError};
use crate::types::{Roadmap, TaskStatus, UserProfile};

/// Phase of the generation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    /// Nothing in flight
    Idle,
    /// Webhook submission in progress
    Submitting,
    /// Waiting for task rows to appear
    Polling,
    /// A roadmap is loaded
    Completed,
    /// The last operation failed
    Error,
}

/// Snapshot of the workflow state, published through a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationStatus {
    pub state: GenerationState,
    /// Human-readable progress or error copy
    pub message: String,
    /// Set while `state` is [`GenerationState::Error`]
    pub error: Option<ErrorCategory>,
}

impl GenerationStatus {
    fn idle() -> Self {
        Self {
            state: GenerationState::Idle,
            message: String::new(),
            error: None,
        }
    }
}

/// Error types for coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// A task operation was requested with no roadmap loaded
    #[error("No roadmap is loaded")]
    NoActiveRoadmap,

    /// A user-scoped operation was requested with no active session
    #[error("No active user session")]
    NoActiveUser,

    /// The record id does not exist in the cached roadmap
    #[error("Unknown task record: {0}")]
    UnknownTask(String),
}

impl CoordinatorError {
    /// User-facing category for this error.
    pub fn category(&self) -> ErrorCategory {
        classify(&self.to_string())
    }
}

/// Drives generation, tracks progress, and mediates task mutations.
pub struct Coordinator {
    planner: Arc<dyn Planner>,
    store: Arc<dyn RoadmapStore>,
    session_store: Arc<dyn SessionStore>,
    poll_config: PollConfig,
    registry: PollRegistry,
    roadmap: RwLock<Option<Roadmap>>,
    profile: RwLock<Option<UserProfile>>,
    session: RwLock<SessionState>,
    status: Arc<watch::Sender<GenerationStatus>>,
}

impl Coordinator {
    /// Create a coordinator over the given backends.
    pub fn new(
        planner: Arc<dyn Planner>,
        store: Arc<dyn RoadmapStore>,
        session_store: Arc<dyn SessionStore>,
        poll_config: PollConfig,
    ) -> Self {
        let (status, _) = watch::channel(GenerationStatus::idle());

        Self {
            planner,
            store,
            session_store,
            poll_config,
            registry: PollRegistry::new(),
            roadmap: RwLock::new(None),
            profile: RwLock::new(None),
            session: RwLock::new(SessionState::default()),
            status: Arc::new(status),
        }
    }

    /// Subscribe to workflow state changes.
    pub fn status(&self) -> watch::Receiver<GenerationStatus> {
        self.status.subscribe()
    }

    /// The latest workflow state snapshot.
    pub fn current_status(&self) -> GenerationStatus {
        self.status.borrow().clone()
    }

    /// Restore persisted session state from the session store.
    pub async fn resume(&self) -> Result<SessionState, CoordinatorError> {
        let state = self.session_store.load()?;
        *self.profile.write().await = state.profile.clone();
        *self.session.write().await = state.clone();

        if state.current_user_id.is_some() {
            debug!("Resumed previous session");
        }
        Ok(state)
    }

    /// Drive one full generation cycle: submit, poll, cache.
    ///
    /// Starting a generation for a user who already has a poll session
    /// running cancels the old session first.
    pub async fn generate(&self, request: RoadmapRequest) -> Result<Roadmap, CoordinatorError> {
        request.validate()?;

        let user_id = request.user_id.clone();
        info!(user_id = %user_id, skill = %request.skill, "Starting roadmap generation");
        self.set_status(
            GenerationState::Submitting,
            "Submitting your request to AI planner...",
            None,
        );

        {
            let mut session = self.session.write().await;
            session.current_user_id = Some(user_id.clone());
            session.form_data = Some(request.clone());
            self.persist_session(&session);
        }

        let receipt = match self.planner.submit(&request).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.fail(e.into())),
        };

        // When the planner has not confirmed completion, give the automation
        // a head start before the first fetch.
        let initial_delay = if receipt.is_completed {
            self.set_status(
                GenerationState::Polling,
                "Planner completed! Fetching your roadmap data...",
                None,
            );
            None
        } else {
            self.set_status(
                GenerationState::Polling,
                "AI is processing your request...",
                None,
            );
            Some(self.poll_config.initial_delay())
        };

        let status = Arc::clone(&self.status);
        let on_progress: ProgressFn = Arc::new(move |progress: &PollProgress| {
            status.send_replace(GenerationStatus {
                state: GenerationState::Polling,
                message: progress.to_string(),
                error: None,
            });
        });

        let handle = self.registry.begin(
            Arc::clone(&self.store),
            user_id.clone(),
            self.poll_config.clone(),
            initial_delay,
            Some(on_progress),
        );

        match handle.outcome().await {
            Ok(roadmap) => {
                *self.roadmap.write().await = Some(roadmap.clone());
                self.adopt_profile(&user_id).await;
                self.set_status(
                    GenerationState::Completed,
                    "Roadmap generated successfully!",
                    None,
                );
                Ok(roadmap)
            }
            // A superseded generation must not clobber its successor's state.
            Err(PollError::Cancelled) => {
                debug!(user_id = %user_id, "Generation cancelled");
                Err(PollError::Cancelled.into())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Cancel the active poll session for the current user, if any.
    pub async fn cancel_generation(&self) -> bool {
        match self.session.read().await.current_user_id.as_deref() {
            Some(user_id) => self.registry.cancel(user_id),
            None => false,
        }
    }

    /// Flip one task's status, optimistically updating the cached roadmap.
    ///
    /// The cache change is reverted if the write-through fails.
    pub async fn toggle_task(&self, record_id: &str) -> Result<TaskStatus, CoordinatorError> {
        let (previous, next) = {
            let mut guard = self.roadmap.write().await;
            let roadmap = guard.as_mut().ok_or(CoordinatorError::NoActiveRoadmap)?;
            let previous = roadmap
                .task_status(record_id)
                .ok_or_else(|| CoordinatorError::UnknownTask(record_id.to_string()))?;
            let next = previous.toggled();
            roadmap.set_task_status(record_id, next);
            (previous, next)
        };

        match self.store.set_task_status(record_id, next).await {
            Ok(()) => {
                debug!(record_id, status = next.as_str(), "Task status updated");
                Ok(next)
            }
            Err(e) => {
                warn!(record_id, error = %e, "Task update failed, reverting");
                let mut guard = self.roadmap.write().await;
                if let Some(roadmap) = guard.as_mut() {
                    roadmap.set_task_status(record_id, previous);
                }
                Err(e.into())
            }
        }
    }

    /// Re-fetch the current user's roadmap and replace the cache.
    pub async fn refresh(&self) -> Result<Roadmap, CoordinatorError> {
        let user_id = self
            .session
            .read()
            .await
            .current_user_id
            .clone()
            .ok_or(CoordinatorError::NoActiveUser)?;

        match self.store.fetch_roadmap(&user_id).await {
            Ok(Some(roadmap)) => {
                *self.roadmap.write().await = Some(roadmap.clone());
                self.set_status(GenerationState::Completed, "Roadmap loaded", None);
                Ok(roadmap)
            }
            // Zero rows for an id we expected to resolve reads as a missing
            // user; "never submitted" and "deleted" are indistinguishable.
            Ok(None) => Err(self.fail(StoreError::RecordNotFound(user_id).into())),
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Adopt an existing user id: resolve its profile, then load its roadmap.
    pub async fn sign_in(&self, user_id: &str) -> Result<Roadmap, CoordinatorError> {
        let profile = match self.store.fetch_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                return Err(self.fail(StoreError::RecordNotFound(user_id.to_string()).into()))
            }
            Err(e) => return Err(self.fail(e.into())),
        };

        {
            let mut session = self.session.write().await;
            session.current_user_id = Some(user_id.to_string());
            session.profile = Some(profile.clone());
            self.persist_session(&session);
        }
        *self.profile.write().await = Some(profile);

        self.refresh().await
    }

    /// Change the current user's display name.
    pub async fn set_username(&self, username: &str) -> Result<UserProfile, CoordinatorError> {
        let user_id = self
            .session
            .read()
            .await
            .current_user_id
            .clone()
            .ok_or(CoordinatorError::NoActiveUser)?;

        let profile = self.store.update_username(&user_id, username).await?;

        {
            let mut session = self.session.write().await;
            session.profile = Some(profile.clone());
            self.persist_session(&session);
        }
        *self.profile.write().await = Some(profile.clone());

        Ok(profile)
    }

    /// The cached roadmap, if one is loaded.
    pub async fn roadmap(&self) -> Option<Roadmap> {
        self.roadmap.read().await.clone()
    }

    /// The cached profile, if one is loaded.
    pub async fn profile(&self) -> Option<UserProfile> {
        self.profile.read().await.clone()
    }

    /// Whether the current user has never chosen a display name.
    pub async fn is_first_time_user(&self) -> bool {
        match self.profile.read().await.as_ref() {
            Some(profile) => profile.is_placeholder(),
            None => true,
        }
    }

    /// Suppress or re-enable the roadmap-overwrite warning.
    pub async fn set_hide_overwrite_warning(&self, hide: bool) {
        let mut session = self.session.write().await;
        session.hide_overwrite_warning = hide;
        self.persist_session(&session);
    }

    pub async fn hide_overwrite_warning(&self) -> bool {
        self.session.read().await.hide_overwrite_warning
    }

    /// Discard the session and all cached state.
    pub async fn sign_out(&self) -> Result<(), CoordinatorError> {
        if let Some(user_id) = self.session.read().await.current_user_id.clone() {
            self.registry.cancel(&user_id);
        }

        self.session_store.clear()?;
        *self.session.write().await = SessionState::default();
        *self.roadmap.write().await = None;
        *self.profile.write().await = None;
        self.set_status(GenerationState::Idle, "", None);

        info!("Signed out, session cleared");
        Ok(())
    }

    /// Fetch the dashboard's total-users stat.
    pub async fn total_users(&self) -> Result<usize, CoordinatorError> {
        Ok(self.store.count_users().await?)
    }

    /// Record an error state and hand the error back for propagation.
    fn fail(&self, error: CoordinatorError) -> CoordinatorError {
        let category = error.category();
        warn!(error = %error, category = ?category, "Generation workflow error");
        self.set_status(GenerationState::Error, category.user_message(), Some(category));
        error
    }

    fn set_status(&self, state: GenerationState, message: impl Into<String>, error: Option<ErrorCategory>) {
        self.status.send_replace(GenerationStatus {
            state,
            message: message.into(),
            error,
        });
    }

    /// Create the profile record lazily after the first successful
    /// generation; a failure here never fails the generation itself.
    async fn adopt_profile(&self, user_id: &str) {
        match self.store.ensure_profile(user_id).await {
            Ok(profile) => {
                let mut session = self.session.write().await;
                session.profile = Some(profile.clone());
                self.persist_session(&session);
                drop(session);
                *self.profile.write().await = Some(profile);
            }
            Err(e) => warn!(error = %e, "Could not ensure user profile"),
        }
    }

    fn persist_session(&self, state: &SessionState) {
        if let Err(e) = self.session_store.save(state) {
            warn!(error = %e, "Failed to persist session state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::MockPlanner;
    use crate::session::MemorySessionStore;
    use crate::store::mock::{MockStore, ScriptedFetch};
    use crate::types::{Task, TaskStatus};

    fn quick_poll() -> PollConfig {
        PollConfig {
            interval_ms: 8_000,
            max_attempts: 5,
            initial_delay_ms: 10_000,
        }
    }

    fn sample_roadmap(user_id: &str, tasks: usize) -> Roadmap {
        let tasks: Vec<Task> = (0..tasks)
            .map(|i| Task {
                id: format!("rec{i}"),
                task_id: i as u32 + 1,
                week: 1,
                theme: "Basics".to_string(),
                description: format!("Task {}", i + 1),
                link: None,
                status: TaskStatus::Pending,
            })
            .collect();

        Roadmap {
            skill: "Rust".to_string(),
            user_id: user_id.to_string(),
            total_weeks: 1,
            total_tasks: tasks.len() as u32,
            completed_tasks: 0,
            tasks,
        }
    }

    fn coordinator(
        planner: MockPlanner,
        store: MockStore,
    ) -> (Coordinator, Arc<MockPlanner>, Arc<MockStore>) {
        let planner = Arc::new(planner);
        let store = Arc::new(store);
        let coordinator = Coordinator::new(
            planner.clone(),
            store.clone(),
            Arc::new(MemorySessionStore::new()),
            quick_poll(),
        );
        (coordinator, planner, store)
    }

    #[tokio::test]
    async fn validation_failures_never_reach_the_planner() {
        let (coordinator, planner, _) = coordinator(MockPlanner::new(), MockStore::new());

        let request = RoadmapRequest::new("Rust", "not-an-email");
        let error = coordinator.generate(request).await.unwrap_err();

        assert!(matches!(error, CoordinatorError::Validation(_)));
        assert_eq!(planner.call_count(), 0);
        assert_eq!(coordinator.current_status().state, GenerationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn generation_completes_and_adopts_a_profile() {
        let store = MockStore::new().with_fetch_sequence([
            ScriptedFetch::Empty,
            ScriptedFetch::Found(sample_roadmap("user_abc123", 3)),
        ]);
        let (coordinator, planner, store) =
            coordinator(MockPlanner::new().with_response("success"), store);

        let request = RoadmapRequest::new("Rust", "a@b.com").with_user_id("user_abc123");
        let roadmap = coordinator.generate(request).await.unwrap();

        assert_eq!(roadmap.tasks.len(), 3);
        assert_eq!(planner.call_count(), 1);
        assert_eq!(planner.submissions()[0].user_id, "user_abc123");
        assert_eq!(store.fetch_calls(), 2);
        assert_eq!(coordinator.current_status().state, GenerationState::Completed);

        // Lazily created placeholder profile means a first-time user.
        assert_eq!(store.count_users().await.unwrap(), 1);
        assert!(coordinator.is_first_time_user().await);
    }

    #[tokio::test(start_paused = true)]
    async fn planner_failure_sets_an_error_state() {
        let (coordinator, _, _) = coordinator(
            MockPlanner::new().with_network_failure("connection refused"),
            MockStore::new(),
        );

        let request = RoadmapRequest::new("Rust", "a@b.com");
        let error = coordinator.generate(request).await.unwrap_err();

        assert!(matches!(error, CoordinatorError::Planner(_)));
        let status = coordinator.current_status();
        assert_eq!(status.state, GenerationState::Error);
        assert_eq!(status.error, Some(ErrorCategory::NetworkError));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_timeout_classifies_as_network_error() {
        let (coordinator, _, store) =
            coordinator(MockPlanner::new().with_response("success"), MockStore::new());

        let request = RoadmapRequest::new("Rust", "a@b.com");
        let error = coordinator.generate(request).await.unwrap_err();

        assert!(matches!(
            error,
            CoordinatorError::Poll(PollError::Timeout { attempts: 5 })
        ));
        assert_eq!(store.fetch_calls(), 5);
        assert_eq!(
            coordinator.current_status().error,
            Some(ErrorCategory::NetworkError)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_receipts_delay_the_first_fetch() {
        let store = MockStore::new()
            .with_fetch_sequence([ScriptedFetch::Found(sample_roadmap("user_abc", 1))]);
        let (coordinator, _, store) =
            coordinator(MockPlanner::new().with_response("workflow accepted"), store);

        let request = RoadmapRequest::new("Rust", "a@b.com").with_user_id("user_abc");
        let roadmap = coordinator.generate(request).await.unwrap();

        assert_eq!(roadmap.tasks.len(), 1);
        assert_eq!(store.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn toggling_flips_status_and_counts() {
        let store = MockStore::new()
            .with_fetch_sequence([ScriptedFetch::Found(sample_roadmap("user_abc", 2))]);
        let (coordinator, _, store) =
            coordinator(MockPlanner::new().with_response("done"), store);

        let request = RoadmapRequest::new("Rust", "a@b.com").with_user_id("user_abc");
        coordinator.generate(request).await.unwrap();

        let status = coordinator.toggle_task("rec0").await.unwrap();
        assert_eq!(status, TaskStatus::Completed);
        assert_eq!(coordinator.roadmap().await.unwrap().completed_tasks, 1);
        assert_eq!(
            store.status_updates(),
            vec![("rec0".to_string(), TaskStatus::Completed)]
        );

        let status = coordinator.toggle_task("rec0").await.unwrap();
        assert_eq!(status, TaskStatus::Pending);
        assert_eq!(coordinator.roadmap().await.unwrap().completed_tasks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_toggle_reverts_the_optimistic_change() {
        let store = MockStore::new()
            .with_fetch_sequence([ScriptedFetch::Found(sample_roadmap("user_abc", 1))])
            .with_failing_status_updates("connection reset");
        let (coordinator, _, _) =
            coordinator(MockPlanner::new().with_response("done"), store);

        let request = RoadmapRequest::new("Rust", "a@b.com").with_user_id("user_abc");
        coordinator.generate(request).await.unwrap();

        let error = coordinator.toggle_task("rec0").await.unwrap_err();
        assert!(matches!(error, CoordinatorError::Store(_)));

        let roadmap = coordinator.roadmap().await.unwrap();
        assert_eq!(roadmap.tasks[0].status, TaskStatus::Pending);
        assert_eq!(roadmap.completed_tasks, 0);
    }

    #[tokio::test]
    async fn toggling_without_a_roadmap_is_rejected() {
        let (coordinator, _, _) = coordinator(MockPlanner::new(), MockStore::new());

        let error = coordinator.toggle_task("rec0").await.unwrap_err();
        assert!(matches!(error, CoordinatorError::NoActiveRoadmap));
    }

    #[tokio::test(start_paused = true)]
    async fn set_username_promotes_a_first_time_user() {
        let store = MockStore::new()
            .with_fetch_sequence([ScriptedFetch::Found(sample_roadmap("user_abc", 1))]);
        let (coordinator, _, _) =
            coordinator(MockPlanner::new().with_response("done"), store);

        let request = RoadmapRequest::new("Rust", "a@b.com").with_user_id("user_abc");
        coordinator.generate(request).await.unwrap();
        assert!(coordinator.is_first_time_user().await);

        let profile = coordinator.set_username("Ada").await.unwrap();
        assert_eq!(profile.username, "Ada");
        assert!(!coordinator.is_first_time_user().await);
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_clears_everything() {
        let store = MockStore::new()
            .with_fetch_sequence([ScriptedFetch::Found(sample_roadmap("user_abc", 1))]);
        let (coordinator, _, _) =
            coordinator(MockPlanner::new().with_response("done"), store);

        let request = RoadmapRequest::new("Rust", "a@b.com").with_user_id("user_abc");
        coordinator.generate(request).await.unwrap();

        coordinator.sign_out().await.unwrap();
        assert!(coordinator.roadmap().await.is_none());
        assert!(coordinator.profile().await.is_none());
        assert_eq!(coordinator.current_status().state, GenerationState::Idle);
    }

    #[tokio::test]
    async fn refresh_with_zero_rows_reads_as_user_not_found() {
        let (coordinator, _, _) = coordinator(MockPlanner::new(), MockStore::new());

        // Simulate a resumed session pointing at a vanished user.
        let state = SessionState {
            current_user_id: Some("user_gone".to_string()),
            ..SessionState::default()
        };
        coordinator.session_store.save(&state).unwrap();
        coordinator.resume().await.unwrap();

        let error = coordinator.refresh().await.unwrap_err();
        assert_eq!(error.category(), ErrorCategory::UserNotFound);
        assert_eq!(
            coordinator.current_status().error,
            Some(ErrorCategory::UserNotFound)
        );
    }
}
