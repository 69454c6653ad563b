//! Mock record store for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{RoadmapStore, StoreError};
use crate::types::{Roadmap, TaskStatus, UserProfile, PLACEHOLDER_USERNAME};

/// One scripted answer to a `fetch_roadmap` call.
#[derive(Debug, Clone)]
pub enum ScriptedFetch {
    /// Zero rows for the user
    Empty,
    /// A populated roadmap
    Found(Roadmap),
    /// Transport failure with this message
    FailNetwork(String),
    /// HTTP failure with this status and body
    FailHttp(u16, String),
}

impl ScriptedFetch {
    fn into_result(self) -> Result<Option<Roadmap>, StoreError> {
        match self {
            ScriptedFetch::Empty => Ok(None),
            ScriptedFetch::Found(roadmap) => Ok(Some(roadmap)),
            ScriptedFetch::FailNetwork(message) => Err(StoreError::Network(message)),
            ScriptedFetch::FailHttp(status, body) => {
                Err(StoreError::RequestFailed { status, body })
            }
        }
    }
}

/// Scripted store for unit tests.
///
/// `fetch_roadmap` answers from a queue of scripted results, falling back to
/// "zero rows" once the queue is drained. Profile records live in an
/// in-memory map. Every call is counted.
pub struct MockStore {
    fetch_script: Mutex<VecDeque<ScriptedFetch>>,
    fetch_calls: AtomicU32,
    status_updates: Mutex<Vec<(String, TaskStatus)>>,
    fail_status_update: Mutex<Option<String>>,
    profiles: Mutex<HashMap<String, UserProfile>>,
    next_record_id: AtomicU32,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            fetch_script: Mutex::new(VecDeque::new()),
            fetch_calls: AtomicU32::new(0),
            status_updates: Mutex::new(Vec::new()),
            fail_status_update: Mutex::new(None),
            profiles: Mutex::new(HashMap::new()),
            next_record_id: AtomicU32::new(1),
        }
    }

    /// Queue answers for successive `fetch_roadmap` calls.
    pub fn with_fetch_sequence(self, script: impl IntoIterator<Item = ScriptedFetch>) -> Self {
        self.fetch_script
            .lock()
            .expect("lock poisoned")
            .extend(script);
        self
    }

    /// Seed an existing user profile.
    pub fn with_profile(self, profile: UserProfile) -> Self {
        self.profiles
            .lock()
            .expect("lock poisoned")
            .insert(profile.user_id.clone(), profile);
        self
    }

    /// Make every `set_task_status` call fail with this message.
    pub fn with_failing_status_updates(self, message: impl Into<String>) -> Self {
        *self.fail_status_update.lock().expect("lock poisoned") = Some(message.into());
        self
    }

    /// Number of `fetch_roadmap` calls so far.
    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Every `(record_id, status)` pair written so far.
    pub fn status_updates(&self) -> Vec<(String, TaskStatus)> {
        self.status_updates.lock().expect("lock poisoned").clone()
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoadmapStore for MockStore {
    async fn fetch_roadmap(&self, _user_id: &str) -> Result<Option<Roadmap>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .fetch_script
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or(ScriptedFetch::Empty);

        scripted.into_result()
    }

    async fn set_task_status(
        &self,
        record_id: &str,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        if let Some(message) = self.fail_status_update.lock().expect("lock poisoned").clone() {
            return Err(StoreError::Network(message));
        }

        self.status_updates
            .lock()
            .expect("lock poisoned")
            .push((record_id.to_string(), status));
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self
            .profiles
            .lock()
            .expect("lock poisoned")
            .get(user_id)
            .cloned())
    }

    async fn ensure_profile(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        let mut profiles = self.profiles.lock().expect("lock poisoned");
        if let Some(profile) = profiles.get(user_id) {
            return Ok(profile.clone());
        }

        let record_id = format!(
            "recMock{}",
            self.next_record_id.fetch_add(1, Ordering::SeqCst)
        );
        let profile = UserProfile {
            record_id,
            user_id: user_id.to_string(),
            username: PLACEHOLDER_USERNAME.to_string(),
        };
        profiles.insert(user_id.to_string(), profile.clone());
        Ok(profile)
    }

    async fn update_username(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<UserProfile, StoreError> {
        let mut profiles = self.profiles.lock().expect("lock poisoned");
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| StoreError::RecordNotFound(user_id.to_string()))?;

        profile.username = username.to_string();
        Ok(profile.clone())
    }

    async fn count_users(&self) -> Result<usize, StoreError> {
        Ok(self.profiles.lock().expect("lock poisoned").len())
    }
}
