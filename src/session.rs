//! Persisted session state.
//!
//! One module owns every read and write of session data; the rest of the
//! crate receives session state as passed-in context. The file-backed
//! implementation is the desktop analog of the original browser key/value
//! store: user id, last form data, profile, and the overwrite-warning
//! preference, all cleared together on sign-out.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::request::RoadmapRequest;
use crate::types::UserProfile;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session data error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Everything that survives between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// The user id of the active roadmap, if any
    #[serde(default)]
    pub current_user_id: Option<String>,

    /// Last submitted form data, restored into the form on resume
    #[serde(default)]
    pub form_data: Option<RoadmapRequest>,

    /// Cached profile, revalidated against the store on use
    #[serde(default)]
    pub profile: Option<UserProfile>,

    /// Suppress the roadmap-overwrite warning dialog
    #[serde(default)]
    pub hide_overwrite_warning: bool,
}

/// Owner of all persisted session reads and writes.
pub trait SessionStore: Send + Sync {
    /// Load the persisted state; an absent session loads as default.
    fn load(&self) -> Result<SessionState, SessionError>;

    /// Persist the given state, replacing whatever was stored.
    fn save(&self, state: &SessionState) -> Result<(), SessionError>;

    /// Remove all persisted state (sign-out).
    fn clear(&self) -> Result<(), SessionError>;
}

/// Session state persisted as a JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<SessionState, SessionError> {
        if !self.path.exists() {
            return Ok(SessionState::default());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let raw = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, raw)?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        debug!(path = %self.path.display(), "Session cleared");
        Ok(())
    }
}

/// In-memory session store for tests.
#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<SessionState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<SessionState, SessionError> {
        Ok(self.state.lock().expect("lock poisoned").clone())
    }

    fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        *self.state.lock().expect("lock poisoned") = state.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.state.lock().expect("lock poisoned") = SessionState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        let state = store.load().unwrap();
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/session.json"));

        let state = SessionState {
            current_user_id: Some("user_abc".to_string()),
            form_data: Some(RoadmapRequest::new("Rust", "a@b.com").with_user_id("user_abc")),
            profile: None,
            hide_overwrite_warning: true,
        };

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));

        let state = SessionState {
            current_user_id: Some("user_abc".to_string()),
            ..SessionState::default()
        };
        store.save(&state).unwrap();
        store.clear().unwrap();

        assert_eq!(store.load().unwrap(), SessionState::default());
        // Clearing an already-empty store is fine.
        store.clear().unwrap();
    }
}
