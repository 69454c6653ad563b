//! The [`RoadmapStore`] trait and its error types.

use async_trait::async_trait;

use crate::types::{Roadmap, TaskStatus, UserProfile};

/// Error types for record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store rejected a request
    #[error("Airtable API failed: HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// Transport-level failure (DNS, timeout, connection)
    #[error("Network error: {0}")]
    Network(String),

    /// The store answered with a body we could not interpret
    #[error("Parse error: {0}")]
    Parse(String),

    /// A lookup that must resolve a record came back empty
    #[error("User not found: {0}")]
    RecordNotFound(String),
}

/// Read and write access to roadmap task rows and user profiles.
///
/// Task rows are created entirely by the external automation; this interface
/// never creates them, only reads and status-patches. Profile records are the
/// one exception: they are created lazily with a placeholder name.
#[async_trait]
pub trait RoadmapStore: Send + Sync {
    /// Fetch and normalize all task rows for a user.
    ///
    /// `Ok(None)` means zero rows matched, which is ambiguous between "user
    /// unknown" and "not yet generated".
    async fn fetch_roadmap(&self, user_id: &str) -> Result<Option<Roadmap>, StoreError>;

    /// Set the status of one task row, addressed by its opaque record id.
    async fn set_task_status(&self, record_id: &str, status: TaskStatus)
        -> Result<(), StoreError>;

    /// Look up the profile for a user, if one exists.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Fetch the profile for a user, creating a placeholder record if absent.
    async fn ensure_profile(&self, user_id: &str) -> Result<UserProfile, StoreError>;

    /// Change a user's display name.
    async fn update_username(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<UserProfile, StoreError>;

    /// Total number of user records, for the dashboard stat.
    async fn count_users(&self) -> Result<usize, StoreError>;
}
