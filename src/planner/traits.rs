//! The [`Planner`] trait and its error/result types.

use async_trait::async_trait;

use crate::request::RoadmapRequest;

/// Error types for planner submissions.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// The webhook rejected the request or failed outright
    #[error("Planner webhook failed: HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },

    /// Transport-level failure (DNS, timeout, connection)
    #[error("Network error: {0}")]
    Network(String),

    /// The request failed client-side validation
    #[error("{0}")]
    Invalid(#[from] crate::request::ValidationError),
}

/// Outcome of a webhook submission.
///
/// The webhook's response body is arbitrary text; `is_completed` is inferred
/// heuristically from it and a `false` only means the automation has not
/// confirmed completion yet, not that it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// The trigger was accepted (2xx)
    pub success: bool,
    /// The response body suggests generation already finished
    pub is_completed: bool,
    /// Raw response body, kept for diagnostics
    pub raw_response: String,
}

/// A backend that can trigger roadmap generation.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Submit a generation request.
    ///
    /// Sends exactly one trigger per call and never mutates the request.
    async fn submit(&self, request: &RoadmapRequest) -> Result<SubmissionReceipt, PlannerError>;
}
