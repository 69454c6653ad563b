//! Mock planner for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{Planner, PlannerError, SubmissionReceipt};
use super::webhook::response_indicates_completion;
use crate::request::RoadmapRequest;

/// Scripted planner for unit tests.
///
/// Records every submitted request and answers with a configurable response
/// body or failure.
pub struct MockPlanner {
    response_body: Mutex<String>,
    fail_with: Mutex<Option<String>>,
    call_count: AtomicU32,
    submissions: Mutex<Vec<RoadmapRequest>>,
}

impl MockPlanner {
    /// Create a mock that answers with an empty (not-yet-completed) body.
    pub fn new() -> Self {
        Self {
            response_body: Mutex::new(String::new()),
            fail_with: Mutex::new(None),
            call_count: AtomicU32::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Set the response body returned to submissions.
    pub fn with_response(self, body: impl Into<String>) -> Self {
        *self.response_body.lock().expect("lock poisoned") = body.into();
        self
    }

    /// Make every submission fail with a network error.
    pub fn with_network_failure(self, message: impl Into<String>) -> Self {
        *self.fail_with.lock().expect("lock poisoned") = Some(message.into());
        self
    }

    /// Number of submissions received.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Copies of every request submitted so far.
    pub fn submissions(&self) -> Vec<RoadmapRequest> {
        self.submissions.lock().expect("lock poisoned").clone()
    }
}

impl Default for MockPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Planner for MockPlanner {
    async fn submit(&self, request: &RoadmapRequest) -> Result<SubmissionReceipt, PlannerError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .expect("lock poisoned")
            .push(request.clone());

        if let Some(message) = self.fail_with.lock().expect("lock poisoned").clone() {
            return Err(PlannerError::Network(message));
        }

        let raw_response = self.response_body.lock().expect("lock poisoned").clone();
        Ok(SubmissionReceipt {
            success: true,
            is_completed: response_indicates_completion(&raw_response),
            raw_response,
        })
    }
}
