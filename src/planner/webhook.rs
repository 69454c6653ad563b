//! Webhook planner backend.
//!
//! Posts the JSON-encoded request to a workflow-automation webhook. The
//! webhook's HTTP response does not guarantee the automation's work is
//! complete; completion is inferred from the response text.

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::{debug, info};

use super::traits::{Planner, PlannerError, SubmissionReceipt};
use crate::config::PlannerConfig;
use crate::request::RoadmapRequest;

/// Keywords whose presence in a webhook response marks generation as done.
const COMPLETION_KEYWORDS: &[&str] = &[
    "completed",
    "done",
    "finished",
    "success",
    "generated",
    "ready",
];

/// Whether a webhook response body indicates completed generation.
///
/// Case-insensitive substring search over a fixed keyword set. The response
/// shape is not contractually typed, so this heuristic is the only completion
/// signal available; it is kept in one place so a structured status field can
/// replace it without touching callers.
pub fn response_indicates_completion(body: &str) -> bool {
    let body = body.to_lowercase();
    COMPLETION_KEYWORDS.iter().any(|k| body.contains(k))
}

/// Planner backed by the production webhook.
pub struct WebhookPlanner {
    client: Client,
    webhook_url: String,
}

impl WebhookPlanner {
    /// Create a planner for the configured webhook.
    pub fn new(config: PlannerConfig) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            webhook_url: config.webhook_url,
        }
    }
}

#[async_trait]
impl Planner for WebhookPlanner {
    async fn submit(&self, request: &RoadmapRequest) -> Result<SubmissionReceipt, PlannerError> {
        request.validate()?;

        info!(user_id = %request.user_id, skill = %request.skill, "Submitting to planner");

        let response = self
            .client
            .post(&self.webhook_url)
            .json(request)
            .send()
            .await
            .map_err(|e| PlannerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlannerError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let raw_response = response
            .text()
            .await
            .map_err(|e| PlannerError::Network(e.to_string()))?;

        let is_completed = response_indicates_completion(&raw_response);
        debug!(is_completed, "Planner responded");

        Ok(SubmissionReceipt {
            success: true,
            is_completed,
            raw_response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_keywords_match_case_insensitively() {
        assert!(response_indicates_completion("Roadmap GENERATED for user"));
        assert!(response_indicates_completion("{\"status\": \"success\"}"));
        assert!(response_indicates_completion("done"));
        assert!(response_indicates_completion("All Finished!"));
    }

    #[test]
    fn unrelated_responses_do_not_indicate_completion() {
        assert!(!response_indicates_completion("queued"));
        assert!(!response_indicates_completion(""));
        assert!(!response_indicates_completion("workflow accepted"));
    }
}
