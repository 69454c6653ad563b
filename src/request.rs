//! Roadmap generation requests.
//!
//! A [`RoadmapRequest`] is ephemeral input: created on form submit, serialized
//! to the planner webhook, and discarded once a roadmap is obtained or an
//! error is surfaced. The `user_id` is generated client-side before submission
//! and is the sole correlation key between the request and the task rows that
//! later appear in the record store.

use std::sync::OnceLock;

use chrono::Utc;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{LearningGoal, SkillLevel};

/// Accepted week range for a generated plan.
pub const MIN_WEEKS: u8 = 1;
pub const MAX_WEEKS: u8 = 12;

const USER_ID_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern")
    })
}

fn encode_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(USER_ID_CHARSET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Generate a unique user id of the form `user_<timestamp>_<random>`.
///
/// The timestamp component is the current epoch milliseconds in base 36, the
/// suffix is six random lowercase alphanumerics.
pub fn generate_user_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| USER_ID_CHARSET[rng.gen_range(0..USER_ID_CHARSET.len())] as char)
        .collect();
    format!("user_{}_{}", encode_base36(millis), suffix)
}

/// Validation failure for a [`RoadmapRequest`].
///
/// Carries one message per violated field so a form layer can render inline
/// errors. Validation never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid request: {}", errors.join("; "))]
pub struct ValidationError {
    /// One human-readable message per violated constraint
    pub errors: Vec<String>,
}

/// Input for one roadmap generation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapRequest {
    /// Skill to learn
    pub skill: String,
    /// Where progress updates are sent
    pub email: String,
    /// Learning motivation
    pub goal: LearningGoal,
    /// Current experience level
    pub level: SkillLevel,
    /// Requested plan length in weeks
    pub weeks: u8,
    /// Client-generated correlation key
    #[serde(rename = "userID")]
    pub user_id: String,
}

impl RoadmapRequest {
    /// Create a request with a freshly generated user id and default
    /// goal/level/weeks.
    pub fn new(skill: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            email: email.into(),
            goal: LearningGoal::default(),
            level: SkillLevel::default(),
            weeks: 8,
            user_id: generate_user_id(),
        }
    }

    /// Set the learning goal.
    pub fn with_goal(mut self, goal: LearningGoal) -> Self {
        self.goal = goal;
        self
    }

    /// Set the experience level.
    pub fn with_level(mut self, level: SkillLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the plan length in weeks.
    pub fn with_weeks(mut self, weeks: u8) -> Self {
        self.weeks = weeks;
        self
    }

    /// Use an existing user id instead of the generated one.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Check the request against the submission constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.skill.trim().is_empty() {
            errors.push("Skill is required".to_string());
        }

        if self.email.trim().is_empty() {
            errors.push("Email is required".to_string());
        } else if !email_pattern().is_match(self.email.trim()) {
            errors.push("Please enter a valid email address".to_string());
        }

        if self.user_id.trim().is_empty() {
            errors.push("User ID is required".to_string());
        }

        if !(MIN_WEEKS..=MAX_WEEKS).contains(&self.weeks) {
            errors.push(format!(
                "Weeks must be between {MIN_WEEKS} and {MAX_WEEKS}"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_user_ids_are_unique_and_well_formed() {
        let a = generate_user_id();
        let b = generate_user_id();

        assert!(a.starts_with("user_"));
        assert_eq!(a.split('_').count(), 3);
        assert_ne!(a, b);
    }

    #[test]
    fn valid_request_passes() {
        let request = RoadmapRequest::new("Rust", "a@b.com").with_weeks(8);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let request = RoadmapRequest {
            skill: "".to_string(),
            email: "".to_string(),
            goal: LearningGoal::GetAJob,
            level: SkillLevel::Beginner,
            weeks: 0,
            user_id: "".to_string(),
        };

        let error = request.validate().unwrap_err();
        assert_eq!(error.errors.len(), 4); // skill, email, user id, weeks
        assert!(error.errors.iter().any(|e| e.contains("Skill")));
        assert!(error.errors.iter().any(|e| e.contains("Email")));
        assert!(error.errors.iter().any(|e| e.contains("User ID")));
    }

    #[test]
    fn email_shape_is_enforced() {
        for bad in ["plainaddress", "a@b", "a b@c.com", "a@b c.com", "@b.com"] {
            let request = RoadmapRequest::new("Rust", bad);
            assert!(request.validate().is_err(), "accepted {bad:?}");
        }

        let request = RoadmapRequest::new("Rust", "learner@example.co.uk");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn weeks_out_of_range_is_rejected() {
        for weeks in [0u8, 13, 200] {
            let request = RoadmapRequest::new("Rust", "a@b.com").with_weeks(weeks);
            assert!(request.validate().is_err(), "accepted weeks {weeks}");
        }
        for weeks in [1u8, 12] {
            let request = RoadmapRequest::new("Rust", "a@b.com").with_weeks(weeks);
            assert!(request.validate().is_ok(), "rejected weeks {weeks}");
        }
    }

    #[test]
    fn serializes_with_external_field_names() {
        let request = RoadmapRequest::new("Rust", "a@b.com")
            .with_user_id("user_abc123")
            .with_weeks(8);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["userID"], "user_abc123");
        assert_eq!(json["goal"], "Get a Job");
        assert_eq!(json["level"], "Beginner");
        assert_eq!(json["weeks"], 8);
    }
}
