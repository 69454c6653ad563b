//! Best-effort classification of raw errors into user-facing categories.
//!
//! There is no structured error-code contract with either external service,
//! so classification is substring matching over error messages. Categories are
//! mutually exclusive and first match wins, which makes the check order part
//! of the contract: a message containing both "timeout" and "500" resolves to
//! whichever list is consulted first.

use serde::{Deserialize, Serialize};

const USER_NOT_FOUND_KEYWORDS: &[&str] = &["user not found", "invalid user", "404", "not found"];
const NO_ROADMAP_DATA_KEYWORDS: &[&str] = &["no data", "empty", "no roadmap", "no tasks"];
const NETWORK_ERROR_KEYWORDS: &[&str] = &["network", "timeout", "connection", "fetch"];
const SERVER_ERROR_KEYWORDS: &[&str] = &["server", "500", "502", "503"];

/// User-facing category selecting UI copy and recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The user id has no rows behind it
    UserNotFound,
    /// The user exists but the roadmap is empty
    NoRoadmapData,
    /// Transport-level failure or timeout
    NetworkError,
    /// The external service reported a server fault
    ServerError,
    /// Anything the keyword lists do not cover
    Unknown,
}

impl ErrorCategory {
    /// Recovery-oriented copy shown alongside the error dialog.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCategory::UserNotFound => {
                "User ID not found in the database. Please check your User ID or create a new roadmap."
            }
            ErrorCategory::NoRoadmapData => {
                "User found but no roadmap data exists. Please create a new roadmap."
            }
            ErrorCategory::NetworkError => {
                "Unable to connect to the server. Please check your internet connection and try again."
            }
            ErrorCategory::ServerError => "Server error occurred. Please try again later.",
            ErrorCategory::Unknown => "An unexpected error occurred. Please try again.",
        }
    }
}

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| message.contains(k))
}

/// Map a raw error message onto an [`ErrorCategory`].
///
/// Case-insensitive; first matching category wins.
pub fn classify(message: &str) -> ErrorCategory {
    let message = message.to_lowercase();

    if contains_any(&message, USER_NOT_FOUND_KEYWORDS) {
        ErrorCategory::UserNotFound
    } else if contains_any(&message, NO_ROADMAP_DATA_KEYWORDS) {
        ErrorCategory::NoRoadmapData
    } else if contains_any(&message, NETWORK_ERROR_KEYWORDS) {
        ErrorCategory::NetworkError
    } else if contains_any(&message, SERVER_ERROR_KEYWORDS) {
        ErrorCategory::ServerError
    } else {
        ErrorCategory::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_404_is_user_not_found() {
        assert_eq!(
            classify("Request failed: 404 Not Found"),
            ErrorCategory::UserNotFound
        );
    }

    #[test]
    fn failed_fetch_is_network_error() {
        assert_eq!(
            classify("TypeError: Failed to fetch"),
            ErrorCategory::NetworkError
        );
    }

    #[test]
    fn timeout_is_network_error() {
        assert_eq!(
            classify("Timeout: Could not fetch roadmap data"),
            ErrorCategory::NetworkError
        );
    }

    #[test]
    fn server_faults_classify_as_server_error() {
        for message in ["HTTP 500: boom", "bad gateway 502", "internal server fault"] {
            assert_eq!(classify(message), ErrorCategory::ServerError, "{message}");
        }
    }

    #[test]
    fn empty_roadmap_messages_classify_as_no_data() {
        assert_eq!(classify("No roadmap for user"), ErrorCategory::NoRoadmapData);
        assert_eq!(classify("result set was EMPTY"), ErrorCategory::NoRoadmapData);
    }

    #[test]
    fn first_match_wins_across_categories() {
        // Contains both a UserNotFound and a ServerError keyword.
        assert_eq!(
            classify("500: user not found"),
            ErrorCategory::UserNotFound
        );
        // Contains both a network and a server keyword.
        assert_eq!(classify("server timeout"), ErrorCategory::NetworkError);
    }

    #[test]
    fn unmatched_messages_are_unknown() {
        assert_eq!(classify("something odd happened"), ErrorCategory::Unknown);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("USER NOT FOUND"), ErrorCategory::UserNotFound);
    }
}
