//! Error handling for staging publication
//!
//! This module provides the error taxonomy of the publish workflow with
//! recovery guidance, using the thiserror crate for ergonomic error handling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Step of the release workflow that issued a remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    ResolveProfile,
    Open,
    Upload,
    Close,
    Poll,
    Activity,
    Promote,
    ChecksumCheck,
    BuildPromotion,
    BuildLookup,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ResolveProfile => "staging profile lookup",
            Step::Open => "staging repository open",
            Step::Upload => "artifact upload",
            Step::Close => "staging repository close",
            Step::Poll => "staging repository status poll",
            Step::Activity => "staging activity lookup",
            Step::Promote => "staging repository promotion",
            Step::ChecksumCheck => "published checksum check",
            Step::BuildPromotion => "build promotion",
            Step::BuildLookup => "build info lookup",
        };
        f.write_str(name)
    }
}

/// Main error type for release publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Configuration errors
    #[error("Expected exactly one staging profile for '{group_id}', found {matches}")]
    ProfileResolution { group_id: String, matches: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid release information: {0}")]
    ReleaseInfo(String),

    // Network errors
    #[error("{step} request failed: {source}")]
    Transport {
        step: Step,
        repository_id: Option<String>,
        #[source]
        source: reqwest::Error,
    },

    #[error("{step} request returned HTTP {status}")]
    UnexpectedStatus {
        step: Step,
        repository_id: Option<String>,
        status: u16,
        body: String,
    },

    // Staging workflow errors
    #[error("Upload of '{path}' to staging repository {repository_id} failed: {reason}")]
    Upload {
        repository_id: String,
        path: String,
        reason: String,
    },

    #[error("Close failed")]
    CloseRejected {
        repository_id: String,
        diagnostics: Vec<String>,
    },

    #[error("Timed out waiting for close of staging repository {repository_id}: {reason}")]
    CloseTimeout {
        repository_id: String,
        reason: String,
    },

    #[error("Publish cancelled at {step}")]
    Cancelled {
        step: Step,
        repository_id: Option<String>,
    },

    #[error("Promotion of staging repository {repository_id} failed: {reason}")]
    Promotion {
        repository_id: String,
        reason: String,
    },

    // State errors
    #[error("Illegal publish state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Get the workflow step this error was raised by, when known
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::ProfileResolution { .. } => Some(Step::ResolveProfile),
            Self::Transport { step, .. }
            | Self::UnexpectedStatus { step, .. }
            | Self::Cancelled { step, .. } => Some(*step),
            Self::Upload { .. } => Some(Step::Upload),
            Self::CloseRejected { .. } | Self::CloseTimeout { .. } => Some(Step::Poll),
            Self::Promotion { .. } => Some(Step::Promote),
            Self::Config(_)
            | Self::ReleaseInfo(_)
            | Self::InvalidTransition { .. }
            | Self::Io { .. } => None,
        }
    }

    /// Get the staging repository left behind by this failure, if one was opened
    pub fn repository_id(&self) -> Option<&str> {
        match self {
            Self::Transport { repository_id, .. }
            | Self::UnexpectedStatus { repository_id, .. }
            | Self::Cancelled { repository_id, .. } => repository_id.as_deref(),
            Self::Upload { repository_id, .. }
            | Self::CloseRejected { repository_id, .. }
            | Self::CloseTimeout { repository_id, .. }
            | Self::Promotion { repository_id, .. } => Some(repository_id),
            Self::ProfileResolution { .. }
            | Self::Config(_)
            | Self::ReleaseInfo(_)
            | Self::InvalidTransition { .. }
            | Self::Io { .. } => None,
        }
    }

    /// Check if this error may clear up by simply asking again
    ///
    /// Only connection-level failures and server-side (5xx) responses qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_connect() || source.is_timeout(),
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if a later publish attempt can succeed without operator changes
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::ProfileResolution { .. }
                | Self::Config(_)
                | Self::ReleaseInfo(_)
                | Self::CloseRejected { .. }
                | Self::InvalidTransition { .. }
        )
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        let mut actions = match self {
            Self::ProfileResolution { .. } => vec![
                "Check the stagingProfile setting against the profiles visible to this account",
                "Set stagingProfileId to bypass profile lookup",
            ],
            Self::Config(_) => vec!["Check .release-config.yaml and the environment overrides"],
            Self::ReleaseInfo(_) => {
                vec!["Check that build-info.json lists at least one module with group:artifact:version coordinates"]
            }
            Self::Transport { .. } => vec![
                "Check network connectivity to the repository manager",
                "Retry once the repository manager is reachable",
            ],
            Self::UnexpectedStatus { .. } => vec![
                "Check the credentials and permissions of the publishing account",
                "Inspect the response body for details",
            ],
            Self::Upload { .. } => vec!["Check the failing artifact and retry the publish"],
            Self::CloseRejected { .. } => vec![
                "Review the rule failures reported by the repository manager",
                "Fix signatures, checksums or POM metadata and publish again",
            ],
            Self::CloseTimeout { .. } => vec![
                "Check the staging repository state in the repository manager UI",
                "Increase maxPolls or pollingIntervalSecs",
            ],
            Self::Cancelled { .. } => vec!["Check the staging repository state before publishing again"],
            Self::Promotion { .. } => vec![
                "Check whether the release already happened before retrying",
                "Promote the closed staging repository manually",
            ],
            Self::InvalidTransition { .. } => vec!["Delete the state file and publish again"],
            Self::Io { .. } => vec!["Check that the path exists and is readable"],
        };

        if self.repository_id().is_some() {
            actions.push("Drop the staging repository manually if it is no longer needed");
        }

        actions
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProfileResolution { .. } => "PROFILE_RESOLUTION_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::ReleaseInfo(_) => "INVALID_RELEASE_INFO",
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
            Self::Upload { .. } => "UPLOAD_FAILED",
            Self::CloseRejected { .. } => "CLOSE_REJECTED",
            Self::CloseTimeout { .. } => "CLOSE_TIMEOUT",
            Self::Cancelled { .. } => "CANCELLED",
            Self::Promotion { .. } => "PROMOTION_FAILED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Io { .. } => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_resolution_error() {
        let error = PublishError::ProfileResolution {
            group_id: "org.example".to_string(),
            matches: 0,
        };

        assert_eq!(error.step(), Some(Step::ResolveProfile));
        assert_eq!(error.repository_id(), None);
        assert!(!error.is_recoverable());
        assert!(!error.is_transient());
        assert_eq!(error.code(), "PROFILE_RESOLUTION_FAILED");
        assert!(error.to_string().contains("org.example"));
    }

    #[test]
    fn test_close_rejected_message_is_exact() {
        let error = PublishError::CloseRejected {
            repository_id: "example-6789".to_string(),
            diagnostics: vec!["Missing signature".to_string()],
        };

        assert_eq!(error.to_string(), "Close failed");
        assert_eq!(error.repository_id(), Some("example-6789"));
        assert_eq!(error.code(), "CLOSE_REJECTED");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_upload_error_mentions_path() {
        let error = PublishError::Upload {
            repository_id: "example-6789".to_string(),
            path: "org/example/a/1.0/a-1.0.jar".to_string(),
            reason: "HTTP 400".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("org/example/a/1.0/a-1.0.jar"));
        assert!(message.contains("example-6789"));
        assert_eq!(error.step(), Some(Step::Upload));
    }

    #[test]
    fn test_server_errors_are_transient() {
        let server_error = PublishError::UnexpectedStatus {
            step: Step::Poll,
            repository_id: Some("example-6789".to_string()),
            status: 503,
            body: String::new(),
        };
        let client_error = PublishError::UnexpectedStatus {
            step: Step::Poll,
            repository_id: Some("example-6789".to_string()),
            status: 404,
            body: String::new(),
        };

        assert!(server_error.is_transient());
        assert!(!client_error.is_transient());
    }

    #[test]
    fn test_suggested_actions_mention_manual_drop_for_open_repository() {
        let error = PublishError::CloseTimeout {
            repository_id: "example-6789".to_string(),
            reason: "still transitioning after 3 polls".to_string(),
        };

        let actions = error.suggested_actions();
        assert!(actions.iter().any(|a| a.contains("Drop the staging repository")));

        let config_error = PublishError::Config("bad".to_string());
        assert!(
            !config_error
                .suggested_actions()
                .iter()
                .any(|a| a.contains("Drop the staging repository"))
        );
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::Upload.to_string(), "artifact upload");
        let error = PublishError::UnexpectedStatus {
            step: Step::Close,
            repository_id: None,
            status: 500,
            body: String::new(),
        };
        assert_eq!(
            error.to_string(),
            "staging repository close request returned HTTP 500"
        );
    }

    #[test]
    fn test_cancelled_before_open_has_no_repository() {
        let before_open = PublishError::Cancelled {
            step: Step::Open,
            repository_id: None,
        };
        let during_upload = PublishError::Cancelled {
            step: Step::Upload,
            repository_id: Some("example-6789".to_string()),
        };

        assert_eq!(before_open.to_string(), "Publish cancelled at staging repository open");
        assert_eq!(before_open.repository_id(), None);
        assert_eq!(during_upload.step(), Some(Step::Upload));
        assert_eq!(during_upload.repository_id(), Some("example-6789"));
        assert!(during_upload.is_recoverable());
    }
}
