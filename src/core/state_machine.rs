//! State machine for tracking the staging publish workflow
//!
//! Each step of the workflow moves the machine forward; illegal orderings
//! are rejected. The state can be persisted with atomic file operations so
//! operators can find an open staging repository after a failure.

use crate::core::error::{PublishError, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Outcome of the remote close validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseOutcome {
    Success,
    Failure,
}

/// Publishing state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishState {
    Initial,
    Opened {
        profile_id: String,
        repository_id: String,
    },
    Uploaded {
        repository_id: String,
        artifacts: usize,
    },
    Closed {
        repository_id: String,
        outcome: CloseOutcome,
    },
    Promoted {
        repository_id: String,
    },
    Failed {
        repository_id: Option<String>,
        step: Option<Step>,
        error: String,
    },
}

impl PublishState {
    /// Staging repository this state refers to, if one was opened
    pub fn repository_id(&self) -> Option<&str> {
        match self {
            PublishState::Initial => None,
            PublishState::Opened { repository_id, .. }
            | PublishState::Uploaded { repository_id, .. }
            | PublishState::Closed { repository_id, .. }
            | PublishState::Promoted { repository_id } => Some(repository_id),
            PublishState::Failed { repository_id, .. } => repository_id.as_deref(),
        }
    }

    /// No further transition is possible from a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PublishState::Promoted { .. }
                | PublishState::Failed { .. }
                | PublishState::Closed {
                    outcome: CloseOutcome::Failure,
                    ..
                }
        )
    }

    fn name(&self) -> &'static str {
        match self {
            PublishState::Initial => "Initial",
            PublishState::Opened { .. } => "Opened",
            PublishState::Uploaded { .. } => "Uploaded",
            PublishState::Closed {
                outcome: CloseOutcome::Success,
                ..
            } => "Closed(success)",
            PublishState::Closed {
                outcome: CloseOutcome::Failure,
                ..
            } => "Closed(failure)",
            PublishState::Promoted { .. } => "Promoted",
            PublishState::Failed { .. } => "Failed",
        }
    }

    fn can_transition_to(&self, to: &PublishState) -> bool {
        if self.is_terminal() {
            return false;
        }

        match (self, to) {
            (_, PublishState::Failed { .. }) => true,
            (PublishState::Initial, PublishState::Opened { .. }) => true,
            (PublishState::Opened { repository_id: a, .. }, PublishState::Uploaded { repository_id: b, .. })
            | (PublishState::Uploaded { repository_id: a, .. }, PublishState::Closed { repository_id: b, .. }) => {
                a == b
            }
            (
                PublishState::Closed {
                    repository_id: a,
                    outcome: CloseOutcome::Success,
                },
                PublishState::Promoted { repository_id: b },
            ) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repository_id() {
            Some(id) => write!(f, "{} [{}]", self.name(), id),
            None => f.write_str(self.name()),
        }
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub from: PublishState,
    pub to: PublishState,
    pub timestamp: DateTime<Utc>,
}

/// Publish state data as persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublishStateData {
    pub current_state: PublishState,
    pub transitions: Vec<StateTransition>,
}

/// State machine for tracking the publish workflow
#[derive(Debug)]
pub struct PublishStateMachine {
    current_state: PublishState,
    transitions: Vec<StateTransition>,
    state_file_path: Option<PathBuf>,
}

impl Default for PublishStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishStateMachine {
    /// Create an in-memory state machine
    pub fn new() -> Self {
        Self {
            current_state: PublishState::Initial,
            transitions: Vec::new(),
            state_file_path: None,
        }
    }

    /// Create a state machine that persists every transition to `path`
    pub fn with_state_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            state_file_path: Some(path.as_ref().to_path_buf()),
            ..Self::new()
        }
    }

    /// Transition to a new state
    ///
    /// # Errors
    ///
    /// Returns `PublishError::InvalidTransition` when `to` does not follow the
    /// current state. Persistence failures are logged, not returned.
    pub async fn transition(&mut self, to: PublishState) -> Result<(), PublishError> {
        if !self.current_state.can_transition_to(&to) {
            return Err(PublishError::InvalidTransition {
                from: self.current_state.to_string(),
                to: to.to_string(),
            });
        }

        self.transitions.push(StateTransition {
            from: self.current_state.clone(),
            to: to.clone(),
            timestamp: Utc::now(),
        });
        self.current_state = to;

        if let Err(e) = self.save().await {
            warn!(error = %e, "Failed to persist publish state");
        }

        Ok(())
    }

    /// Record a failure, unless the machine already reached a terminal state
    pub async fn fail(&mut self, error: &PublishError) {
        if self.current_state.is_terminal() {
            return;
        }

        let repository_id = error
            .repository_id()
            .or_else(|| self.current_state.repository_id())
            .map(str::to_string);
        let failed = PublishState::Failed {
            repository_id,
            step: error.step(),
            error: error.to_string(),
        };

        if let Err(e) = self.transition(failed).await {
            warn!(error = %e, "Failed to record publish failure");
        }
    }

    pub fn state(&self) -> &PublishState {
        &self.current_state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn state_data(&self) -> PublishStateData {
        PublishStateData {
            current_state: self.current_state.clone(),
            transitions: self.transitions.clone(),
        }
    }

    /// Read previously persisted state data
    pub async fn load(path: &Path) -> Result<PublishStateData, PublishError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| PublishError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        serde_json::from_str(&content).map_err(|e| PublishError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }

    /// Save state to file (atomic operation)
    async fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = &self.state_file_path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.state_data())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        // Atomic write: write to temp file, then rename
        let temp_file = path.with_extension("json.tmp");
        fs::write(&temp_file, json).await?;
        fs::rename(&temp_file, path).await?;

        Ok(())
    }

    /// Elapsed milliseconds between the first and last transition
    pub fn elapsed_millis(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Get transition history as human-readable string
    pub fn history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| format!("{}: {} → {}", t.timestamp.to_rfc3339(), t.from, t.to))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
