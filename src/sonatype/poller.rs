//! Waits for the asynchronous close validation of a staging repository

use crate::core::error::{PublishError, Step};
use crate::core::retry::{RetryManager, RetryOptions};
use crate::sonatype::cancel::CancelSignal;
use crate::sonatype::payload::{CloseProgress, rule_failures};
use crate::sonatype::staging::StagingApi;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Polls repository status until the close validation settles
#[derive(Debug, Clone)]
pub struct ClosePoller {
    api: StagingApi,
    interval: Duration,
    max_polls: u32,
    retry: RetryManager,
}

impl ClosePoller {
    /// Create a poller
    ///
    /// Each status read is attempted up to `poll_retries` times when it
    /// fails transiently.
    pub fn new(api: StagingApi, interval: Duration, max_polls: u32, poll_retries: u32) -> Self {
        let retry = RetryManager::new(RetryOptions {
            max_attempts: poll_retries,
            initial_delay: interval.min(Duration::from_secs(1)),
            ..RetryOptions::default()
        });

        Self {
            api,
            interval,
            max_polls: max_polls.max(1),
            retry,
        }
    }

    /// Wait until `repository_id` is closed
    ///
    /// # Errors
    ///
    /// - `PublishError::CloseRejected` when validation finished with the repository still open
    /// - `PublishError::CloseTimeout` for any other status, or when polls run out
    /// - `PublishError::Cancelled` when `cancel` fires while waiting
    /// - the status read error once retries are exhausted
    pub async fn wait_for_close(
        &self,
        repository_id: &str,
        cancel: &mut CancelSignal,
    ) -> Result<(), PublishError> {
        for poll in 1..=self.max_polls {
            if cancel.is_cancelled() {
                return Err(cancelled(repository_id));
            }

            let status = self
                .retry
                .retry_if(
                    || self.api.repository_status(repository_id),
                    PublishError::is_transient,
                )
                .await?;

            match status.progress() {
                CloseProgress::Validating => {
                    debug!(repository_id, poll, "Staging repository still transitioning");
                    if poll == self.max_polls {
                        break;
                    }
                    tokio::select! {
                        _ = sleep(self.interval) => {}
                        _ = cancel.cancelled() => return Err(cancelled(repository_id)),
                    }
                }
                CloseProgress::Closed => {
                    info!(repository_id, polls = poll, "Staging repository closed");
                    return Ok(());
                }
                CloseProgress::Rejected => {
                    return Err(self.rejected(repository_id).await);
                }
                CloseProgress::Unexpected => {
                    return Err(PublishError::CloseTimeout {
                        repository_id: repository_id.to_string(),
                        reason: format!(
                            "unexpected status type={} transitioning={}",
                            status.kind, status.transitioning
                        ),
                    });
                }
            }
        }

        Err(PublishError::CloseTimeout {
            repository_id: repository_id.to_string(),
            reason: format!("still transitioning after {} polls", self.max_polls),
        })
    }

    async fn rejected(&self, repository_id: &str) -> PublishError {
        let diagnostics = match self.api.activity(repository_id).await {
            Ok(activities) => rule_failures(&activities),
            Err(e) => {
                warn!(repository_id, error = %e, "Failed to fetch staging activity");
                Vec::new()
            }
        };

        for message in &diagnostics {
            error!(repository_id, "Rule failed: {}", message);
        }

        PublishError::CloseRejected {
            repository_id: repository_id.to_string(),
            diagnostics,
        }
    }
}

fn cancelled(repository_id: &str) -> PublishError {
    PublishError::Cancelled {
        step: Step::Poll,
        repository_id: Some(repository_id.to_string()),
    }
}
