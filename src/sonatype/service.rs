//! Staging publish workflow against a Nexus repository manager
//!
//! Sequences profile resolution, repository open, artifact upload, close,
//! close validation polling and promotion. The first failing step ends the
//! publish; nothing is rolled back, so an opened staging repository stays in
//! place and its id is logged for manual cleanup.

use crate::core::config::SonatypeConfig;
use crate::core::error::{PublishError, Step};
use crate::core::http::RestClient;
use crate::core::release::ReleaseInfo;
use crate::core::state_machine::{
    CloseOutcome, PublishState, PublishStateMachine, StateTransition,
};
use crate::security::Credentials;
use crate::sonatype::cancel::CancelSignal;
use crate::sonatype::checksum::ChecksumChecker;
use crate::sonatype::poller::ClosePoller;
use crate::sonatype::staging::StagingApi;
use crate::sonatype::uploader::{ArtifactUploader, collect_artifacts};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Outcome of a successful publish
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub profile_id: String,
    pub repository_id: String,
    pub artifacts: usize,
    pub duration: Duration,
    pub transitions: Vec<StateTransition>,
}

#[derive(Debug)]
pub struct SonatypeService {
    api: StagingApi,
    uploader: ArtifactUploader,
    poller: ClosePoller,
    checksums: ChecksumChecker,
    staging_profile: Option<String>,
    staging_profile_id: Option<String>,
    exclude: Vec<Regex>,
    state_file: Option<PathBuf>,
}

impl SonatypeService {
    /// Create a service from the `sonatype` configuration section
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Config` for an invalid exclude pattern or when
    /// the HTTP client cannot be built.
    pub fn new(config: &SonatypeConfig, state_file: Option<&Path>) -> Result<Self, PublishError> {
        let credentials =
            Credentials::from_parts(config.username.as_deref(), config.password.as_ref());
        let client = Arc::new(RestClient::new(
            config.url(),
            credentials,
            config.request_timeout(),
        )?);

        let exclude = config
            .exclude
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    PublishError::Config(format!("Invalid exclude pattern '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let api = StagingApi::new(Arc::clone(&client));

        Ok(Self {
            uploader: ArtifactUploader::new(Arc::clone(&client), config.upload_threads()),
            poller: ClosePoller::new(
                api.clone(),
                config.polling_interval(),
                config.max_polls(),
                config.poll_retries(),
            ),
            checksums: ChecksumChecker::new(client),
            api,
            staging_profile: config.staging_profile.clone(),
            staging_profile_id: config.staging_profile_id.clone(),
            exclude,
            state_file: state_file.map(Path::to_path_buf),
        })
    }

    /// Whether the release's marker artifact is already in the release repository
    pub async fn artifacts_published(&self, release: &ReleaseInfo) -> bool {
        self.checksums.is_published(&release.marker_artifact).await
    }

    /// Publish every artifact under `artifact_root` and release them
    pub async fn publish(
        &self,
        release: &ReleaseInfo,
        artifact_root: &Path,
    ) -> Result<PublishReport, PublishError> {
        self.publish_with_cancellation(release, artifact_root, CancelSignal::never())
            .await
    }

    /// Like [`publish`](Self::publish), stopping at the next step boundary when `cancel` fires
    ///
    /// Cancellation is observed before the repository is opened, between
    /// uploads, before the close request, during the close wait and before
    /// promotion. Remote state already applied is left in place.
    pub async fn publish_with_cancellation(
        &self,
        release: &ReleaseInfo,
        artifact_root: &Path,
        mut cancel: CancelSignal,
    ) -> Result<PublishReport, PublishError> {
        let mut state = match &self.state_file {
            Some(path) => PublishStateMachine::with_state_file(path),
            None => PublishStateMachine::new(),
        };

        let result = self
            .run(release, artifact_root, &mut cancel, &mut state)
            .await;

        if let Err(e) = &result {
            match e.repository_id().or_else(|| state.state().repository_id()) {
                Some(repository_id) => error!(
                    repository_id,
                    step = ?e.step(),
                    error = %e,
                    "Publish failed, staging repository left in place"
                ),
                None => error!(step = ?e.step(), error = %e, "Publish failed"),
            }
            state.fail(e).await;
        }

        result
    }

    async fn run(
        &self,
        release: &ReleaseInfo,
        artifact_root: &Path,
        cancel: &mut CancelSignal,
        state: &mut PublishStateMachine,
    ) -> Result<PublishReport, PublishError> {
        let started = Instant::now();
        let artifacts = collect_artifacts(artifact_root, &self.exclude)?;

        let profile_id = self.profile_id(release).await?;
        let description = release.staging_description();
        ensure_not_cancelled(cancel, Step::Open, None)?;
        let repository_id = self.api.open_repository(&profile_id, &description).await?;
        state
            .transition(PublishState::Opened {
                profile_id: profile_id.clone(),
                repository_id: repository_id.clone(),
            })
            .await?;

        let uploaded = self.uploader.upload(&repository_id, artifacts, cancel).await?;
        state
            .transition(PublishState::Uploaded {
                repository_id: repository_id.clone(),
                artifacts: uploaded,
            })
            .await?;

        ensure_not_cancelled(cancel, Step::Close, Some(&repository_id))?;
        self.api
            .close_repository(&profile_id, &repository_id, &description)
            .await?;
        match self.poller.wait_for_close(&repository_id, cancel).await {
            Ok(()) => {}
            Err(e @ PublishError::CloseRejected { .. }) => {
                state
                    .transition(PublishState::Closed {
                        repository_id: repository_id.clone(),
                        outcome: CloseOutcome::Failure,
                    })
                    .await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        }
        state
            .transition(PublishState::Closed {
                repository_id: repository_id.clone(),
                outcome: CloseOutcome::Success,
            })
            .await?;

        ensure_not_cancelled(cancel, Step::Promote, Some(&repository_id))?;
        self.api
            .promote(&repository_id, &release.release_description())
            .await?;
        state
            .transition(PublishState::Promoted {
                repository_id: repository_id.clone(),
            })
            .await?;

        info!(
            repository_id = %repository_id,
            artifacts = uploaded,
            "Published {}",
            release.marker_artifact
        );

        Ok(PublishReport {
            profile_id,
            repository_id,
            artifacts: uploaded,
            duration: started.elapsed(),
            transitions: state.transitions().to_vec(),
        })
    }

    async fn profile_id(&self, release: &ReleaseInfo) -> Result<String, PublishError> {
        if let Some(id) = &self.staging_profile_id {
            return Ok(id.clone());
        }
        let group_id = self.staging_profile.as_deref().unwrap_or(&release.group_id);
        self.api.resolve_profile_id(group_id).await
    }
}

fn ensure_not_cancelled(
    cancel: &CancelSignal,
    step: Step,
    repository_id: Option<&str>,
) -> Result<(), PublishError> {
    if cancel.is_cancelled() {
        info!(%step, repository_id, "Publish cancelled");
        return Err(PublishError::Cancelled {
            step,
            repository_id: repository_id.map(str::to_string),
        });
    }
    Ok(())
}
