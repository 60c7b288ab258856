//! Calls against the Nexus staging endpoints
//!
//! Each method is a single request; sequencing lives in [`SonatypeService`].
//!
//! [`SonatypeService`]: crate::sonatype::SonatypeService

use crate::core::error::{PublishError, Step};
use crate::core::http::{RestClient, transport};
use crate::sonatype::payload::{
    Activity, Data, FinishRequest, PromoteRequest, RepositoryStatus, StagedRepository,
    StagingProfile, StartRequest,
};
use std::sync::Arc;
use tracing::{debug, info};

const STAGING_PATH: &str = "/service/local/staging";

/// Staging API bound to one repository manager
#[derive(Debug, Clone)]
pub struct StagingApi {
    client: Arc<RestClient>,
}

impl StagingApi {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<RestClient> {
        &self.client
    }

    /// Resolve `group_id` to the id of the only staging profile publishing it
    ///
    /// # Errors
    ///
    /// Returns `PublishError::ProfileResolution` when zero or several profiles match.
    pub async fn resolve_profile_id(&self, group_id: &str) -> Result<String, PublishError> {
        let profiles: Data<Vec<StagingProfile>> = self
            .client
            .get_json(&format!("{STAGING_PATH}/profiles"), Step::ResolveProfile, None)
            .await?;

        let mut matches = profiles
            .data
            .into_iter()
            .filter(|profile| profile.publishes(group_id));

        match (matches.next(), matches.next()) {
            (Some(profile), None) => {
                debug!(group_id, profile_id = %profile.id, "Resolved staging profile");
                Ok(profile.id)
            }
            (None, _) => Err(PublishError::ProfileResolution {
                group_id: group_id.to_string(),
                matches: 0,
            }),
            (Some(_), Some(_)) => Err(PublishError::ProfileResolution {
                group_id: group_id.to_string(),
                matches: 2 + matches.count(),
            }),
        }
    }

    /// Start a staging repository under `profile_id` and return its id
    pub async fn open_repository(
        &self,
        profile_id: &str,
        description: &str,
    ) -> Result<String, PublishError> {
        let response = self
            .client
            .post_json(
                &format!("{STAGING_PATH}/profiles/{profile_id}/start"),
                &Data::new(StartRequest { description }),
                Step::Open,
                None,
            )
            .await?;

        let repository: Data<StagedRepository> = response
            .json()
            .await
            .map_err(|source| transport(Step::Open, None, source))?;

        let repository_id = repository.data.staged_repository_id;
        info!(profile_id, repository_id = %repository_id, "Opened staging repository");
        Ok(repository_id)
    }

    /// Request the close of a staging repository
    ///
    /// This only starts the remote validation; its outcome is read by polling.
    pub async fn close_repository(
        &self,
        profile_id: &str,
        repository_id: &str,
        description: &str,
    ) -> Result<(), PublishError> {
        self.client
            .post_json(
                &format!("{STAGING_PATH}/profiles/{profile_id}/finish"),
                &Data::new(FinishRequest {
                    staged_repository_id: repository_id,
                    description,
                }),
                Step::Close,
                Some(repository_id),
            )
            .await?;

        info!(repository_id, "Requested close of staging repository");
        Ok(())
    }

    pub async fn repository_status(
        &self,
        repository_id: &str,
    ) -> Result<RepositoryStatus, PublishError> {
        self.client
            .get_json(
                &format!("{STAGING_PATH}/repository/{repository_id}"),
                Step::Poll,
                Some(repository_id),
            )
            .await
    }

    pub async fn activity(&self, repository_id: &str) -> Result<Vec<Activity>, PublishError> {
        self.client
            .get_json(
                &format!("{STAGING_PATH}/repository/{repository_id}/activity"),
                Step::Activity,
                Some(repository_id),
            )
            .await
    }

    /// Release a closed staging repository, dropping it once released
    ///
    /// # Errors
    ///
    /// Any failure is returned as `PublishError::Promotion` and never retried.
    pub async fn promote(&self, repository_id: &str, description: &str) -> Result<(), PublishError> {
        let body = Data::new(PromoteRequest {
            description,
            auto_drop_after_release: true,
            staged_repository_ids: vec![repository_id],
        });

        self.client
            .post_json(
                &format!("{STAGING_PATH}/bulk/promote"),
                &body,
                Step::Promote,
                Some(repository_id),
            )
            .await
            .map_err(|e| PublishError::Promotion {
                repository_id: repository_id.to_string(),
                reason: e.to_string(),
            })?;

        info!(repository_id, "Promoted staging repository");
        Ok(())
    }

    /// Path under which the artifacts of `repository_id` are uploaded
    ///
    /// Artifact paths are appended as encoded segments, see
    /// [`RestClient::segment_url`].
    pub fn upload_base(repository_id: &str) -> String {
        format!("{STAGING_PATH}/deployByRepositoryId/{repository_id}")
    }
}
