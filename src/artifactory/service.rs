//! Idempotent build promotion in Artifactory

use crate::artifactory::payload::PromotionRequest;
use crate::core::config::ArtifactoryConfig;
use crate::core::error::{PublishError, Step};
use crate::core::http::RestClient;
use crate::core::release::{BuildInfoResponse, ReleaseInfo};
use crate::security::Credentials;
use tracing::{debug, info};

#[derive(Debug)]
pub struct ArtifactoryService {
    client: RestClient,
    staging_repo: String,
}

impl ArtifactoryService {
    pub fn new(config: &ArtifactoryConfig) -> Result<Self, PublishError> {
        let credentials =
            Credentials::from_parts(config.username.as_deref(), config.password.as_ref());

        Ok(Self {
            client: RestClient::new(config.url(), credentials, config.request_timeout())?,
            staging_repo: config.staging_repo().to_string(),
        })
    }

    /// Move the release's build from the staging repository to `target_repo`
    ///
    /// A client error is accepted when the build already sits in `target_repo`,
    /// so promoting twice succeeds.
    pub async fn promote(&self, target_repo: &str, release: &ReleaseInfo) -> Result<(), PublishError> {
        let request = PromotionRequest::staged(&self.staging_repo, target_repo);
        let build = format!("{}/{}", release.build_name, release.build_number);
        info!(build = %build, target_repo, "Promoting build");

        let result = self
            .client
            .post_json(
                &format!("/api/build/promote/{build}"),
                &request,
                Step::BuildPromotion,
                None,
            )
            .await;

        match result {
            Ok(_) => {
                debug!(build = %build, "Promotion complete");
                Ok(())
            }
            Err(e) if is_client_error(&e) => {
                if self.is_already_promoted(&build, target_repo).await? {
                    info!(build = %build, target_repo, "Already promoted");
                    Ok(())
                } else {
                    info!(build = %build, "Promotion failed");
                    Err(e)
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn is_already_promoted(&self, build: &str, target_repo: &str) -> Result<bool, PublishError> {
        debug!(build, "Checking if already promoted");
        let response = self
            .client
            .get_json::<BuildInfoResponse>(&format!("/api/build/{build}"), Step::BuildLookup, None)
            .await;

        let build_info = match response {
            Ok(response) => response.build_info,
            Err(e) if is_client_error(&e) => {
                debug!(build, "Client error, assuming not promoted");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        match build_info.statuses.as_deref().and_then(<[_]>::first) {
            Some(status) => {
                debug!(
                    repository = %status.repository,
                    expected = target_repo,
                    "Found build status"
                );
                Ok(status.repository == target_repo)
            }
            None => {
                debug!(build, "Missing build statuses, not promoted");
                Ok(false)
            }
        }
    }
}

fn is_client_error(error: &PublishError) -> bool {
    matches!(error, PublishError::UnexpectedStatus { status, .. } if (400..500).contains(status))
}
