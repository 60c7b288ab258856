//! Advisory check whether a release already reached the release repository

use crate::core::http::RestClient;
use crate::core::release::MarkerArtifact;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

const RELEASES_CONTENT_PATH: &str = "/service/local/repositories/releases/content";

#[derive(Debug, Clone)]
pub struct ChecksumChecker {
    client: Arc<RestClient>,
}

impl ChecksumChecker {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    /// Path of the marker artifact's `.jar.sha1` in the release repository
    pub fn checksum_path(marker: &MarkerArtifact) -> String {
        format!(
            "{}/{}/{}/{}/{}-{}.jar.sha1",
            RELEASES_CONTENT_PATH,
            marker.group_path(),
            marker.artifact_id,
            marker.version,
            marker.artifact_id,
            marker.version
        )
    }

    /// Whether the marker artifact's checksum is present
    ///
    /// Never fails: any error reads as "not published" so a publish can
    /// always be retried.
    pub async fn is_published(&self, marker: &MarkerArtifact) -> bool {
        let path = Self::checksum_path(marker);
        match self.client.get(&path).await {
            Ok(response) if response.status().is_success() => {
                info!(artifact = %marker, "Release already published");
                true
            }
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                debug!(artifact = %marker, "Release not yet published");
                false
            }
            Ok(response) => {
                warn!(
                    artifact = %marker,
                    status = %response.status(),
                    "Unexpected response checking published checksum, assuming not published"
                );
                false
            }
            Err(e) => {
                warn!(
                    artifact = %marker,
                    error = %e,
                    "Failed to check published checksum, assuming not published"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SHA1_PATH: &str =
        "/service/local/repositories/releases/content/org/example/demo/1.1.0/demo-1.1.0.jar.sha1";

    fn marker() -> MarkerArtifact {
        MarkerArtifact::from_coordinates("org.example:demo:1.1.0").unwrap()
    }

    async fn check_with(status: u16) -> bool {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SHA1_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string("ce8d8b6838ecceb68962b975b18682f4237ccf71"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RestClient::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        ChecksumChecker::new(Arc::new(client)).is_published(&marker()).await
    }

    #[test]
    fn test_checksum_path() {
        assert_eq!(ChecksumChecker::checksum_path(&marker()), SHA1_PATH);
    }

    #[tokio::test]
    async fn test_published_when_checksum_exists() {
        assert!(check_with(200).await);
    }

    #[tokio::test]
    async fn test_not_published_when_checksum_missing() {
        assert!(!check_with(404).await);
    }

    #[tokio::test]
    async fn test_server_error_is_not_published() {
        assert!(!check_with(500).await);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_not_published() {
        let client =
            RestClient::new("http://127.0.0.1:1", None, Duration::from_millis(500)).unwrap();
        assert!(!ChecksumChecker::new(Arc::new(client)).is_published(&marker()).await);
    }
}
