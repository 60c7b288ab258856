//! Release description derived from a build-info document

use crate::core::error::PublishError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::fs;

/// Artifact used as a proxy to check whether a release has already been published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl MarkerArtifact {
    /// Parse `group:artifact:version` coordinates
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::core::MarkerArtifact;
    ///
    /// let marker = MarkerArtifact::from_coordinates("org.example:demo:1.0.0").unwrap();
    /// assert_eq!(marker.group_path(), "org/example");
    /// ```
    pub fn from_coordinates(coordinates: &str) -> Result<Self, PublishError> {
        let parts: Vec<&str> = coordinates.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [group_id, artifact_id, version]
                if !group_id.is_empty() && !artifact_id.is_empty() && !version.is_empty() =>
            {
                Ok(Self {
                    group_id: group_id.to_string(),
                    artifact_id: artifact_id.to_string(),
                    version: version.to_string(),
                })
            }
            _ => Err(PublishError::ReleaseInfo(format!(
                "'{}' is not a group:artifact:version coordinate",
                coordinates
            ))),
        }
    }

    /// Group id as a repository path (`org.example` becomes `org/example`)
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }
}

impl fmt::Display for MarkerArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Immutable description of one release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub build_name: String,
    pub build_number: String,
    pub version: String,
    pub group_id: String,
    pub marker_artifact: MarkerArtifact,
}

impl ReleaseInfo {
    /// Build release information from an Artifactory build-info document
    ///
    /// Group id, version and marker artifact come from the first module.
    pub fn from_build_info(build_info: &BuildInfo) -> Result<Self, PublishError> {
        let module = build_info.modules.first().ok_or_else(|| {
            PublishError::ReleaseInfo(format!(
                "build {}/{} lists no modules",
                build_info.name, build_info.number
            ))
        })?;
        let marker_artifact = MarkerArtifact::from_coordinates(&module.id)?;

        Ok(Self {
            build_name: build_info.name.clone(),
            build_number: build_info.number.clone(),
            version: marker_artifact.version.clone(),
            group_id: marker_artifact.group_id.clone(),
            marker_artifact,
        })
    }

    /// Load release information from a `build-info.json` file
    pub async fn load(path: &Path) -> Result<Self, PublishError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| PublishError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let document: BuildInfoDocument = serde_json::from_str(&content).map_err(|e| {
            PublishError::ReleaseInfo(format!("{} is not a build-info document: {}", path.display(), e))
        })?;

        Self::from_build_info(document.build_info())
    }

    /// Description attached to the staging repository when it is opened and closed
    pub fn staging_description(&self) -> String {
        self.build_number.clone()
    }

    /// Description attached to the bulk promotion request
    pub fn release_description(&self) -> String {
        format!("Releasing {}", self.build_number)
    }
}

/// Build status entry recorded by Artifactory promotions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatus {
    #[serde(default)]
    pub status: Option<String>,
    pub repository: String,
}

/// Module entry of a build-info document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildModule {
    pub id: String,
}

/// Build information as published by Artifactory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub name: String,
    pub number: String,
    #[serde(default)]
    pub modules: Vec<BuildModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<BuildStatus>>,
}

/// Response wrapper of the Artifactory build-info endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfoResponse {
    pub build_info: BuildInfo,
}

/// A build-info file, either wrapped like the API response or bare
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BuildInfoDocument {
    Wrapped(BuildInfoResponse),
    Bare(BuildInfo),
}

impl BuildInfoDocument {
    fn build_info(&self) -> &BuildInfo {
        match self {
            BuildInfoDocument::Wrapped(response) => &response.build_info,
            BuildInfoDocument::Bare(info) => info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn build_info(modules: &[&str]) -> BuildInfo {
        BuildInfo {
            name: "example-build".to_string(),
            number: "example-build-1".to_string(),
            modules: modules
                .iter()
                .map(|id| BuildModule { id: id.to_string() })
                .collect(),
            statuses: None,
        }
    }

    #[test]
    fn test_marker_from_coordinates() {
        let marker =
            MarkerArtifact::from_coordinates("org.example.test:test-artifact:1.1.0.RELEASE")
                .unwrap();

        assert_eq!(marker.group_id, "org.example.test");
        assert_eq!(marker.artifact_id, "test-artifact");
        assert_eq!(marker.version, "1.1.0.RELEASE");
        assert_eq!(marker.group_path(), "org/example/test");
        assert_eq!(
            marker.to_string(),
            "org.example.test:test-artifact:1.1.0.RELEASE"
        );
    }

    #[test]
    fn test_marker_rejects_malformed_coordinates() {
        assert!(MarkerArtifact::from_coordinates("org.example:artifact").is_err());
        assert!(MarkerArtifact::from_coordinates("org.example::1.0").is_err());
        assert!(MarkerArtifact::from_coordinates("a:b:c:d").is_err());
    }

    #[test]
    fn test_release_info_from_first_module() {
        let info = build_info(&[
            "org.example.test:test-artifact:1.1.0.RELEASE",
            "org.example.test:other:1.1.0.RELEASE",
        ]);

        let release = ReleaseInfo::from_build_info(&info).unwrap();

        assert_eq!(release.build_name, "example-build");
        assert_eq!(release.build_number, "example-build-1");
        assert_eq!(release.version, "1.1.0.RELEASE");
        assert_eq!(release.group_id, "org.example.test");
        assert_eq!(release.marker_artifact.artifact_id, "test-artifact");
        assert_eq!(release.staging_description(), "example-build-1");
        assert_eq!(release.release_description(), "Releasing example-build-1");
    }

    #[test]
    fn test_release_info_requires_modules() {
        let err = ReleaseInfo::from_build_info(&build_info(&[])).unwrap_err();
        assert_eq!(err.code(), "INVALID_RELEASE_INFO");
    }

    #[tokio::test]
    async fn test_load_wrapped_and_bare_documents() {
        let temp_dir = TempDir::new().unwrap();
        let wrapped = temp_dir.path().join("wrapped.json");
        let bare = temp_dir.path().join("bare.json");
        std::fs::write(
            &wrapped,
            r#"{"buildInfo":{"name":"example-build","number":"7","modules":[{"id":"org.example:core:2.0.0"}]}}"#,
        )
        .unwrap();
        std::fs::write(
            &bare,
            r#"{"name":"example-build","number":"8","modules":[{"id":"org.example:core:2.0.1"}]}"#,
        )
        .unwrap();

        let from_wrapped = ReleaseInfo::load(&wrapped).await.unwrap();
        let from_bare = ReleaseInfo::load(&bare).await.unwrap();

        assert_eq!(from_wrapped.build_number, "7");
        assert_eq!(from_wrapped.version, "2.0.0");
        assert_eq!(from_bare.build_number, "8");
        assert_eq!(from_bare.version, "2.0.1");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = ReleaseInfo::load(&temp_dir.path().join("missing.json"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
