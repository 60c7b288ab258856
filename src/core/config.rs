//! Configuration structures and types for release-publisher
//!
//! This module provides type-safe configuration management with serde support.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SONATYPE_URL: &str = "https://s01.oss.sonatype.org";
pub const DEFAULT_ARTIFACTORY_URL: &str = "https://repo.spring.io";
pub const DEFAULT_STAGING_REPO: &str = "libs-staging-local";
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_MAX_POLLS: u32 = 240;
pub const DEFAULT_POLL_RETRIES: u32 = 3;
pub const DEFAULT_UPLOAD_THREADS: usize = 8;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Root configuration object
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseConfig {
    /// Sonatype (Nexus staging) settings
    #[serde(default)]
    pub sonatype: SonatypeConfig,

    /// Artifactory build promotion settings
    #[serde(default)]
    pub artifactory: ArtifactoryConfig,

    /// Where to persist the publish state machine (optional)
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

/// Nexus staging settings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonatypeConfig {
    /// Repository manager base URL (default: s01.oss.sonatype.org)
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    /// Group identifier used to look up the staging profile
    /// (default: the release's group id)
    #[serde(default)]
    pub staging_profile: Option<String>,

    /// Staging profile id, skips the profile lookup when set
    #[serde(default)]
    pub staging_profile_id: Option<String>,

    /// Delay between status polls while the repository is closing
    #[serde(default)]
    pub polling_interval_secs: Option<u64>,

    /// Maximum number of status polls before giving up
    #[serde(default)]
    pub max_polls: Option<u32>,

    /// Attempts per status poll when the read fails transiently
    #[serde(default)]
    pub poll_retries: Option<u32>,

    /// Number of concurrent artifact uploads
    #[serde(default)]
    pub upload_threads: Option<usize>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Regular expressions of artifact paths that are never uploaded
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl SonatypeConfig {
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_SONATYPE_URL)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(
            self.polling_interval_secs
                .unwrap_or(DEFAULT_POLLING_INTERVAL_SECS),
        )
    }

    pub fn max_polls(&self) -> u32 {
        self.max_polls.unwrap_or(DEFAULT_MAX_POLLS)
    }

    pub fn poll_retries(&self) -> u32 {
        self.poll_retries.unwrap_or(DEFAULT_POLL_RETRIES)
    }

    pub fn upload_threads(&self) -> usize {
        self.upload_threads.unwrap_or(DEFAULT_UPLOAD_THREADS)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

/// Artifactory settings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactoryConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    /// Repository builds are promoted from (default: libs-staging-local)
    #[serde(default)]
    pub staging_repo: Option<String>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ArtifactoryConfig {
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_ARTIFACTORY_URL)
    }

    pub fn staging_repo(&self) -> &str {
        self.staging_repo.as_deref().unwrap_or(DEFAULT_STAGING_REPO)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|v| SecretString::new(v.into())))
}
