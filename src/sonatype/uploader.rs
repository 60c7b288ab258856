//! Artifact discovery and concurrent upload into a staging repository

use crate::core::error::{PublishError, Step};
use crate::core::http::RestClient;
use crate::sonatype::cancel::CancelSignal;
use crate::sonatype::staging::StagingApi;
use regex::Regex;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Build metadata file at the root of the artifact tree, never uploaded
pub const BUILD_INFO_FILE: &str = "build-info.json";

/// A file to upload, addressed by its path relative to the artifact root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    /// Relative path with `/` separators on every platform
    pub relative_path: String,
    pub path: PathBuf,
}

/// Enumerate every regular file under `root` that should be uploaded
///
/// The root-level `build-info.json` is skipped, as is any file whose
/// relative path matches one of the `exclude` patterns. A `build-info.json`
/// below the root is an ordinary artifact. Results are sorted by relative path.
///
/// # Errors
///
/// Returns `PublishError::Io` if the tree cannot be read or a file name is
/// not valid UTF-8.
pub fn collect_artifacts(root: &Path, exclude: &[Regex]) -> Result<Vec<ArtifactFile>, PublishError> {
    let mut artifacts = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| PublishError::Io {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(relative_path) = relative_path(root, entry.path()) else {
            return Err(PublishError::Io {
                path: entry.into_path(),
                source: io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
            });
        };
        if relative_path == BUILD_INFO_FILE {
            continue;
        }
        if let Some(pattern) = exclude.iter().find(|p| p.is_match(&relative_path)) {
            debug!(path = %relative_path, pattern = %pattern, "Excluded artifact");
            continue;
        }

        artifacts.push(ArtifactFile {
            relative_path,
            path: entry.into_path(),
        });
    }

    Ok(artifacts)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let segments = path
        .strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}

/// Uploads artifacts with a bounded pool of workers
///
/// Workers pull from a shared queue. After the first failure, or once the
/// cancel signal fires, no further artifact is started; uploads already done
/// are left in place.
#[derive(Debug, Clone)]
pub struct ArtifactUploader {
    client: Arc<RestClient>,
    threads: usize,
}

impl ArtifactUploader {
    pub fn new(client: Arc<RestClient>, threads: usize) -> Self {
        Self {
            client,
            threads: threads.max(1),
        }
    }

    /// Upload every artifact into `repository_id`, returning the count uploaded
    ///
    /// # Errors
    ///
    /// Returns the first `PublishError::Upload` (or I/O error) encountered,
    /// or `PublishError::Cancelled` when `cancel` stopped the queue early.
    pub async fn upload(
        &self,
        repository_id: &str,
        artifacts: Vec<ArtifactFile>,
        cancel: &CancelSignal,
    ) -> Result<usize, PublishError> {
        let total = artifacts.len();
        let worker_count = self.threads.min(total);
        info!(repository_id, artifacts = total, workers = worker_count, "Uploading artifacts");

        let queue = Arc::new(Mutex::new(VecDeque::from(artifacts)));
        let failed = Arc::new(AtomicBool::new(false));
        let mut workers = JoinSet::new();

        for _ in 0..worker_count {
            let client = Arc::clone(&self.client);
            let queue = Arc::clone(&queue);
            let failed = Arc::clone(&failed);
            let cancel = cancel.clone();
            let repository_id = repository_id.to_string();

            workers.spawn(async move {
                let mut uploaded = 0usize;
                while !failed.load(Ordering::SeqCst) && !cancel.is_cancelled() {
                    let Some(artifact) = queue.lock().await.pop_front() else {
                        break;
                    };
                    if let Err(e) = upload_one(&client, &repository_id, &artifact).await {
                        failed.store(true, Ordering::SeqCst);
                        return Err(e);
                    }
                    uploaded += 1;
                }
                Ok(uploaded)
            });
        }

        let mut uploaded = 0;
        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(count)) => uploaded += count,
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(join_error) => {
                    first_error.get_or_insert(PublishError::Upload {
                        repository_id: repository_id.to_string(),
                        path: String::new(),
                        reason: format!("upload worker failed: {}", join_error),
                    });
                }
            }
        }

        if let Some(e) = first_error {
            warn!(
                repository_id,
                uploaded,
                skipped = total - uploaded,
                "Artifact upload aborted"
            );
            return Err(e);
        }
        if uploaded < total {
            warn!(
                repository_id,
                uploaded,
                skipped = total - uploaded,
                "Artifact upload cancelled"
            );
            return Err(PublishError::Cancelled {
                step: Step::Upload,
                repository_id: Some(repository_id.to_string()),
            });
        }

        info!(repository_id, uploaded, "Uploaded artifacts");
        Ok(uploaded)
    }
}

async fn upload_one(
    client: &RestClient,
    repository_id: &str,
    artifact: &ArtifactFile,
) -> Result<(), PublishError> {
    let bytes = tokio::fs::read(&artifact.path)
        .await
        .map_err(|source| PublishError::Io {
            path: artifact.path.clone(),
            source,
        })?;

    let upload_error = |reason: String| PublishError::Upload {
        repository_id: repository_id.to_string(),
        path: artifact.relative_path.clone(),
        reason,
    };

    let url = client.segment_url(
        &StagingApi::upload_base(repository_id),
        artifact.relative_path.split('/'),
    )?;
    let response = client
        .put_bytes(url, bytes)
        .await
        .map_err(|e| upload_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(upload_error(format!("HTTP {}", status)));
    }

    debug!(repository_id, path = %artifact.relative_path, "Uploaded artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonatype::cancel::cancellation;
    use crate::sonatype::fixtures;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn uploader(server: &MockServer, threads: usize) -> ArtifactUploader {
        let client = RestClient::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        ArtifactUploader::new(Arc::new(client), threads)
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collect_skips_root_build_info() {
        let root = fixtures::artifact_tree();

        let artifacts = collect_artifacts(root.path(), &[]).unwrap();

        assert_eq!(artifacts.len(), fixtures::ARTIFACT_COUNT);
        assert!(artifacts.iter().all(|a| a.relative_path != BUILD_INFO_FILE));
        assert!(artifacts.iter().all(|a| !a.relative_path.contains('\\')));
    }

    #[test]
    fn test_collect_keeps_nested_build_info() {
        // Only the root-level build-info.json is metadata; nested copies upload
        let root = TempDir::new().unwrap();
        write(root.path(), "build-info.json", "{}");
        write(root.path(), "org/example/docs/1.0/build-info.json", "{}");

        let artifacts = collect_artifacts(root.path(), &[]).unwrap();

        assert_eq!(
            artifacts
                .iter()
                .map(|a| a.relative_path.as_str())
                .collect::<Vec<_>>(),
            vec!["org/example/docs/1.0/build-info.json"]
        );
    }

    #[test]
    fn test_collect_applies_exclude_patterns() {
        let root = TempDir::new().unwrap();
        write(root.path(), "org/example/a/1.0/a-1.0.jar", "jar");
        write(root.path(), "org/example/a/1.0/a-1.0-dist.zip", "zip");

        let exclude = vec![Regex::new(r".*\.zip$").unwrap()];
        let artifacts = collect_artifacts(root.path(), &exclude).unwrap();

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].relative_path, "org/example/a/1.0/a-1.0.jar");
    }

    #[test]
    fn test_collect_missing_root_is_io_error() {
        let root = TempDir::new().unwrap();
        let err = collect_artifacts(&root.path().join("missing"), &[]).unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_collect_rejects_non_utf8_file_name() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = TempDir::new().unwrap();
        write(root.path(), "org/example/a/1.0/a-1.0.jar", "jar");
        let dir = root.path().join("org/example/a/1.0");
        fs::write(dir.join(OsStr::from_bytes(b"a-1.0-\xff.jar")), "jar").unwrap();

        let err = collect_artifacts(root.path(), &[]).unwrap_err();

        match err {
            PublishError::Io { path, source } => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
                assert!(path.starts_with(&dir));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_encodes_reserved_characters_in_file_names() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        write(root.path(), "org/example/a/1.0/a-1.0#dist.jar", "jar");
        write(root.path(), "org/example/a/1.0/a-1.0?100%.pom", "pom");
        let artifacts = collect_artifacts(root.path(), &[]).unwrap();

        uploader(&server, 1)
            .upload("example-6789", artifacts, &CancelSignal::never())
            .await
            .unwrap();

        let paths: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        assert_eq!(
            paths,
            vec![
                "/service/local/staging/deployByRepositoryId/example-6789/org/example/a/1.0/a-1.0%23dist.jar",
                "/service/local/staging/deployByRepositoryId/example-6789/org/example/a/1.0/a-1.0%3F100%25.pom",
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_upload_starts_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let root = fixtures::artifact_tree();
        let artifacts = collect_artifacts(root.path(), &[]).unwrap();
        let (handle, signal) = cancellation();
        handle.cancel();

        let err = uploader(&server, 4)
            .upload("example-6789", artifacts, &signal)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "CANCELLED");
        assert_eq!(err.step(), Some(Step::Upload));
        assert_eq!(err.repository_id(), Some("example-6789"));
    }

    #[tokio::test]
    async fn test_upload_puts_every_artifact_once() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(
                r"^/service/local/staging/deployByRepositoryId/example-6789/org/example/.+",
            ))
            .respond_with(ResponseTemplate::new(201))
            .expect(fixtures::ARTIFACT_COUNT as u64)
            .mount(&server)
            .await;

        let root = fixtures::artifact_tree();
        let artifacts = collect_artifacts(root.path(), &[]).unwrap();
        let uploaded = uploader(&server, 8)
            .upload("example-6789", artifacts, &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(uploaded, fixtures::ARTIFACT_COUNT);
        let mut paths: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), fixtures::ARTIFACT_COUNT);
    }

    #[tokio::test]
    async fn test_upload_sends_file_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(
                "/service/local/staging/deployByRepositoryId/example-6789/org/example/a/1.0/a-1.0.pom",
            ))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        write(root.path(), "org/example/a/1.0/a-1.0.pom", "<project/>");
        let artifacts = collect_artifacts(root.path(), &[]).unwrap();

        uploader(&server, 2)
            .upload("example-6789", artifacts, &CancelSignal::never())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].body, b"<project/>".to_vec());
    }

    #[tokio::test]
    async fn test_upload_failure_reports_path_and_stops_queue() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r".*/a-1\.0\.jar$"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        write(root.path(), "org/example/a/1.0/a-1.0.jar", "jar");
        for i in 0..20 {
            write(root.path(), &format!("org/example/z/1.0/z-{i}.pom"), "pom");
        }
        let artifacts = collect_artifacts(root.path(), &[]).unwrap();

        let err = uploader(&server, 1)
            .upload("example-6789", artifacts, &CancelSignal::never())
            .await
            .unwrap_err();

        match err {
            PublishError::Upload {
                repository_id,
                path,
                reason,
            } => {
                assert_eq!(repository_id, "example-6789");
                assert_eq!(path, "org/example/a/1.0/a-1.0.jar");
                assert!(reason.contains("400"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Sorted order puts the failing jar first; a single worker stops there
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_of_nothing_succeeds() {
        let server = MockServer::start().await;
        let uploaded = uploader(&server, 4)
            .upload("example-6789", Vec::new(), &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(uploaded, 0);
    }
}
