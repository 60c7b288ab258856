//! Publishing to Maven Central through a Nexus staging repository

pub mod cancel;
pub mod checksum;
pub mod payload;
pub mod poller;
pub mod service;
pub mod staging;
pub mod uploader;

pub use cancel::{CancelHandle, CancelSignal, cancellation};
pub use checksum::ChecksumChecker;
pub use poller::ClosePoller;
pub use service::{PublishReport, SonatypeService};
pub use staging::StagingApi;
pub use uploader::{ArtifactFile, ArtifactUploader, collect_artifacts};

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::core::release::{MarkerArtifact, ReleaseInfo};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Uploadable files in [`artifact_tree`]
    pub const ARTIFACT_COUNT: usize = 150;

    pub fn release() -> ReleaseInfo {
        ReleaseInfo {
            build_name: "example-build".to_string(),
            build_number: "example-build-1".to_string(),
            version: "1.1.0".to_string(),
            group_id: "org.example".to_string(),
            marker_artifact: MarkerArtifact::from_coordinates("org.example:demo:1.1.0").unwrap(),
        }
    }

    /// Artifact tree of 49 modules (jar, pom, signature each), a bom with its
    /// signature, a nested `build-info.json` and the root `build-info.json`
    pub fn artifact_tree() -> TempDir {
        let root = TempDir::new().unwrap();

        for i in 0..49 {
            let dir = format!("org/example/module-{i}/1.1.0");
            write(root.path(), &format!("{dir}/module-{i}-1.1.0.jar"));
            write(root.path(), &format!("{dir}/module-{i}-1.1.0.pom"));
            write(root.path(), &format!("{dir}/module-{i}-1.1.0.jar.asc"));
        }
        write(root.path(), "org/example/demo-bom/1.1.0/demo-bom-1.1.0.pom");
        write(root.path(), "org/example/demo-bom/1.1.0/demo-bom-1.1.0.pom.asc");
        write(root.path(), "org/example/demo-docs/1.1.0/build-info.json");
        write(root.path(), "build-info.json");

        root
    }

    fn write(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, relative.as_bytes()).unwrap();
    }
}
