pub mod artifactory;
pub mod core;
pub mod security;
pub mod sonatype;

pub use artifactory::ArtifactoryService;
pub use self::core::*;
pub use security::{Credentials, mask_secret};
pub use sonatype::{CancelHandle, CancelSignal, PublishReport, SonatypeService, cancellation};
