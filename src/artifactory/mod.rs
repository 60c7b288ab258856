//! Build promotion between Artifactory repositories

pub mod payload;
pub mod service;

pub use payload::PromotionRequest;
pub use service::ArtifactoryService;
