use serde::Serialize;

/// Body of the Artifactory build promotion call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRequest {
    pub status: String,
    pub source_repo: String,
    pub target_repo: String,
}

impl PromotionRequest {
    /// Promote a staged build from `source_repo` to `target_repo`
    pub fn staged(source_repo: &str, target_repo: &str) -> Self {
        Self {
            status: "staged".to_string(),
            source_repo: source_repo.to_string(),
            target_repo: target_repo.to_string(),
        }
    }
}
