//! Request and response bodies of the Nexus staging REST API

use serde::{Deserialize, Serialize};

/// `{"data": ...}` envelope used by every staging endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// A staging profile, identified by the group it publishes
///
/// Nexus names a profile after its group. Some servers also send the group
/// as `groupId`, alone or next to `name`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StagingProfile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "groupId")]
    pub group_id: Option<String>,
}

impl StagingProfile {
    /// Whether this profile publishes exactly `group_id`
    pub fn publishes(&self, group_id: &str) -> bool {
        self.name.as_deref() == Some(group_id) || self.group_id.as_deref() == Some(group_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartRequest<'a> {
    pub description: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedRepository {
    pub staged_repository_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRequest<'a> {
    pub staged_repository_id: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteRequest<'a> {
    pub description: &'a str,
    pub auto_drop_after_release: bool,
    pub staged_repository_ids: Vec<&'a str>,
}

/// Point-in-time status of a staging repository
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryStatus {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transitioning: bool,
}

/// Where a repository stands in the asynchronous close validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseProgress {
    /// Open and transitioning: validation still running
    Validating,
    /// Closed and not transitioning: validation passed
    Closed,
    /// Open and not transitioning: validation rejected the repository
    Rejected,
    /// Any other combination
    Unexpected,
}

impl RepositoryStatus {
    pub fn progress(&self) -> CloseProgress {
        match (self.kind.as_str(), self.transitioning) {
            ("open", true) => CloseProgress::Validating,
            ("closed", false) => CloseProgress::Closed,
            ("open", false) => CloseProgress::Rejected,
            _ => CloseProgress::Unexpected,
        }
    }
}

/// One activity (open, close, release) recorded for a staging repository
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub events: Vec<ActivityEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivityEvent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Vec<ActivityProperty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivityProperty {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Failure messages of every rule that failed, in activity order
pub fn rule_failures(activities: &[Activity]) -> Vec<String> {
    activities
        .iter()
        .flat_map(|activity| &activity.events)
        .filter(|event| event.name == "ruleFailed")
        .flat_map(|event| &event.properties)
        .filter(|property| property.name == "failureMessage")
        .map(|property| property.value.clone())
        .collect()
}
