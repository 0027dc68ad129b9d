//! statuses — Promotion of a build through a release stage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionStatus {
    /// Stage reached, e.g. `staged`, `released`, `rolled-back`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Promotion time, in the build-info started format.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci_user: Option<String>,
}

impl PromotionStatus {
    pub fn new(status: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            timestamp: timestamp.into(),
            ..Self::default()
        }
    }
}
