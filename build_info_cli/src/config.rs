//! Collector configuration — loaded from CI environment variables.

use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectConfig {
    /// Build name (`BUILD_NAME`).
    pub name: String,
    /// Build number (`BUILD_NUMBER`).
    pub number: String,
    /// Start time in the build-info format (`BUILD_STARTED`); now when unset.
    pub started: Option<String>,
    pub url: Option<String>,
    pub project: Option<String>,
    pub principal: Option<String>,
    pub parent_name: Option<String>,
    pub parent_number: Option<String>,
    /// Build tool name and version (`BUILD_AGENT_NAME`, `BUILD_AGENT_VERSION`).
    pub build_agent: Option<(String, Option<String>)>,
    /// CI server name and version (`CI_AGENT_NAME`, `CI_AGENT_VERSION`).
    pub ci_agent: Option<(String, Option<String>)>,
    pub vcs_url: Option<String>,
    pub vcs_revision: Option<String>,
    pub vcs_branch: Option<String>,
    pub vcs_message: Option<String>,
    /// Number of builds the repository keeps (`BUILD_RETENTION_COUNT`).
    pub retention_count: Option<i32>,
}

impl CollectConfig {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        let get = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();
        let pair = |name: &str, version: &str| get(name).map(|n| (n, get(version)));

        let name = get("BUILD_NAME").unwrap_or_default();
        let number = get("BUILD_NUMBER").unwrap_or_default();
        let retention_count = get("BUILD_RETENTION_COUNT").and_then(|s| s.parse().ok());

        if name.is_empty() {
            tracing::warn!("BUILD_NAME not set -- pass --name or the build will be rejected");
        }
        if number.is_empty() {
            tracing::warn!("BUILD_NUMBER not set -- pass --number or the build will be rejected");
        }

        Self {
            name,
            number,
            started: get("BUILD_STARTED"),
            url: get("BUILD_URL"),
            project: get("BUILD_PROJECT"),
            principal: get("BUILD_PRINCIPAL"),
            parent_name: get("BUILD_PARENT_NAME"),
            parent_number: get("BUILD_PARENT_NUMBER"),
            build_agent: pair("BUILD_AGENT_NAME", "BUILD_AGENT_VERSION"),
            ci_agent: pair("CI_AGENT_NAME", "CI_AGENT_VERSION"),
            vcs_url: get("VCS_URL"),
            vcs_revision: get("VCS_REVISION"),
            vcs_branch: get("VCS_BRANCH"),
            vcs_message: get("VCS_MESSAGE"),
            retention_count,
        }
    }
}
