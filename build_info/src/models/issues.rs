//! issues — Issue-tracker references collected for a build.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<IssueTracker>,
    #[serde(default)]
    pub aggregate_build_issues: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_build_status: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub affected_issues: BTreeSet<Issue>,
}

impl Issues {
    pub fn new(tracker: IssueTracker) -> Self {
        Self {
            tracker: Some(tracker),
            ..Self::default()
        }
    }

    /// Adds an issue; an issue with the same key already present is kept.
    pub fn add_issue(&mut self, issue: Issue) -> bool {
        self.affected_issues.insert(issue)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTracker {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// An issue touched by the build. Identity is the issue key alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub aggregated: bool,
}

impl Issue {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }
}

impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Issue {}

impl PartialOrd for Issue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Issue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
