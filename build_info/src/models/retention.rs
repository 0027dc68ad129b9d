//! buildRetention — How many builds (and which) the repository keeps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRetention {
    /// Number of builds to keep; `-1` keeps all of them.
    pub count: i32,
    pub delete_build_artifacts: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_numbers_not_to_be_discarded: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_build_date: Option<DateTime<Utc>>,
}

impl Default for BuildRetention {
    fn default() -> Self {
        Self {
            count: -1,
            delete_build_artifacts: false,
            build_numbers_not_to_be_discarded: Vec::new(),
            minimum_build_date: None,
        }
    }
}

impl BuildRetention {
    pub fn keep_last(count: i32) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.count < 0 && self.minimum_build_date.is_none()
    }
}
