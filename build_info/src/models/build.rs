//! build — One CI build's metadata record, as produced by the builder.

use std::fmt;

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

use super::agent::{Agent, BuildAgent};
use super::issues::Issues;
use super::matrix::MatrixParameter;
use super::module::Module;
use super::retention::BuildRetention;
use super::status::PromotionStatus;
use super::vcs::Vcs;
use super::Properties;
use crate::error::{BuildInfoError, RequiredField, Result};

/// Format of [`BuildInfo::started`]: millisecond precision, numeric offset
/// (`2024-01-01T00:00:00.000+0000`).
pub const STARTED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Render a timestamp in [`STARTED_FORMAT`].
pub fn format_started<Tz>(date: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    date.format(STARTED_FORMAT).to_string()
}

/// Parse a start timestamp. RFC 3339 (`...Z`) is accepted as well, since
/// callers commonly pass it through `started()`.
pub fn parse_started(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, STARTED_FORMAT)
        .or_else(|err| DateTime::parse_from_rfc3339(value).map_err(|_| err))
        .map_err(|source| BuildInfoError::StartedFormat {
            value: value.to_string(),
            source,
        })
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Check the required fields in order, reporting the first blank one.
pub(crate) fn check_required(
    name: Option<&str>,
    number: Option<&str>,
    started: Option<&str>,
) -> Result<()> {
    let values = [name, number, started];
    for (field, value) in RequiredField::ALL.into_iter().zip(values) {
        if is_blank(value) {
            return Err(BuildInfoError::Invalid(field));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Build-info schema version; never blank when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub name: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_agent: Option<BuildAgent>,
    pub started: String,
    #[serde(default)]
    pub started_millis: i64,
    #[serde(default)]
    pub duration_millis: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifactory_principal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifactory_plugin_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_number: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vcs: Vec<Vcs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_parameters: Option<Vec<MatrixParameter>>,
    /// Order is unspecified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<Module>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<PromotionStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_retention: Option<BuildRetention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Issues>,
}

impl BuildInfo {
    /// Re-run the builder's required-field checks, e.g. on a record read
    /// from a document.
    pub fn validate(&self) -> Result<()> {
        check_required(
            Some(self.name.as_str()),
            Some(self.number.as_str()),
            Some(self.started.as_str()),
        )
    }

    /// The start time parsed from [`BuildInfo::started`].
    pub fn started_at(&self) -> Result<DateTime<FixedOffset>> {
        parse_started(&self.started)
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.as_deref()?.iter().find(|m| m.id == id)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }
}
