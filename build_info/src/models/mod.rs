//! Build-info data model — the record and the sub-entities it aggregates.

pub mod agent;
pub mod build;
pub mod issues;
pub mod matrix;
pub mod module;
pub mod retention;
pub mod status;
pub mod vcs;

use std::collections::BTreeMap;

/// Free-form build properties (environment, system, user supplied).
pub type Properties = BTreeMap<String, String>;
