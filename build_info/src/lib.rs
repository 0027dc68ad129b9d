//! Build-info — fluent assembly of CI build metadata records.
//!
//! A [`BuildInfoBuilder`] collects the attributes of one CI build (name,
//! number, start time, VCS coordinates, modules, properties, retention
//! policy, ...) and produces a validated [`BuildInfo`] record, which
//! serializes to the camelCase build-info JSON document.

pub mod builder;
pub mod error;
pub(crate) mod metrics;
pub mod models;

pub use builder::{BuildInfoBuilder, ModuleMap};
pub use error::{BuildInfoError, RequiredField, Result};
pub use models::agent::{Agent, BuildAgent};
pub use models::build::{format_started, parse_started, BuildInfo, STARTED_FORMAT};
pub use models::issues::{Issue, IssueTracker, Issues};
pub use models::matrix::MatrixParameter;
pub use models::module::{Artifact, Dependency, Module};
pub use models::retention::BuildRetention;
pub use models::status::PromotionStatus;
pub use models::vcs::Vcs;
pub use models::Properties;
