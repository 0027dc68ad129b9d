//! Fluent assembly of [`BuildInfo`] records.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use chrono::{DateTime, TimeZone};

use crate::error::{BuildInfoError, Result};
use crate::models::agent::{Agent, BuildAgent};
use crate::models::build::{check_required, format_started, is_blank, BuildInfo};
use crate::models::issues::Issues;
use crate::models::matrix::MatrixParameter;
use crate::models::module::Module;
use crate::models::retention::BuildRetention;
use crate::models::status::PromotionStatus;
use crate::models::vcs::Vcs;
use crate::models::Properties;

/// Modules keyed by their id.
pub type ModuleMap = BTreeMap<String, Module>;

/// Collects the attributes of one build and produces [`BuildInfo`] records.
///
/// Setters take and return the builder by value so calls chain:
///
/// ```
/// use build_info::BuildInfoBuilder;
///
/// let build = BuildInfoBuilder::new("app")
///     .number("17")
///     .started("2024-01-01T00:00:00.000Z")
///     .build()
///     .unwrap();
/// assert_eq!(build.number, "17");
/// ```
///
/// [`build`](Self::build) only borrows, so a builder can be refined and
/// built again. Modules can also be added through a shared reference with
/// [`insert_module`](Self::insert_module), from several threads at once.
#[derive(Default)]
pub struct BuildInfoBuilder {
    version: Option<String>,
    name: Option<String>,
    number: Option<String>,
    started: Option<String>,
    started_millis: i64,
    project: Option<String>,
    artifactory_plugin_version: Option<String>,
    agent: Option<Agent>,
    build_agent: Option<BuildAgent>,
    duration_millis: i64,
    principal: Option<String>,
    artifactory_principal: Option<String>,
    url: Option<String>,
    parent_name: Option<String>,
    parent_number: Option<String>,
    vcs: Vec<Vcs>,
    vcs_revision: Option<String>,
    vcs_url: Option<String>,
    run_parameters: Option<Vec<MatrixParameter>>,
    modules: OnceLock<Mutex<ModuleMap>>,
    statuses: Option<Vec<PromotionStatus>>,
    properties: Option<Properties>,
    build_retention: Option<BuildRetention>,
    issues: Option<Issues>,
}

impl BuildInfoBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Assembles the record from the current state.
    ///
    /// # Errors
    /// Returns [`BuildInfoError::Invalid`] naming the first blank field among
    /// name, number and started (checked in that order).
    pub fn build(&self) -> Result<BuildInfo> {
        if let Err(err) = check_required(
            self.name.as_deref(),
            self.number.as_deref(),
            self.started.as_deref(),
        ) {
            if let BuildInfoError::Invalid(field) = &err {
                crate::metrics::build_rejected(*field);
                tracing::debug!(field = field.as_str(), "Build-info rejected: {err}");
            }
            return Err(err);
        }

        if self.vcs_revision.is_some() || self.vcs_url.is_some() {
            tracing::warn!(
                vcs_revision = self.vcs_revision.as_deref(),
                vcs_url = self.vcs_url.as_deref(),
                "vcs_revision/vcs_url are deprecated and not recorded, use vcs() instead"
            );
        }

        let modules = self
            .modules
            .get()
            .map(|map| lock(map).values().cloned().collect::<Vec<_>>());

        let build = BuildInfo {
            version: self.version.clone().filter(|v| !is_blank(Some(v.as_str()))),
            name: self.name.clone().unwrap_or_default(),
            number: self.number.clone().unwrap_or_default(),
            project: self.project.clone(),
            agent: self.agent.clone(),
            build_agent: self.build_agent.clone(),
            started: self.started.clone().unwrap_or_default(),
            started_millis: self.started_millis,
            duration_millis: self.duration_millis,
            principal: self.principal.clone(),
            artifactory_principal: self.artifactory_principal.clone(),
            artifactory_plugin_version: self.artifactory_plugin_version.clone(),
            url: self.url.clone(),
            parent_name: self.parent_name.clone(),
            parent_number: self.parent_number.clone(),
            vcs: self.vcs.clone(),
            run_parameters: self.run_parameters.clone(),
            modules,
            statuses: self.statuses.clone(),
            properties: self.properties.clone(),
            build_retention: self.build_retention.clone(),
            issues: self.issues.clone(),
        };

        crate::metrics::build_assembled();
        tracing::debug!(
            name = %build.name,
            number = %build.number,
            modules = build.modules.as_ref().map_or(0, Vec::len),
            "Build-info assembled"
        );

        Ok(build)
    }

    /// Sets the build-info schema version. Blank versions are not recorded.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Same as [`project`](Self::project).
    #[must_use]
    pub fn set_project(self, project: impl Into<String>) -> Self {
        self.project(project)
    }

    #[must_use]
    pub fn agent(mut self, agent: Agent) -> Self {
        self.agent = Some(agent);
        self
    }

    #[must_use]
    pub fn build_agent(mut self, build_agent: BuildAgent) -> Self {
        self.build_agent = Some(build_agent);
        self
    }

    /// Sets the start time as-is; see [`started_date`](Self::started_date)
    /// to derive both start fields from one timestamp.
    #[must_use]
    pub fn started(mut self, started: impl Into<String>) -> Self {
        self.started = Some(started.into());
        self
    }

    #[must_use]
    pub fn started_millis(mut self, started_millis: i64) -> Self {
        self.started_millis = started_millis;
        self
    }

    /// Sets `started` (in [`STARTED_FORMAT`](crate::STARTED_FORMAT)) and
    /// `started_millis` from the same instant.
    #[must_use]
    pub fn started_date<Tz>(mut self, date: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.started = Some(format_started(date));
        self.started_millis = date.timestamp_millis();
        self
    }

    #[must_use]
    pub fn duration_millis(mut self, duration_millis: i64) -> Self {
        self.duration_millis = duration_millis;
        self
    }

    #[must_use]
    pub fn principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    #[must_use]
    pub fn artifactory_principal(mut self, artifactory_principal: impl Into<String>) -> Self {
        self.artifactory_principal = Some(artifactory_principal.into());
        self
    }

    #[must_use]
    pub fn artifactory_plugin_version(mut self, version: impl Into<String>) -> Self {
        self.artifactory_plugin_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn parent_name(mut self, parent_name: impl Into<String>) -> Self {
        self.parent_name = Some(parent_name.into());
        self
    }

    #[must_use]
    pub fn parent_number(mut self, parent_number: impl Into<String>) -> Self {
        self.parent_number = Some(parent_number.into());
        self
    }

    #[must_use]
    pub fn vcs(mut self, vcs: Vec<Vcs>) -> Self {
        self.vcs = vcs;
        self
    }

    #[deprecated(note = "use `vcs` instead")]
    #[must_use]
    pub fn vcs_revision(mut self, vcs_revision: impl Into<String>) -> Self {
        self.vcs_revision = Some(vcs_revision.into());
        self
    }

    #[deprecated(note = "use `vcs` instead")]
    #[must_use]
    pub fn vcs_url(mut self, vcs_url: impl Into<String>) -> Self {
        self.vcs_url = Some(vcs_url.into());
        self
    }

    /// Replaces the module collection with `modules`, already keyed by id.
    #[must_use]
    pub fn module_map(mut self, modules: ModuleMap) -> Self {
        self.modules = OnceLock::from(Mutex::new(modules));
        self
    }

    /// Replaces the module collection. Modules sharing an id collapse to
    /// the last one.
    #[must_use]
    pub fn modules(self, modules: impl IntoIterator<Item = Module>) -> Self {
        let map = modules
            .into_iter()
            .map(|module| (module.id.clone(), module))
            .collect();
        self.module_map(map)
    }

    /// Adds `module`, replacing any module with the same id.
    #[must_use]
    pub fn add_module(self, module: Module) -> Self {
        self.insert_module(module);
        self
    }

    /// Adds `module` through a shared reference; safe to call concurrently.
    /// Returns the module previously stored under the same id.
    pub fn insert_module(&self, module: Module) -> Option<Module> {
        let map = self.modules.get_or_init(Mutex::default);
        lock(map).insert(module.id.clone(), module)
    }

    #[must_use]
    pub fn statuses(mut self, statuses: Vec<PromotionStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    #[must_use]
    pub fn add_status(mut self, status: PromotionStatus) -> Self {
        self.statuses.get_or_insert_with(Vec::new).push(status);
        self
    }

    #[must_use]
    pub fn build_retention(mut self, build_retention: BuildRetention) -> Self {
        self.build_retention = Some(build_retention);
        self
    }

    #[must_use]
    pub fn build_run_parameters(mut self, run_parameters: Vec<MatrixParameter>) -> Self {
        self.run_parameters = Some(run_parameters);
        self
    }

    #[must_use]
    pub fn add_run_parameters(mut self, parameter: MatrixParameter) -> Self {
        self.run_parameters
            .get_or_insert_with(Vec::new)
            .push(parameter);
        self
    }

    #[must_use]
    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Stores a property, overwriting any previous value for `key`.
    #[must_use]
    pub fn add_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn issues(mut self, issues: Issues) -> Self {
        self.issues = Some(issues);
        self
    }
}

impl fmt::Debug for BuildInfoBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modules = self.modules.get().map_or(0, |map| lock(map).len());
        f.debug_struct("BuildInfoBuilder")
            .field("name", &self.name)
            .field("number", &self.number)
            .field("started", &self.started)
            .field("modules", &modules)
            .finish_non_exhaustive()
    }
}

// A panic while holding the lock cannot leave the map half-updated.
fn lock(map: &Mutex<ModuleMap>) -> MutexGuard<'_, ModuleMap> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequiredField;
    use chrono::{FixedOffset, Utc};
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use std::sync::Arc;
    use std::thread;
    use tracing_test::traced_test;

    const STARTED: &str = "2024-01-01T00:00:00.000Z";

    fn base() -> BuildInfoBuilder {
        BuildInfoBuilder::new("app").number("17").started(STARTED)
    }

    fn missing(builder: &BuildInfoBuilder) -> Option<RequiredField> {
        builder.build().unwrap_err().missing_field()
    }

    #[test]
    fn test_minimal_build() {
        let build = base().build().unwrap();
        assert_eq!(build.name, "app");
        assert_eq!(build.number, "17");
        assert_eq!(build.started, STARTED);
        assert!(build.version.is_none());
        assert!(build.modules.is_none());
        assert!(build.statuses.is_none());
        assert!(build.properties.is_none());
        assert!(build.vcs.is_empty());
    }

    #[test]
    fn test_blank_name_fails_first() {
        let builder = BuildInfoBuilder::new("");
        assert_eq!(missing(&builder), Some(RequiredField::Name));
        assert_eq!(
            builder.build().unwrap_err().to_string(),
            "Build must have a name"
        );
        assert_eq!(missing(&BuildInfoBuilder::default()), Some(RequiredField::Name));
    }

    #[test]
    fn test_validation_order() {
        let builder = BuildInfoBuilder::new("app").started(STARTED);
        assert_eq!(missing(&builder), Some(RequiredField::Number));

        let builder = BuildInfoBuilder::new("app").number("  ");
        assert_eq!(missing(&builder), Some(RequiredField::Number));

        let builder = BuildInfoBuilder::new("app").number("1").started("\n");
        assert_eq!(missing(&builder), Some(RequiredField::Started));

        let builder = BuildInfoBuilder::new(" ").number("").started("");
        assert_eq!(missing(&builder), Some(RequiredField::Name));
    }

    #[test]
    fn test_blank_version_is_dropped() {
        assert!(base().version("  ").build().unwrap().version.is_none());
        assert_eq!(
            base().version("1.0.1").build().unwrap().version.as_deref(),
            Some("1.0.1")
        );
    }

    #[test]
    fn test_started_date_sets_both_fields() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let date = offset.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250);

        let build = base().started_date(&date).build().unwrap();
        assert_eq!(build.started, "2024-06-01T12:30:00.250-0500");
        assert_eq!(build.started_millis, date.timestamp_millis());
        assert_eq!(
            build.started_at().unwrap().timestamp_millis(),
            build.started_millis
        );
    }

    #[test]
    fn test_add_module_last_write_wins() {
        let build = base()
            .add_module(Module::new("core").with_type("first"))
            .add_module(Module::new("core").with_type("second"))
            .build()
            .unwrap();

        let modules = build.modules.unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].module_type.as_deref(), Some("second"));
    }

    #[test]
    fn test_modules_from_list_collapses_duplicates() {
        let build = base()
            .modules(vec![
                Module::new("a").with_type("1"),
                Module::new("b"),
                Module::new("a").with_type("2"),
            ])
            .build()
            .unwrap();

        let modules = build.modules.clone().unwrap();
        let mut ids: Vec<_> = modules.iter().map(|m| m.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(build.module("a").unwrap().module_type.as_deref(), Some("2"));
    }

    #[test]
    fn test_module_map_replaces_collection() {
        let mut map = ModuleMap::new();
        map.insert("x".to_string(), Module::new("x"));

        let build = base()
            .add_module(Module::new("dropped"))
            .module_map(map)
            .add_module(Module::new("y"))
            .build()
            .unwrap();

        assert!(build.module("dropped").is_none());
        assert!(build.module("x").is_some());
        assert!(build.module("y").is_some());
    }

    #[test]
    fn test_insert_module_returns_previous() {
        let builder = base();
        assert!(builder.insert_module(Module::new("m")).is_none());
        let previous = builder.insert_module(Module::new("m").with_type("cargo"));
        assert_eq!(previous, Some(Module::new("m")));
    }

    #[test]
    fn test_concurrent_insert_module() {
        let builder = Arc::new(base());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let builder = Arc::clone(&builder);
                thread::spawn(move || {
                    for i in 0..50 {
                        builder.insert_module(Module::new(format!("m{}", (t * 50 + i) % 200)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let modules = builder.build().unwrap().modules.unwrap();
        assert_eq!(modules.len(), 200);
    }

    #[test]
    fn test_adders_initialize_lazily() {
        let build = base()
            .add_status(PromotionStatus::new("staged", STARTED))
            .add_status(PromotionStatus::new("released", STARTED))
            .add_run_parameters(MatrixParameter::new("os", "linux"))
            .add_property("buildInfo.env.CI", "true")
            .add_property("buildInfo.env.CI", "1")
            .build()
            .unwrap();

        let statuses = build.statuses.unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[1].status, "released");
        assert_eq!(
            build.run_parameters.unwrap(),
            vec![MatrixParameter::new("os", "linux")]
        );
        let properties = build.properties.unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties["buildInfo.env.CI"], "1");
    }

    #[test]
    fn test_collection_setters_replace() {
        let build = base()
            .add_status(PromotionStatus::new("staged", STARTED))
            .statuses(Vec::new())
            .add_property("a", "1")
            .properties(Properties::new())
            .build_run_parameters(vec![MatrixParameter::new("jdk", "21")])
            .add_run_parameters(MatrixParameter::new("os", "mac"))
            .build()
            .unwrap();

        assert_eq!(build.statuses, Some(Vec::new()));
        assert_eq!(build.properties, Some(Properties::new()));
        assert_eq!(build.run_parameters.unwrap().len(), 2);
    }

    #[test]
    fn test_all_fields_copied() {
        let build = base()
            .version("1.0.1")
            .set_project("ci")
            .agent(Agent::new("Jenkins", "2.440"))
            .build_agent(BuildAgent::new("Maven", "3.9.6"))
            .started_millis(1_704_067_200_000)
            .duration_millis(4_500)
            .principal("alice")
            .artifactory_principal("deployer")
            .artifactory_plugin_version("3.18")
            .url("https://ci.example.com/job/app/17")
            .parent_name("upstream")
            .parent_number("3")
            .vcs(vec![Vcs::new("https://git.example.com/app.git", "abc123")])
            .build_retention(BuildRetention::keep_last(10))
            .issues(Issues::default())
            .build()
            .unwrap();

        assert_eq!(build.project.as_deref(), Some("ci"));
        assert_eq!(build.agent.unwrap().name, "Jenkins");
        assert_eq!(build.build_agent.unwrap().version.as_deref(), Some("3.9.6"));
        assert_eq!(build.started_millis, 1_704_067_200_000);
        assert_eq!(build.duration_millis, 4_500);
        assert_eq!(build.principal.as_deref(), Some("alice"));
        assert_eq!(build.artifactory_principal.as_deref(), Some("deployer"));
        assert_eq!(build.artifactory_plugin_version.as_deref(), Some("3.18"));
        assert_eq!(build.url.as_deref(), Some("https://ci.example.com/job/app/17"));
        assert_eq!(build.parent_name.as_deref(), Some("upstream"));
        assert_eq!(build.parent_number.as_deref(), Some("3"));
        assert_eq!(build.vcs[0].revision.as_deref(), Some("abc123"));
        assert_eq!(build.build_retention.unwrap().count, 10);
        assert_eq!(build.issues, Some(Issues::default()));
    }

    #[test]
    #[allow(deprecated)]
    fn test_deprecated_vcs_fields_not_recorded() {
        let build = base()
            .vcs_revision("abc")
            .vcs_url("https://git.example.com/app.git")
            .build()
            .unwrap();
        assert!(build.vcs.is_empty());
    }

    #[traced_test]
    #[test]
    #[allow(deprecated)]
    fn test_deprecated_vcs_fields_logged() {
        base().build().unwrap();
        assert!(!logs_contain("deprecated"));

        base().vcs_revision("abc").build().unwrap();
        assert!(logs_contain("vcs_revision/vcs_url are deprecated"));
        assert!(logs_contain("vcs_revision=\"abc\""));
    }

    #[test]
    fn test_build_outcomes_are_counted() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        ::metrics::with_local_recorder(&recorder, || {
            base().build().unwrap();
            BuildInfoBuilder::new("app").started(STARTED).build().unwrap_err();
        });

        let counters: Vec<(String, Vec<(String, String)>, u64)> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(count) => {
                    let labels = key
                        .key()
                        .labels()
                        .map(|l| (l.key().to_string(), l.value().to_string()))
                        .collect();
                    Some((key.key().name().to_string(), labels, count))
                }
                _ => None,
            })
            .collect();

        assert!(counters.contains(&("build_info_built_total".to_string(), Vec::new(), 1)));
        assert!(counters.contains(&(
            "build_info_rejected_total".to_string(),
            vec![("field".to_string(), "number".to_string())],
            1
        )));
        assert_eq!(counters.len(), 2);
    }

    #[test]
    fn test_build_is_repeatable() {
        let builder = base().add_module(Module::new("a"));
        let first = builder.build().unwrap();
        let builder = builder.number("18").add_module(Module::new("b"));
        let second = builder.build().unwrap();
        let third = builder.build().unwrap();

        assert_eq!(first.number, "17");
        assert_eq!(first.modules.as_ref().unwrap().len(), 1);
        assert_eq!(second.number, "18");
        assert_eq!(second.modules.as_ref().unwrap().len(), 2);
        assert_eq!(second, third);
        assert_eq!(
            BuildInfo {
                number: "17".to_string(),
                modules: first.modules.clone(),
                ..second
            },
            first
        );
    }

    #[test]
    fn test_started_date_utc() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let build = BuildInfoBuilder::new("app")
            .number("1")
            .started_date(&date)
            .build()
            .unwrap();
        assert_eq!(build.started, "2024-01-01T00:00:00.000+0000");
        assert_eq!(build.started_millis, 1_704_067_200_000);
    }
}
