//! Maps collector configuration and flags onto a build-info record.

use std::path::PathBuf;

use anyhow::Context;
use build_info::{
    Agent, BuildAgent, BuildInfo, BuildInfoBuilder, BuildRetention, Module, Vcs,
};
use chrono::Utc;

use crate::config::CollectConfig;

/// Command-line additions to the environment configuration.
#[derive(Debug, Default)]
pub struct CollectArgs {
    pub name: Option<String>,
    pub number: Option<String>,
    pub properties: Vec<(String, String)>,
    pub module_files: Vec<PathBuf>,
}

/// Parse a `KEY=VALUE` flag.
pub fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

pub fn builder_from(config: &CollectConfig, args: &CollectArgs) -> anyhow::Result<BuildInfoBuilder> {
    let name = args.name.clone().unwrap_or_else(|| config.name.clone());
    let number = args.number.clone().unwrap_or_else(|| config.number.clone());

    let mut builder = BuildInfoBuilder::new(name).number(number);

    builder = match &config.started {
        Some(started) => {
            let at = build_info::parse_started(started)?;
            builder.started(started.clone()).started_millis(at.timestamp_millis())
        }
        None => builder.started_date(&Utc::now()),
    };

    if let Some(url) = &config.url {
        builder = builder.url(url.clone());
    }
    if let Some(project) = &config.project {
        builder = builder.project(project.clone());
    }
    if let Some(principal) = &config.principal {
        builder = builder.principal(principal.clone());
    }
    if let Some(parent_name) = &config.parent_name {
        builder = builder.parent_name(parent_name.clone());
    }
    if let Some(parent_number) = &config.parent_number {
        builder = builder.parent_number(parent_number.clone());
    }
    if let Some((name, version)) = &config.build_agent {
        builder = builder.build_agent(BuildAgent {
            name: name.clone(),
            version: version.clone(),
        });
    }
    if let Some((name, version)) = &config.ci_agent {
        builder = builder.agent(Agent {
            name: name.clone(),
            version: version.clone(),
        });
    }
    if let Some(count) = config.retention_count {
        builder = builder.build_retention(BuildRetention::keep_last(count));
    }

    if config.vcs_url.is_some() || config.vcs_revision.is_some() {
        builder = builder.vcs(vec![Vcs {
            url: config.vcs_url.clone(),
            revision: config.vcs_revision.clone(),
            branch: config.vcs_branch.clone(),
            message: config.vcs_message.clone(),
        }]);
    }

    for (key, value) in &args.properties {
        builder = builder.add_property(key.clone(), value.clone());
    }

    for path in &args.module_files {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading module file {}", path.display()))?;
        let module: Module = serde_json::from_str(&raw)
            .with_context(|| format!("parsing module file {}", path.display()))?;
        tracing::debug!(module = %module.id, path = %path.display(), "Module loaded");
        builder = builder.add_module(module);
    }

    Ok(builder)
}

pub fn collect(config: &CollectConfig, args: &CollectArgs) -> anyhow::Result<BuildInfo> {
    let build = builder_from(config, args)?.build()?;
    tracing::info!(
        name = %build.name,
        number = %build.number,
        "Build-info collected"
    );
    Ok(build)
}
