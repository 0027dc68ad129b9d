//! Build-info collector.
//!
//! Assembles a build-info record for the running CI build from environment
//! variables and flags, and writes it as a JSON document. Also validates
//! documents produced elsewhere.

mod collect;
mod config;
mod validate;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::collect::CollectArgs;

#[derive(Parser)]
#[command(name = "build-info", about = "Collect and validate CI build-info records")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a record from the CI environment
    Collect {
        /// Build name (overrides BUILD_NAME)
        #[arg(long)]
        name: Option<String>,
        /// Build number (overrides BUILD_NUMBER)
        #[arg(long)]
        number: Option<String>,
        /// Extra build property, repeatable
        #[arg(long = "property", value_name = "KEY=VALUE", value_parser = collect::parse_property)]
        properties: Vec<(String, String)>,
        /// JSON file holding one module, repeatable
        #[arg(long = "module-file", value_name = "FILE")]
        module_files: Vec<PathBuf>,
        /// Write the document here instead of stdout
        #[arg(short, long, env = "BUILD_INFO_OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Check a build-info document
    Validate {
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let Cli { command } = Cli::parse();

    match command {
        Command::Collect {
            name,
            number,
            properties,
            module_files,
            output,
        } => {
            let config = config::CollectConfig::from_env();
            let args = CollectArgs {
                name,
                number,
                properties,
                module_files,
            };
            let build = collect::collect(&config, &args)?;
            let document = build.to_json_pretty()?;

            match output {
                Some(path) => {
                    std::fs::write(&path, document)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), "Build-info written");
                }
                None => println!("{document}"),
            }
        }
        Command::Validate { file } => {
            println!("{}", validate::validate_document(&file)?);
        }
    }

    Ok(())
}
