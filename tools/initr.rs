//! initr command line tool
//!
//! Usage:
//!   initr check <config>
//!   initr scan <config> <document.html> [--scope SELECTOR] [--json]
//!
//! `check` runs the advisory dependency checks over a configuration file.
//! `scan` reports, without loading anything, which configured dependencies
//! would load against an HTML document.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

use initr::utils::init_logging_from_config;
use initr::{
    DependencyValidator, DependencyInput, FactoryRegistry, HtmlDocument, Initr, InitrConfig,
    InitrOptions, ModuleRegistry, PlanStatus, ValidationResult,
};

#[derive(Parser, Debug)]
#[command(name = "initr")]
#[command(about = "Inspect conditional module configurations")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the dependency list of a configuration file
    Check {
        /// Configuration file (.toml or .json)
        config: PathBuf,
    },
    /// Report which dependencies would load against a document
    Scan {
        /// Configuration file (.toml or .json)
        config: PathBuf,

        /// HTML document to match selectors against
        document: PathBuf,

        /// Override the configured scope selector
        #[arg(long)]
        scope: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: &Path) -> anyhow::Result<InitrConfig> {
    let config = InitrConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        .with_env_overrides();
    init_logging_from_config(&config.logging);
    Ok(config)
}

fn check(path: &Path) -> anyhow::Result<bool> {
    let config = load_config(path)?;
    info!("Checking {} dependencies", config.dependencies.len());

    match DependencyValidator::new().validate(&config.dependencies) {
        ValidationResult::Valid => {
            println!("{}: {} dependencies, no problems", path.display(), config.dependencies.len());
            Ok(true)
        }
        ValidationResult::Invalid(problems) => {
            for problem in &problems {
                println!("{}: {}", path.display(), problem);
            }
            Ok(false)
        }
    }
}

fn scan(
    path: &Path,
    document: &Path,
    scope: Option<String>,
    json: bool,
) -> anyhow::Result<bool> {
    let mut config = load_config(path)?;
    if scope.is_some() {
        config.scope = scope;
    }

    let html = HtmlDocument::from_file(document)
        .with_context(|| format!("Failed to read document {}", document.display()))?;

    let initr = Initr::with_registry(
        InitrOptions::from_config(&config),
        Arc::new(html),
        Arc::new(FactoryRegistry::from_config(&config.resolver)),
        ModuleRegistry::new(),
    );

    let plan = initr.plan(DependencyInput::Many(config.dependencies));
    let invalid = plan
        .iter()
        .filter(|p| matches!(p.status, PlanStatus::InvalidSelector(_)))
        .count();
    if invalid > 0 {
        warn!("{} dependencies have invalid selectors", invalid);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        for planned in &plan {
            println!(
                "{:<24} {:<32} {:?} ({} element(s)) {}",
                planned.name.as_deref().unwrap_or("<unnamed>"),
                planned.selector.as_deref().unwrap_or("-"),
                planned.status,
                planned.element_count,
                planned.sources.join(",")
            );
        }
    }

    Ok(invalid == 0)
}

fn main() {
    let args = Args::parse();

    let result = match &args.command {
        Command::Check { config } => check(config),
        Command::Scan {
            config,
            document,
            scope,
            json,
        } => scan(config, document, scope.clone(), *json),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("initr: {:#}", e);
            process::exit(2);
        }
    }
}
