//! lumen-routes CLI
//!
//! Validates route manifests and shows how requests resolve against them.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use lumen_router::{FilterBinding, ManifestError, Method, RouteManifest};

/// Route manifest checker and resolver.
#[derive(Parser)]
#[command(name = "lumen-routes")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile routes and filters and report every conflict.
    Check {
        /// Manifest file.
        #[arg(short, long, env = "LUMEN_MANIFEST")]
        manifest: PathBuf,
    },

    /// Show the route and filters a request resolves to, as JSON.
    Resolve {
        /// Manifest file.
        #[arg(short, long, env = "LUMEN_MANIFEST")]
        manifest: PathBuf,

        /// Request method.
        method: Method,

        /// Request path.
        path: String,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Check { manifest } => {
            let manifest = RouteManifest::from_path(&manifest)?;
            if let Err(e) = check(&manifest) {
                return Ok(report(&e));
            }
            info!("Manifest is valid.");
        }

        Commands::Resolve {
            manifest,
            method,
            path,
        } => {
            let manifest = RouteManifest::from_path(&manifest)?;
            let document = match resolve(&manifest, method, &path) {
                Ok(document) => document,
                Err(e) => return Ok(report(&e)),
            };
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn check(manifest: &RouteManifest) -> Result<(), ManifestError> {
    let routes = manifest.build_routes(|name| Some(name.to_string()))?;
    let filters = manifest.build_filters(|name| Some(name.to_string()))?;
    info!(routes = routes.len(), filters = filters.len(), "Compiled manifest");
    Ok(())
}

fn resolve(manifest: &RouteManifest, method: Method, path: &str) -> anyhow::Result<Value> {
    let routes = manifest.build_routes(|name| Some(name.to_string()))?;
    let filters = manifest.build_filters(|name| Some(name.to_string()))?;

    let route = routes.lookup(method, path)?.map(|found| {
        json!({
            "handler": found.handler(),
            "pattern": found.pattern().as_str(),
            "params": found.params,
            "wildcards": found.wildcards,
        })
    });
    let matched = filters.lookup(path, method)?;
    let describe = |bindings: &[&FilterBinding<String>]| -> anyhow::Result<Vec<Value>> {
        bindings
            .iter()
            .map(|b| -> anyhow::Result<Value> {
                Ok(json!({
                    "handler": b.handler(),
                    "pattern": b.pattern().as_str(),
                    "priority": b.priority(),
                    "params": b.params(path)?,
                    "wildcards": b.wildcards(path)?,
                }))
            })
            .collect()
    };

    Ok(json!({
        "method": method,
        "path": path,
        "route": route,
        "allowed": routes.allowed_methods(path)?,
        "before": describe(matched.before_filters())?,
        "after": describe(matched.after_filters())?,
    }))
}

fn report(e: &dyn std::fmt::Display) -> ExitCode {
    error!("{e}");
    ExitCode::FAILURE
}
