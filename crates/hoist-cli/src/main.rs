//! Hoist CLI binary.
//!
//! Entry point for the `hoist` command. It initializes logging via
//! `tracing`, parses arguments with `clap`, loads the TOML run
//! configuration, and drives the engine through one full pipeline run.
//!
//! Exit codes: 0 ok, 2 unresolved modules, 3 transfer failures,
//! 4 configuration error.

mod cli;
mod config;
mod console;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use hoist_engine::registry::RepositoryRegistry;
use hoist_engine::ConflictPolicy;
use hoist_util::errors::HoistResult;
use hoist_util::progress;

use crate::config::RunConfig;
use crate::console::ConsoleNotifier;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = cli::parse();
    let code = match run(&args).await {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            4
        }
    };
    std::process::exit(code);
}

async fn run(args: &cli::Cli) -> HoistResult<i32> {
    let config = RunConfig::from_path(&args.config)?;
    let config_dir = args
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let registry = RepositoryRegistry::with_builtins();
    let mut engine = config.build_engine(&config_dir, &registry)?;

    if let Some(root) = &args.root {
        engine.set_root(root.clone());
    }
    if let Some(policy) = &args.policy {
        engine.set_conflict_policy(ConflictPolicy::from_str(policy)?);
    }
    if args.overwrite {
        engine.set_overwrite(true);
    }
    engine.set_notifier(Arc::new(ConsoleNotifier::new(args.verbose)));

    let result = engine.run().await?;

    for unresolved in &result.unresolved {
        progress::status_warn("Unresolved", &unresolved.to_string());
    }
    for (file, cause) in &result.failed {
        progress::status_warn("Failed", &format!("{}: {cause}", file.display()));
    }
    progress::status_info(
        "Finished",
        &format!(
            "{} modules, {} installed, {} up-to-date, {} removed",
            result.modules.len(),
            result.installed.len(),
            result.skipped.len(),
            result.removed.len()
        ),
    );

    Ok(result.exit_code())
}
