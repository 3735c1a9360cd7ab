//! `waiter` — blocks until every declared dependency is reachable, or the
//! retry budget runs out.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use depwait::config;
use depwait::report::summary_line;
use depwait::{compiler, engine};

#[derive(Parser)]
#[command(name = "waiter")]
#[command(about = "Block until declared network dependencies are reachable")]
#[command(version)]
struct Cli {
    /// Path to the dependency document, or `-` to read it from standard
    /// input. With neither given, `INIT_DEPENDENCIES` is consulted: an
    /// existing file path is loaded, otherwise its value is treated as the
    /// document body itself.
    document: Option<String>,
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!("{err:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run(cli: Cli) -> Result<i32> {
    let source = config::resolve_source(cli.document.as_deref());
    let document = config::load_config(&source).context("failed to load dependency document")?;

    if !document.enabled {
        info!("run disabled (enabled: false); exiting success immediately");
        return Ok(0);
    }

    let dependencies = compiler::compile_document(&document).context("failed to compile dependencies")?;
    info!(count = dependencies.len(), mode = ?document.mode, "compiled dependencies");

    let code = engine::run(document.mode, dependencies).await;
    summary_line(code == 0, document.dependencies.len());
    Ok(code)
}
