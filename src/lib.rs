//! A readiness barrier for containerized workloads.
//!
//! This crate backs two independently invokable binaries:
//!
//! - `waiter` blocks until a declared set of network dependencies is
//!   reachable (or the retry budget is exhausted), per a two-level quorum:
//!   probes within a dependency, dependencies within the run.
//! - `runner` evaluates a list of named shell checks, each a script body
//!   carried in an environment variable, retrying under a per-check budget.
//!
//! The pipeline for `waiter`, leaves first: [`config::resolve`] expands
//! dynamic values, [`config`] decodes the document, [`compiler`] validates
//! and compiles each dependency into [`probe::Probe`]s, [`engine`] runs them
//! under a bounded pool and arbitrates the run-level exit code.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use depwait::config;
//!
//! let source = config::resolve_source(Some("dependencies.yaml"));
//! let document = config::load_config(&source)?;
//! let dependencies = depwait::compiler::compile_document(&document)?;
//! let code = depwait::engine::run(document.mode, dependencies).await;
//! std::process::exit(code);
//! # }
//! ```

pub mod checks;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod probe;
pub mod quorum;
pub mod report;

pub use config::{load_config, Document, ProbeOptions};
pub use error::{CheckError, ConfigError};
pub use quorum::{Dependency, FinalResult};
