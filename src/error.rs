//! Typed error enums for the config/compile boundary and the check runner.

use std::path::PathBuf;

/// Errors raised while loading, resolving, or compiling a configuration
/// document. Every variant is fatal: the process that surfaces one of these
/// exits `1` with the message as diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read configuration source {path}: {source}")]
    UnreadableSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration document is neither valid YAML nor valid JSON: {0}")]
    Undecodable(String),

    #[error("environment variable {0:?} is not set")]
    MissingEnvVar(String),

    #[error("could not read file {path:?} referenced by @file: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dependency {dependency:?}: {field} - {detail}")]
    Invalid {
        dependency: String,
        field: &'static str,
        detail: String,
    },

    #[error("dependency {dependency:?}: name resolution failed for host {host:?}: {detail}")]
    ResolutionFailed {
        dependency: String,
        host: String,
        detail: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by the shell-check runner before or between check attempts.
/// These are usage/configuration failures distinct from a check's own
/// non-zero terminal exit status, which propagates as a process exit code
/// rather than as this error type.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("invalid check name {0:?}: must match ^[a-z][a-z0-9_]*$ (case-insensitive)")]
    InvalidName(String),

    #[error("environment variable {0:?} naming check {1:?} is not set")]
    MissingBody(String, String),

    #[error("could not spawn subshell for check {0:?}: {1}")]
    SpawnFailed(String, std::io::Error),
}
