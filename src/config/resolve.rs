//! Dynamic value resolution: `@env:NAME`, `@file:PATH`, or shell-style
//! `$VAR`/`${VAR}` expansion of a literal.

use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "@env:";
const FILE_PREFIX: &str = "@file:";

/// Resolve one string value taken from the document. `label` identifies the
/// field for logging only (e.g. `"db.host"`); it never appears in the
/// resolved value itself.
///
/// Rules, applied only to non-empty strings:
/// - `@env:NAME` — the environment variable's value; missing variable is
///   fatal.
/// - `@file:PATH` — the file's trimmed contents; unreadable file is fatal.
/// - otherwise — `$VAR`/`${VAR}` shell-style expansion of the literal.
pub fn resolve(value: &str, label: &str) -> Result<String, ConfigError> {
    if value.is_empty() {
        return Ok(value.to_string());
    }

    if let Some(name) = value.strip_prefix(ENV_PREFIX) {
        let resolved = std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        debug!(field = label, source = "env", name, "resolved dynamic value");
        return Ok(resolved);
    }

    if let Some(path) = value.strip_prefix(FILE_PREFIX) {
        let contents = std::fs::read_to_string(Path::new(path)).map_err(|source| {
            ConfigError::UnreadableFile {
                path: path.into(),
                source,
            }
        })?;
        debug!(field = label, source = "file", path, "resolved dynamic value");
        return Ok(contents.trim().to_string());
    }

    let expanded = shellexpand::env(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string());
    debug!(field = label, source = "literal", value = %expanded, "resolved dynamic value");
    Ok(expanded)
}
