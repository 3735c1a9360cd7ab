//! Configuration loading: locating the document source and decoding it.

pub mod resolve;
pub mod schema;

pub use resolve::resolve;
pub use schema::*;

use std::io::Read as _;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ConfigError;

/// Where the document text comes from, as resolved from the CLI argument and
/// the `INIT_DEPENDENCIES` environment variable (§4.1, §6).
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// A path given explicitly on the command line, or discovered from
    /// `INIT_DEPENDENCIES` naming an existing regular file.
    File(PathBuf),
    /// `-` on the command line: read the document from standard input.
    Stdin,
    /// `INIT_DEPENDENCIES` holding the document body itself, rather than a
    /// path. Never logged verbatim.
    Literal(String),
}

/// Resolve the document source from the optional CLI argument and the
/// `INIT_DEPENDENCIES` environment variable, per §6's CLI contract.
pub fn resolve_source(cli_arg: Option<&str>) -> ConfigSource {
    match cli_arg {
        Some("-") => ConfigSource::Stdin,
        Some(path) => ConfigSource::File(PathBuf::from(path)),
        None => match std::env::var("INIT_DEPENDENCIES") {
            Ok(value) if Path::new(&value).is_file() => ConfigSource::File(PathBuf::from(value)),
            Ok(value) => ConfigSource::Literal(value),
            Err(_) => ConfigSource::Literal(String::new()),
        },
    }
}

/// Read the raw text for a `ConfigSource`. File contents may be logged by
/// path; inline literal text is never logged.
fn read_source(source: &ConfigSource) -> Result<String, ConfigError> {
    match source {
        ConfigSource::File(path) => {
            info!(path = %path.display(), "loading configuration from file");
            std::fs::read_to_string(path).map_err(|err| ConfigError::UnreadableSource {
                path: path.display().to_string(),
                source: err,
            })
        }
        ConfigSource::Stdin => {
            info!("loading configuration from standard input");
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| ConfigError::UnreadableSource {
                    path: "<stdin>".to_string(),
                    source: err,
                })?;
            Ok(buf)
        }
        ConfigSource::Literal(text) => {
            info!("loading configuration from inline document");
            Ok(text.clone())
        }
    }
}

/// Decode document text: YAML (a structural superset of JSON) first, falling
/// back to strict JSON if YAML decoding fails or yields an empty document.
fn decode(text: &str) -> Result<Document, ConfigError> {
    match serde_yaml::from_str::<Document>(text) {
        Ok(doc) => Ok(doc),
        Err(yaml_err) => serde_json::from_str::<Document>(text).map_err(|json_err| {
            ConfigError::Undecodable(format!(
                "YAML decode failed ({yaml_err}); JSON decode failed ({json_err})"
            ))
        }),
    }
}

/// Load and decode the configuration document for the given source.
pub fn load_config(source: &ConfigSource) -> Result<Document, ConfigError> {
    let text = read_source(source)?;
    if text.trim().is_empty() {
        return Ok(Document {
            enabled: true,
            mode: QuorumMode::All,
            template: ProbeOptionsSpec::default(),
            dependencies: Default::default(),
        });
    }
    decode(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolve_source_prefers_dash_to_stdin() {
        match resolve_source(Some("-")) {
            ConfigSource::Stdin => {}
            other => panic!("expected Stdin, got {other:?}"),
        }
    }

    #[test]
    fn resolve_source_treats_cli_arg_as_path() {
        match resolve_source(Some("/tmp/deps.yaml")) {
            ConfigSource::File(path) => assert_eq!(path, PathBuf::from("/tmp/deps.yaml")),
            other => panic!("expected File, got {other:?}"),
        }
    }

    #[test]
    fn load_config_decodes_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode: any\ndependencies: {{}}").unwrap();
        let doc = load_config(&ConfigSource::File(file.path().to_path_buf())).unwrap();
        assert_eq!(doc.mode, QuorumMode::Any);
    }

    #[test]
    fn load_config_falls_back_to_json() {
        let source = ConfigSource::Literal(
            r#"{"mode": "any", "dependencies": {"db": {"host": "x", "port": 5432}}}"#.to_string(),
        );
        let doc = load_config(&source).unwrap();
        assert_eq!(doc.mode, QuorumMode::Any);
        assert!(doc.dependencies.contains_key("db"));
    }

    #[test]
    fn load_config_empty_source_yields_default_document() {
        let doc = load_config(&ConfigSource::Literal(String::new())).unwrap();
        assert!(doc.enabled);
        assert!(doc.dependencies.is_empty());
    }

    #[test]
    fn load_config_unreadable_file_is_fatal() {
        let err = load_config(&ConfigSource::File(PathBuf::from("/no/such/file.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::UnreadableSource { .. }));
    }
}
