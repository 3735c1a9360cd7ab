//! Configuration schema for the dependency waiter.
//!
//! The document is decoded as YAML first (a structural superset of JSON) and
//! falls back to strict JSON. Every dependency entry is a `ProbeOptions`
//! override plus exactly one of `url`, `http`, or `host`/`port`/`ports` — see
//! [`crate::compiler`] for the validation that enforces that exclusivity.
//!
//! ```text
//! Document (root)
//! ├── enabled           - bool, default true
//! ├── mode              - quorum across dependencies: all | any
//! ├── template          - ProbeOptions defaults merged into every dependency
//! └── dependencies       - name -> DependencySpec
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Quorum mode, shared by the run-level (across dependencies) and
/// dependency-level (across probes) state machines. Deserializes
/// case-insensitively from `all`/`any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuorumMode {
    All,
    Any,
}

impl Default for QuorumMode {
    fn default() -> Self {
        QuorumMode::All
    }
}

impl<'de> Deserialize<'de> for QuorumMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_lowercase().as_str() {
            "all" => Ok(QuorumMode::All),
            "any" => Ok(QuorumMode::Any),
            other => Err(serde::de::Error::custom(format!(
                "invalid quorum mode {other:?}, expected \"all\" or \"any\""
            ))),
        }
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Document {
    /// If false, the run exits success immediately with no probing.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Quorum mode across dependencies.
    #[serde(default)]
    pub mode: QuorumMode,

    /// Default `ProbeOptions` merged into every dependency (spec overrides
    /// take precedence; see [`crate::compiler::merge_options`]).
    #[serde(default)]
    pub template: ProbeOptionsSpec,

    /// Dependency name -> spec. Iteration order does not affect correctness.
    #[serde(default)]
    pub dependencies: HashMap<String, DependencySpec>,
}

fn default_enabled() -> bool {
    true
}

/// Raw, unclamped `ProbeOptions` as they appear in a document (template or
/// per-dependency override). Clamping and precedence merging happen in
/// [`crate::compiler`]; this type only records what was actually written.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ProbeOptionsSpec {
    pub mode: Option<QuorumMode>,
    #[serde(rename = "initialDelay")]
    pub initial_delay: Option<i64>,
    pub delay: Option<i64>,
    pub timeout: Option<i64>,
    pub attempts: Option<i64>,
}

/// Fully resolved, clamped probe options attached to a compiled `Probe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    pub mode: QuorumMode,
    pub initial_delay: u64,
    pub delay: u64,
    pub timeout: u64,
    pub attempts: u32,
}

impl ProbeOptions {
    /// The hard defaults from §4.3: `all, 0, 5, 15, 3`.
    pub const fn hard_defaults() -> Self {
        ProbeOptions {
            mode: QuorumMode::All,
            initial_delay: 0,
            delay: 5,
            timeout: 15,
            attempts: 3,
        }
    }
}

/// A single raw value, accepted either as a bare port number or a service
/// name resolvable via the OS service-name database (`/etc/services`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PortSpec {
    Number(i64),
    Name(String),
}

/// One declared dependency: a `ProbeOptions` override plus exactly one of
/// `url`, `http`, or `host`/`port(s)`. All string fields may carry
/// `@env:`/`@file:`/`$VAR` dynamic values, resolved before compilation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DependencySpec {
    pub url: Option<String>,
    pub http: Option<String>,
    pub host: Option<String>,
    pub port: Option<PortSpec>,
    pub ports: Option<Vec<PortSpec>>,

    #[serde(flatten)]
    pub options: ProbeOptionsSpec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_mode_is_case_insensitive() {
        let v: QuorumMode = serde_yaml::from_str("\"ANY\"").unwrap();
        assert_eq!(v, QuorumMode::Any);
    }

    #[test]
    fn quorum_mode_rejects_unknown() {
        let err = serde_yaml::from_str::<QuorumMode>("\"sometimes\"");
        assert!(err.is_err());
    }

    #[test]
    fn document_defaults_to_enabled_and_all() {
        let doc: Document = serde_yaml::from_str("dependencies: {}").unwrap();
        assert!(doc.enabled);
        assert_eq!(doc.mode, QuorumMode::All);
        assert!(doc.dependencies.is_empty());
    }

    #[test]
    fn dependency_spec_parses_host_and_ports() {
        let doc: Document = serde_yaml::from_str(
            r#"
dependencies:
  db:
    host: db.internal
    ports: [5432, "postgres"]
"#,
        )
        .unwrap();
        let dep = &doc.dependencies["db"];
        assert_eq!(dep.host.as_deref(), Some("db.internal"));
        assert_eq!(dep.ports.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn template_flows_through_as_options_spec() {
        let doc: Document = serde_yaml::from_str(
            r#"
template:
  mode: any
  timeout: 30
dependencies: {}
"#,
        )
        .unwrap();
        assert_eq!(doc.template.mode, Some(QuorumMode::Any));
        assert_eq!(doc.template.timeout, Some(30));
    }
}
