//! The Dependency Compiler (§4.3): turns a raw `DependencySpec` into a
//! validated, running `Dependency` plus its compiled `Probe`s.

mod dns;
mod ports;

use std::sync::Arc;

use regex::Regex;
use reqwest::Url;
use std::sync::OnceLock;
use tracing::warn;

use crate::config::{Document, PortSpec, ProbeOptions, ProbeOptionsSpec, QuorumMode};
use crate::config::resolve;
use crate::error::ConfigError;
use crate::probe::{Probe, ProbeKind};
use crate::quorum::Dependency;

pub use ports::scheme_default_port;

/// A fully compiled dependency: the shared runtime state plus the probes
/// that will run against it. `Dependency` does not hold these probes itself
/// (see [`crate::quorum`]'s ownership notes), so this pairing is the
/// compiler's actual output shape.
pub struct CompiledDependency {
    pub dependency: Arc<Dependency>,
    pub probes: Vec<Probe>,
}

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^([a-z0-9][a-z0-9-]*)?[a-z0-9]([.]([a-z0-9][a-z0-9-]*)?[a-z0-9])*$")
            .expect("hostname pattern is a valid regex")
    })
}

/// Compile every declared dependency in `document`. Fails fast on the first
/// invalid dependency, per §4.3/§7 (configuration errors are fatal at
/// compile time).
pub fn compile_document(document: &Document) -> Result<Vec<CompiledDependency>, ConfigError> {
    document
        .dependencies
        .iter()
        .map(|(name, spec)| compile_one(name, spec, &document.template))
        .collect()
}

fn compile_one(
    name: &str,
    spec: &crate::config::DependencySpec,
    template: &ProbeOptionsSpec,
) -> Result<CompiledDependency, ConfigError> {
    let present = [spec.url.is_some(), spec.http.is_some(), has_host_form(spec)];
    let count = present.iter().filter(|p| **p).count();
    if count > 1 {
        return Err(ConfigError::Invalid {
            dependency: name.to_string(),
            field: "url/http/host",
            detail: "exactly one of url, http, or host+port(s) may be present".to_string(),
        });
    }

    let options = merge_options(&spec.options, template);

    let (host, kinds) = if let Some(url) = &spec.url {
        let url = resolve(url, &format!("{name}.url"))?;
        compile_url(name, &url, false)?
    } else if let Some(http) = &spec.http {
        let http = resolve(http, &format!("{name}.http"))?;
        compile_url(name, &http, true)?
    } else {
        compile_host_ports(name, spec)?
    };

    if !hostname_pattern().is_match(&host) {
        return Err(ConfigError::Invalid {
            dependency: name.to_string(),
            field: "host",
            detail: format!("{host:?} does not match RFC 1123"),
        });
    }

    dns::smoke_test(name, &host)?;

    let dependency = Arc::new(Dependency::new(name, host, options.mode, kinds.len()));
    let probes = kinds
        .into_iter()
        .map(|kind| Probe {
            kind,
            options,
            dependency: dependency.clone(),
        })
        .collect();

    Ok(CompiledDependency { dependency, probes })
}

fn has_host_form(spec: &crate::config::DependencySpec) -> bool {
    spec.host.is_some() || spec.port.is_some() || spec.ports.is_some()
}

/// `url`/`http` share validation except for the restricted scheme set that
/// `http` requires.
fn compile_url(name: &str, raw: &str, http_only: bool) -> Result<(String, Vec<ProbeKind>), ConfigError> {
    let url = Url::parse(raw).map_err(|err| ConfigError::Invalid {
        dependency: name.to_string(),
        field: if http_only { "http" } else { "url" },
        detail: format!("{raw:?} is not a valid URL: {err}"),
    })?;

    let scheme = url.scheme();
    let host = url.host_str().ok_or_else(|| ConfigError::Invalid {
        dependency: name.to_string(),
        field: if http_only { "http" } else { "url" },
        detail: format!("{raw:?} has no host"),
    })?;

    if http_only && scheme != "http" && scheme != "https" {
        return Err(ConfigError::Invalid {
            dependency: name.to_string(),
            field: "http",
            detail: format!("scheme {scheme:?} must be http or https"),
        });
    }

    let port = match url.port() {
        Some(p) => p,
        None => scheme_default_port(scheme).ok_or_else(|| ConfigError::Invalid {
            dependency: name.to_string(),
            field: if http_only { "http" } else { "url" },
            detail: format!("unknown scheme {scheme:?} with no explicit port"),
        })?,
    };

    let kind = if http_only {
        ProbeKind::Http { url: raw.to_string() }
    } else {
        ProbeKind::Tcp {
            host: host.to_string(),
            port,
        }
    };

    Ok((host.to_string(), vec![kind]))
}

fn compile_host_ports(name: &str, spec: &crate::config::DependencySpec) -> Result<(String, Vec<ProbeKind>), ConfigError> {
    let host = match &spec.host {
        Some(h) => resolve(h, &format!("{name}.host"))?,
        None => name.to_string(),
    };

    let (port_specs, field): (Vec<PortSpec>, &'static str) = if let Some(ports) = &spec.ports {
        if spec.port.is_some() {
            warn!(dependency = name, "both \"port\" and \"ports\" given; \"ports\" takes precedence, \"port\" is deprecated");
        }
        (ports.clone(), "ports")
    } else if let Some(port) = &spec.port {
        (vec![port.clone()], "port")
    } else {
        return Err(ConfigError::Invalid {
            dependency: name.to_string(),
            field: "port",
            detail: "host+port(s) form requires \"port\" or \"ports\"".to_string(),
        });
    };

    let mut kinds = Vec::with_capacity(port_specs.len());
    for port_spec in &port_specs {
        let resolved = ports::resolve_port(name, port_spec, field)?;
        kinds.push(ProbeKind::Tcp {
            host: host.clone(),
            port: resolved,
        });
    }

    Ok((host, kinds))
}

/// Merge precedence (§4.3 item 7): spec > template > hard defaults, clamping
/// each field to its documented minimum.
pub fn merge_options(spec: &ProbeOptionsSpec, template: &ProbeOptionsSpec) -> ProbeOptions {
    let defaults = ProbeOptions::hard_defaults();
    ProbeOptions {
        mode: spec.mode.or(template.mode).unwrap_or(defaults.mode),
        initial_delay: spec
            .initial_delay
            .or(template.initial_delay)
            .map(|v| v.max(0) as u64)
            .unwrap_or(defaults.initial_delay),
        delay: spec
            .delay
            .or(template.delay)
            .map(|v| v.max(1) as u64)
            .unwrap_or(defaults.delay),
        timeout: spec
            .timeout
            .or(template.timeout)
            .map(|v| v.max(1) as u64)
            .unwrap_or(defaults.timeout),
        attempts: spec
            .attempts
            .or(template.attempts)
            .map(|v| v.max(1) as u32)
            .unwrap_or(defaults.attempts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DependencySpec;
    use std::collections::HashMap;

    fn doc(yaml: &str) -> Document {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn rejects_mutually_exclusive_fields() {
        let document = doc(
            r#"
dependencies:
  db:
    url: "tcp://db:1"
    host: db
    port: 1
"#,
        );
        let err = compile_document(&document).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "url/http/host", .. }));
    }

    #[test]
    fn ports_takes_precedence_over_port() {
        let mut spec = DependencySpec::default();
        spec.host = Some("db".into());
        spec.port = Some(PortSpec::Number(1111));
        spec.ports = Some(vec![PortSpec::Number(5432)]);
        let (_, kinds) = compile_host_ports("db", &spec).unwrap();
        assert_eq!(kinds.len(), 1);
        match &kinds[0] {
            ProbeKind::Tcp { port, .. } => assert_eq!(*port, 5432),
            _ => panic!("expected tcp probe"),
        }
    }

    #[test]
    fn invalid_ports_list_entry_cites_ports_not_port() {
        let mut spec = DependencySpec::default();
        spec.host = Some("db".into());
        spec.ports = Some(vec![PortSpec::Number(99999)]);
        let err = compile_host_ports("db", &spec).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ports", .. }));
    }

    #[test]
    fn host_defaults_to_dependency_name() {
        let mut deps = HashMap::new();
        let mut spec = DependencySpec::default();
        spec.port = Some(PortSpec::Number(5432));
        deps.insert("postgres".to_string(), spec);
        let document = Document {
            enabled: true,
            mode: QuorumMode::All,
            template: ProbeOptionsSpec::default(),
            dependencies: deps,
        };
        let compiled = compile_document(&document).unwrap();
        assert_eq!(compiled[0].dependency.host, "postgres");
    }

    #[test]
    fn scheme_default_port_applies_when_url_has_none() {
        let (host, kinds) = compile_url("ldap-svc", "ldaps://ldap.example", false).unwrap();
        assert_eq!(host, "ldap.example");
        match &kinds[0] {
            ProbeKind::Tcp { port, .. } => assert_eq!(*port, 636),
            _ => panic!("expected tcp probe"),
        }
    }

    #[test]
    fn http_rejects_non_http_scheme() {
        let err = compile_url("api", "ftp://example.org", true).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "http", .. }));
    }

    #[test]
    fn unknown_scheme_without_port_is_fatal() {
        let err = compile_url("svc", "carrier-pigeon://example.org", false).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn options_merge_precedence_and_clamping() {
        let spec = ProbeOptionsSpec {
            timeout: Some(0),
            ..Default::default()
        };
        let template = ProbeOptionsSpec {
            delay: Some(30),
            attempts: Some(10),
            ..Default::default()
        };
        let merged = merge_options(&spec, &template);
        assert_eq!(merged.timeout, 1, "timeout below minimum is clamped to 1");
        assert_eq!(merged.delay, 30, "template fills in when spec is silent");
        assert_eq!(merged.attempts, 10);
        assert_eq!(merged.mode, QuorumMode::All);
    }

    #[test]
    fn options_merge_is_idempotent() {
        let template = ProbeOptionsSpec {
            mode: Some(QuorumMode::Any),
            initial_delay: Some(2),
            delay: Some(7),
            timeout: Some(9),
            attempts: Some(4),
        };
        let once = merge_options(&ProbeOptionsSpec::default(), &template);
        let as_spec = ProbeOptionsSpec {
            mode: Some(once.mode),
            initial_delay: Some(once.initial_delay as i64),
            delay: Some(once.delay as i64),
            timeout: Some(once.timeout as i64),
            attempts: Some(once.attempts as i64),
        };
        let twice = merge_options(&as_spec, &template);
        assert_eq!(once, twice);
    }
}
