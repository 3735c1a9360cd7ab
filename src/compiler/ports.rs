//! The scheme-to-default-port table and service-name port resolution
//! (§4.3 items 2 and 4).

use std::ffi::CString;

use crate::config::PortSpec;
use crate::error::ConfigError;

/// Fixed scheme -> default port table (§4.3 item 2).
pub fn scheme_default_port(scheme: &str) -> Option<u16> {
    Some(match scheme {
        "ftp" => 21,
        "ftps" => 990,
        "gopher" => 70,
        "http" => 80,
        "https" => 443,
        "ldap" => 389,
        "ldaps" => 636,
        "imap" => 143,
        "imaps" => 993,
        "pop" => 110,
        "pops" => 995,
        "smtp" => 25,
        "smtps" => 465,
        "ssh" => 22,
        "sftp" => 22,
        "telnet" => 23,
        "nfs" => 2049,
        "nntp" => 119,
        _ => return None,
    })
}

/// Resolve one `port`/`ports` entry: a decimal integer in `[1, 65535]`, or a
/// service name resolved via the OS service-name database (`/etc/services`).
/// `field` names the document key this entry actually came from (`"port"`
/// for the singular form, `"ports"` for an entry out of the list), so a
/// fatal diagnostic always cites the key that was really present.
pub fn resolve_port(dependency: &str, spec: &PortSpec, field: &'static str) -> Result<u16, ConfigError> {
    match spec {
        PortSpec::Number(n) => {
            if *n < 1 || *n > 65535 {
                return Err(ConfigError::Invalid {
                    dependency: dependency.to_string(),
                    field,
                    detail: format!("port {n} is out of range [1, 65535]"),
                });
            }
            Ok(*n as u16)
        }
        PortSpec::Name(raw) => {
            let resolved = crate::config::resolve(raw, &format!("{dependency}.{field}"))?;
            match resolved.trim().parse::<i64>() {
                Ok(n) if (1..=65535).contains(&n) => Ok(n as u16),
                Ok(n) => Err(ConfigError::Invalid {
                    dependency: dependency.to_string(),
                    field,
                    detail: format!("port {n} is out of range [1, 65535]"),
                }),
                Err(_) => resolve_service_name(dependency, field, resolved.trim()),
            }
        }
    }
}

/// Look up a service name via `getservbyname(3)` (tcp), the OS-level
/// database this system relies on per §1's "external collaborators".
fn resolve_service_name(dependency: &str, field: &'static str, name: &str) -> Result<u16, ConfigError> {
    let c_name = CString::new(name.as_bytes()).map_err(|_| ConfigError::Invalid {
        dependency: dependency.to_string(),
        field,
        detail: format!("service name {name:?} contains an interior NUL"),
    })?;
    let c_proto = CString::new("tcp").expect("\"tcp\" has no interior NUL");

    // getservbyname returns a pointer into thread-local/static storage; safe
    // to read synchronously and copy out before the next libc call reuses it.
    let entry = unsafe { libc::getservbyname(c_name.as_ptr(), c_proto.as_ptr()) };
    if entry.is_null() {
        return Err(ConfigError::Invalid {
            dependency: dependency.to_string(),
            field,
            detail: format!("service name {name:?} is not resolvable via /etc/services"),
        });
    }
    let port_network_order = unsafe { (*entry).s_port };
    Ok(u16::from_be(port_network_order as u16))
}
