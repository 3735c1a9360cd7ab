//! Compile-time name-resolution smoke test (§4.3 item 6).
//!
//! Implemented directly against `getaddrinfo(3)` rather than
//! `tokio::net::lookup_host` so the exact `EAI_*` code is available to
//! classify transient vs. fatal resolution failures.

use std::ffi::CString;
use std::ptr;

use crate::error::ConfigError;

/// Perform a blocking name-resolution smoke test against `host`. Transient
/// failures (`EAI_AGAIN`, `EAI_NODATA`, `EAI_NONAME`) are tolerated —
/// probing will retry against a host that may not have propagated through
/// DNS yet; any other resolution error is fatal.
pub fn smoke_test(dependency: &str, host: &str) -> Result<(), ConfigError> {
    let c_host = match CString::new(host) {
        Ok(c) => c,
        Err(_) => {
            return Err(ConfigError::ResolutionFailed {
                dependency: dependency.to_string(),
                host: host.to_string(),
                detail: "hostname contains an interior NUL".to_string(),
            })
        }
    };

    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_STREAM;

    let mut result: *mut libc::addrinfo = ptr::null_mut();
    let rc = unsafe { libc::getaddrinfo(c_host.as_ptr(), ptr::null(), &hints, &mut result) };

    if rc == 0 {
        unsafe { libc::freeaddrinfo(result) };
        return Ok(());
    }

    if matches!(rc, libc::EAI_AGAIN | libc::EAI_NODATA | libc::EAI_NONAME) {
        tracing::debug!(dependency, host, code = rc, "transient DNS failure tolerated at compile time");
        return Ok(());
    }

    Err(ConfigError::ResolutionFailed {
        dependency: dependency.to_string(),
        host: host.to_string(),
        detail: unsafe {
            std::ffi::CStr::from_ptr(libc::gai_strerror(rc))
                .to_string_lossy()
                .into_owned()
        },
    })
}
