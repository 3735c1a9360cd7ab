//! Diagnostic logging helpers shared by both binaries.
//!
//! Structured events (resolver decisions, quorum transitions, probe
//! attempts) go through `tracing` directly at their call sites; this module
//! holds the handful of user-facing touch points: the loud-failure
//! diagnostic helper and the final summary line.

use tracing::error;

/// Log a loud, non-silent failure. Named `log_err`, not `log_error` — the
/// misspelling some deployments still carry in scripts and dashboards is
/// not preserved here.
pub fn log_err(message: &str) {
    error!("{message}");
}

/// Print the one-line human-facing summary the waiter emits before exiting.
pub fn summary_line(success: bool, dependency_count: usize) {
    if success {
        eprintln!("depwait: all {dependency_count} dependency checks satisfied");
    } else {
        eprintln!("depwait: dependency readiness not satisfied, exiting failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_err_does_not_panic() {
        log_err("example failure");
    }
}
