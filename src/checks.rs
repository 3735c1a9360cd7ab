//! The Retrying Shell-Check Runner (§4.9): evaluates named checks, each a
//! script body carried in an environment variable, with per-check overrides
//! for timeout, retry count, wait, disable, and debug.

use std::process::Stdio;
use std::time::Duration;

use regex::Regex;
use std::sync::OnceLock;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::CheckError;
use crate::report::log_err;

/// Exit status reserved for "timed out" (§6): retried, not a terminal
/// failure unless it is also the last attempt's status.
pub const TIMEOUT_EXIT_STATUS: i32 = 124;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^[a-z][a-z0-9_]*$").expect("check name pattern is valid"))
}

#[derive(Debug, Clone, Copy)]
struct CheckSettings {
    timeout: Duration,
    retry_count: u32,
    retry_wait: Duration,
    disable: bool,
    debug: bool,
}

/// Resolve one check's settings from its per-check overrides
/// (`<NAME>_TIMEOUT`, etc.), falling back to the unprefixed global, then the
/// hard default, when an override is missing, invalid, or empty.
fn resolve_settings(name: &str) -> CheckSettings {
    let upper = name.to_ascii_uppercase();
    CheckSettings {
        timeout: Duration::from_secs(read_nonneg_int(&format!("{upper}_TIMEOUT"), "TIMEOUT", 0)),
        retry_count: read_positive_int(&format!("{upper}_RETRY_COUNT"), "RETRY_COUNT", 5),
        retry_wait: Duration::from_secs(read_positive_int(&format!("{upper}_RETRY_WAIT"), "RETRY_WAIT", 5) as u64),
        disable: read_bool(&format!("{upper}_DISABLE"), "DISABLE", false),
        debug: read_bool(&format!("{upper}_DEBUG"), "DEBUG", false),
    }
}

fn read_nonneg_int(prefixed: &str, global: &str, default: u64) -> u64 {
    read_int(prefixed, global, default, |v| v >= 0)
}

fn read_positive_int(prefixed: &str, global: &str, default: u32) -> u32 {
    read_int(prefixed, global, default as i64, |v| v > 0) as u32
}

fn read_int(prefixed: &str, global: &str, default: i64, valid: impl Fn(i64) -> bool) -> u64 {
    for key in [prefixed, global] {
        if let Ok(raw) = std::env::var(key) {
            if let Ok(parsed) = raw.trim().parse::<i64>() {
                if valid(parsed) {
                    return parsed as u64;
                }
            }
        }
    }
    default.max(0) as u64
}

fn read_bool(prefixed: &str, global: &str, default: bool) -> bool {
    for key in [prefixed, global] {
        if let Ok(raw) = std::env::var(key) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "true" => return true,
                "false" => return false,
                _ => continue,
            }
        }
    }
    default
}

/// Run one named check end to end: validate the name, resolve its settings,
/// skip if disabled, otherwise retry its script body under a timeout up to
/// `retry_count` times. Returns the terminal exit status (0 on success).
pub async fn run_check(name: &str) -> Result<i32, CheckError> {
    if !name_pattern().is_match(name) {
        return Err(CheckError::InvalidName(name.to_string()));
    }

    let settings = resolve_settings(name);
    if settings.disable {
        info!(check = name, "check disabled, reporting success");
        return Ok(0);
    }

    let body = std::env::var(name).map_err(|_| CheckError::MissingBody(name.to_string(), name.to_string()))?;

    let mut last_status = 1;
    for attempt in 1..=settings.retry_count {
        if attempt >= 2 {
            tokio::time::sleep(settings.retry_wait).await;
        }

        last_status = run_once(name, &body, settings).await?;
        match last_status {
            0 => {
                debug!(check = name, attempt, "check succeeded");
                return Ok(0);
            }
            TIMEOUT_EXIT_STATUS => {
                log_err(&format!("check {name:?} timed out on attempt {attempt}"));
            }
            status => {
                log_err(&format!("check {name:?} failed with status {status} on attempt {attempt}"));
            }
        }
    }

    Ok(last_status)
}

async fn run_once(name: &str, body: &str, settings: CheckSettings) -> Result<i32, CheckError> {
    let mut command = Command::new("sh");
    if settings.debug {
        debug!(check = name, body, "running check body with shell tracing enabled");
        // `-x` turns on shell xtrace so each executed line is traced to
        // stderr, not just this one static log of the script body.
        command.arg("-x");
    }
    command
        .arg("-c")
        .arg(body)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let mut child = command
        .spawn()
        .map_err(|err| CheckError::SpawnFailed(name.to_string(), err))?;

    let run = async {
        child
            .wait()
            .await
            .map_err(|err| CheckError::SpawnFailed(name.to_string(), err))
    };

    if settings.timeout.is_zero() {
        return Ok(run.await?.code().unwrap_or(1));
    }

    match timeout(settings.timeout, run).await {
        Ok(result) => Ok(result?.code().unwrap_or(1)),
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            Ok(TIMEOUT_EXIT_STATUS)
        }
    }
}
