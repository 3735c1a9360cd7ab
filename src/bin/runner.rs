//! `runner` — the retrying shell-check runner. Each positional argument
//! names an environment variable holding a script body; checks run
//! sequentially and the run stops at the first failed check.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use depwait::checks::run_check;
use depwait::report::log_err;

#[derive(Parser)]
#[command(name = "runner")]
#[command(about = "Evaluate named shell checks with per-check retry budgets")]
#[command(version)]
struct Cli {
    /// One or more environment variable names, each holding a check's
    /// script body.
    #[arg(required = true, num_args = 1..)]
    checks: Vec<String>,
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    std::process::exit(run(cli).await);
}

fn init_logging() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Runs every named check in order, stopping at the first failure and
/// propagating its exit status (§4.9/§6). A usage/configuration error
/// (invalid name, undefined variable) exits `1`.
async fn run(cli: Cli) -> i32 {
    for name in &cli.checks {
        info!(check = %name, "running check");
        match run_check(name).await {
            Ok(0) => continue,
            Ok(status) => {
                log_err(&format!("check {name:?} failed with terminal status {status}"));
                return status;
            }
            Err(err) => {
                log_err(&format!("check {name:?}: {err}"));
                return 1;
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(checks: &[&str]) -> Cli {
        Cli {
            checks: checks.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn all_checks_passing_exits_zero() {
        std::env::set_var("DEPWAIT_RUNNER_OK", "exit 0");
        std::env::set_var("DEPWAIT_RUNNER_OK_RETRY_COUNT", "1");
        let code = run(cli(&["DEPWAIT_RUNNER_OK"])).await;
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn stops_at_first_failed_check() {
        std::env::set_var("DEPWAIT_RUNNER_FAIL", "exit 3");
        std::env::set_var("DEPWAIT_RUNNER_FAIL_RETRY_COUNT", "1");
        std::env::set_var("DEPWAIT_RUNNER_NEVER", "touch /tmp/depwait-runner-should-not-run");
        let code = run(cli(&["DEPWAIT_RUNNER_FAIL", "DEPWAIT_RUNNER_NEVER"])).await;
        assert_eq!(code, 3);
        assert!(!std::path::Path::new("/tmp/depwait-runner-should-not-run").exists());
    }

    #[tokio::test]
    async fn undefined_variable_is_a_usage_error() {
        std::env::remove_var("DEPWAIT_RUNNER_UNDEFINED");
        let code = run(cli(&["DEPWAIT_RUNNER_UNDEFINED"])).await;
        assert_eq!(code, 1);
    }
}
