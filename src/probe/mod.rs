//! Compiled probes and the shared attempt loop (§4.4–§4.6).
//!
//! A `Probe` is immutable once compiled; it carries a handle to its owning
//! `Dependency` and reports outcomes into it directly, per the ownership
//! model in [`crate::quorum`].

pub mod http;
pub mod tcp;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ProbeOptions;
use crate::quorum::{Dependency, DependencyOutcome, FinalResult};

/// What a compiled probe actually does when it runs.
#[derive(Debug, Clone)]
pub enum ProbeKind {
    Tcp { host: String, port: u16 },
    Http { url: String },
}

/// One compiled, runnable probe.
#[derive(Debug)]
pub struct Probe {
    pub kind: ProbeKind,
    pub options: ProbeOptions,
    pub dependency: Arc<Dependency>,
}

/// The outcome of a single probe attempt (not the probe's overall result).
/// Distinguishes quiet failures (never logged with detail, per the silence
/// rules) from loud ones.
pub(crate) enum AttemptOutcome {
    Success,
    QuietFailure(String),
    LoudFailure(String),
}

/// Sleep for `duration`, racing it against the dependency's cancellation
/// token so a probe parked between attempts notices a sibling's decision
/// immediately rather than sleeping out the full `delay`/`initialDelay`.
/// Returns `true` if the token fired before the sleep elapsed.
async fn cancellable_sleep(dependency: &Dependency, duration: Duration) -> bool {
    tokio::select! {
        _ = dependency.cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// Run the shared attempt loop (§4.6) for one probe, reporting the outcome
/// into its dependency and, if this call wins the dependency's transition,
/// forwarding it to the run-level arbiter via `outcomes`.
pub async fn run_probe(probe: &Probe, outcomes: &mpsc::Sender<DependencyOutcome>) {
    let label = probe_label(&probe.kind);

    for attempt in 1..=probe.options.attempts {
        if probe.dependency.final_result() != FinalResult::Unknown {
            debug!(probe = %label, "dependency already decided, skipping attempt");
            return;
        }

        if attempt == 1 && probe.options.initial_delay > 0 {
            let delay = Duration::from_secs(probe.options.initial_delay);
            if cancellable_sleep(&probe.dependency, delay).await {
                debug!(probe = %label, "cancelled during initial delay");
                return;
            }
        }

        let timeout = Duration::from_secs(probe.options.timeout);
        let outcome = match &probe.kind {
            ProbeKind::Tcp { host, port } => tcp::probe_tcp(host, *port, timeout).await,
            ProbeKind::Http { url } => http::probe_http(url, timeout).await,
        };

        match outcome {
            AttemptOutcome::Success => {
                debug!(probe = %label, attempt, "probe succeeded");
                report(&probe.dependency, true, outcomes).await;
                return;
            }
            AttemptOutcome::QuietFailure(detail) => {
                debug!(probe = %label, attempt, detail, "probe attempt failed (quiet)");
            }
            AttemptOutcome::LoudFailure(detail) => {
                warn!(probe = %label, attempt, detail, "probe attempt failed");
            }
        }

        if probe.dependency.final_result() != FinalResult::Unknown {
            return;
        }

        if attempt < probe.options.attempts {
            let delay = Duration::from_secs(probe.options.delay);
            if cancellable_sleep(&probe.dependency, delay).await {
                debug!(probe = %label, "cancelled during inter-attempt delay");
                return;
            }
        }
    }

    report(&probe.dependency, false, outcomes).await;
}

async fn report(dependency: &Arc<Dependency>, success: bool, outcomes: &mpsc::Sender<DependencyOutcome>) {
    let won = if success {
        dependency.report_success()
    } else {
        dependency.report_failure()
    };
    if let Some(result) = won {
        let _ = outcomes
            .send(DependencyOutcome {
                name: dependency.name.clone(),
                result,
            })
            .await;
    }
}

fn probe_label(kind: &ProbeKind) -> String {
    match kind {
        ProbeKind::Tcp { host, port } => format!("tcp://{host}:{port}"),
        ProbeKind::Http { url } => url.clone(),
    }
}
