//! The Probe Executor Pool and the run-level Exit Arbiter (§4.8, §5).
//!
//! A bounded `Semaphore` (capacity = total probes + 1) gates probe task
//! spawns; a single supervisor loop consumes dependency outcomes as they
//! arrive and is the only code path that decides the process exit code,
//! per Design Notes' rule against process-exit-from-worker.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::info;

use crate::compiler::CompiledDependency;
use crate::config::QuorumMode;
use crate::probe::run_probe;
use crate::quorum::{DependencyOutcome, FinalResult};

/// Run every compiled dependency's probes to completion (or until the
/// run-level quorum decides), and return the process exit code §4.8
/// mandates. The caller's only remaining job is `std::process::exit(code)`.
pub async fn run(run_mode: QuorumMode, dependencies: Vec<CompiledDependency>) -> i32 {
    if dependencies.is_empty() {
        info!("no dependencies declared; run-level quorum is vacuously satisfied");
        return 0;
    }

    let dependency_count = dependencies.len();
    let total_probes: usize = dependencies.iter().map(|d| d.probes.len()).sum();
    let pool = Arc::new(Semaphore::new(total_probes + 1));
    let (tx, mut rx) = mpsc::channel(dependency_count);

    for compiled in &dependencies {
        info!(
            dependency = %compiled.dependency.name,
            probes = compiled.probes.len(),
            mode = ?compiled.dependency.mode,
            "starting probes"
        );
    }

    // Each probe task owns its own `Arc<Dependency>` clone (carried on its
    // `Probe`) and reports outcomes through `tx`; the loop below never
    // reaches back into a task, only consumes what arrives on the channel.
    let mut handles = Vec::with_capacity(total_probes);
    for compiled in dependencies {
        for probe in compiled.probes {
            let permit = pool
                .clone()
                .acquire_owned()
                .await
                .expect("the probe pool semaphore is never closed");
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                run_probe(&probe, &tx).await;
            }));
        }
    }
    drop(tx);

    let code = exit_arbiter(run_mode, dependency_count, &mut rx).await;

    for handle in handles {
        handle.abort();
    }

    code
}

/// The Exit Arbiter (§4.8). Decides as soon as the run-level quorum is
/// satisfied, potentially before every dependency has reported; the
/// remaining outstanding probe tasks are aborted by the caller once this
/// returns.
async fn exit_arbiter(
    mode: QuorumMode,
    dependency_count: usize,
    rx: &mut mpsc::Receiver<DependencyOutcome>,
) -> i32 {
    let mut remaining = dependency_count;

    while let Some(outcome) = rx.recv().await {
        remaining -= 1;
        match outcome.result {
            FinalResult::Success => {
                info!(dependency = %outcome.name, "dependency succeeded");
                if mode == QuorumMode::All && remaining > 0 {
                    continue;
                }
                return 0;
            }
            FinalResult::Failure => {
                info!(dependency = %outcome.name, "dependency failed");
                if mode == QuorumMode::Any && remaining > 0 {
                    continue;
                }
                return 1;
            }
            FinalResult::Unknown => unreachable!("outcomes are only sent once decided"),
        }
    }

    // The channel closed without the loop above forcing a return only if
    // every dependency's outcome continued past its own check, which the
    // per-outcome conditions never allow on the last message (remaining
    // reaches 0). Reaching here would mean zero outcomes ever arrived.
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quorum::Dependency;
    use std::sync::Arc as StdArc;

    async fn send(tx: &mpsc::Sender<DependencyOutcome>, name: &str, result: FinalResult) {
        tx.send(DependencyOutcome {
            name: name.to_string(),
            result,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn all_mode_exits_zero_only_after_every_success() {
        let (tx, mut rx) = mpsc::channel(4);
        send(&tx, "a", FinalResult::Success).await;
        send(&tx, "b", FinalResult::Success).await;
        drop(tx);
        let code = exit_arbiter(QuorumMode::All, 2, &mut rx).await;
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn all_mode_exits_one_on_first_failure() {
        let (tx, mut rx) = mpsc::channel(4);
        send(&tx, "a", FinalResult::Failure).await;
        let code = exit_arbiter(QuorumMode::All, 2, &mut rx).await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn any_mode_exits_zero_on_first_success() {
        let (tx, mut rx) = mpsc::channel(4);
        send(&tx, "a", FinalResult::Failure).await;
        send(&tx, "b", FinalResult::Success).await;
        let code = exit_arbiter(QuorumMode::Any, 2, &mut rx).await;
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn any_mode_exits_one_only_after_every_failure() {
        let (tx, mut rx) = mpsc::channel(4);
        send(&tx, "a", FinalResult::Failure).await;
        send(&tx, "b", FinalResult::Failure).await;
        drop(tx);
        let code = exit_arbiter(QuorumMode::Any, 2, &mut rx).await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn empty_dependency_set_is_immediate_success() {
        let code = run(QuorumMode::All, Vec::new()).await;
        assert_eq!(code, 0);
    }

    #[test]
    fn dependency_handle_is_arc_shared_not_duplicated() {
        let dep = StdArc::new(Dependency::new("db", "db.internal", QuorumMode::All, 1));
        let clone = StdArc::clone(&dep);
        assert!(StdArc::ptr_eq(&dep, &clone));
    }
}
