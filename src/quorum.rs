//! The per-dependency quorum state machine (§4.7): an atomic `final_result`
//! cell that transitions at most once, an `active_probes` counter, and a
//! cooperative cancellation token for the dependency's outstanding probes.
//!
//! Ownership follows the Design Notes' explicit rejection of a
//! shared-callback-cycle graph: a `Dependency` owns its cell, counter, and
//! token directly; probes hold an `Arc<Dependency>` and report outcomes by
//! calling methods on it, never by registering a back-reference into it.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::QuorumMode;

/// A dependency's terminal outcome. Set at most once, from `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FinalResult {
    Unknown = 0,
    Success = 1,
    Failure = 2,
}

impl FinalResult {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => FinalResult::Unknown,
            1 => FinalResult::Success,
            2 => FinalResult::Failure,
            _ => unreachable!("invalid FinalResult discriminant"),
        }
    }
}

/// Expected-value CAS cell backing `final_result`.
#[derive(Debug, Default)]
struct ResultCell(AtomicU8);

impl ResultCell {
    fn new() -> Self {
        Self(AtomicU8::new(FinalResult::Unknown as u8))
    }

    /// Attempt the one-shot `Unknown -> to` transition. Returns `true` only
    /// for the call that won it.
    fn try_transition(&self, to: FinalResult) -> bool {
        self.0
            .compare_exchange(
                FinalResult::Unknown as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn get(&self) -> FinalResult {
        FinalResult::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Notification sent to the run-level Exit Arbiter once a dependency's
/// `final_result` has decided.
#[derive(Debug, Clone)]
pub struct DependencyOutcome {
    pub name: String,
    pub result: FinalResult,
}

/// A compiled, running dependency: its probe-quorum mode, live counter, and
/// decided-once outcome cell. Does not own its `Probe`s — see
/// [`crate::compiler::CompiledDependency`] — so there is no ownership cycle.
#[derive(Debug)]
pub struct Dependency {
    pub name: String,
    pub host: String,
    pub mode: QuorumMode,
    active_probes: AtomicI64,
    result: ResultCell,
    pub cancel: CancellationToken,
}

impl Dependency {
    pub fn new(name: impl Into<String>, host: impl Into<String>, mode: QuorumMode, probe_count: usize) -> Self {
        Dependency {
            name: name.into(),
            host: host.into(),
            mode,
            active_probes: AtomicI64::new(probe_count as i64),
            result: ResultCell::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn final_result(&self) -> FinalResult {
        self.result.get()
    }

    /// A probe reports success (§4.7). Returns `Some(FinalResult::Success)`
    /// only for the call that wins the transition; that caller is
    /// responsible for cancelling outstanding probes and notifying the
    /// run-level arbiter.
    pub fn report_success(&self) -> Option<FinalResult> {
        let remaining = self.active_probes.fetch_sub(1, Ordering::AcqRel) - 1;
        let decides = self.mode == QuorumMode::Any || remaining <= 0;
        if decides && self.result.try_transition(FinalResult::Success) {
            self.on_transition(FinalResult::Success);
            return Some(FinalResult::Success);
        }
        None
    }

    /// A probe reports failure (§4.7). Same winner-only contract as
    /// [`Dependency::report_success`].
    pub fn report_failure(&self) -> Option<FinalResult> {
        let remaining = self.active_probes.fetch_sub(1, Ordering::AcqRel) - 1;
        let decides = self.mode == QuorumMode::All || remaining <= 0;
        if decides && self.result.try_transition(FinalResult::Failure) {
            self.on_transition(FinalResult::Failure);
            return Some(FinalResult::Failure);
        }
        None
    }

    fn on_transition(&self, outcome: FinalResult) {
        info!(dependency = %self.name, outcome = ?outcome, "dependency result decided");
        self.active_probes.store(0, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_mode_requires_every_probe_to_succeed() {
        let dep = Dependency::new("db", "db.internal", QuorumMode::All, 2);
        assert!(dep.report_success().is_none());
        assert_eq!(dep.final_result(), FinalResult::Unknown);
        assert_eq!(dep.report_success(), Some(FinalResult::Success));
        assert_eq!(dep.final_result(), FinalResult::Success);
    }

    #[test]
    fn all_mode_fails_fast_on_first_failure() {
        let dep = Dependency::new("db", "db.internal", QuorumMode::All, 3);
        assert_eq!(dep.report_failure(), Some(FinalResult::Failure));
        assert_eq!(dep.final_result(), FinalResult::Failure);
    }

    #[test]
    fn any_mode_succeeds_on_first_success() {
        let dep = Dependency::new("cluster", "cluster.internal", QuorumMode::Any, 2);
        assert_eq!(dep.report_success(), Some(FinalResult::Success));
    }

    #[test]
    fn any_mode_requires_every_probe_to_fail() {
        let dep = Dependency::new("cluster", "cluster.internal", QuorumMode::Any, 2);
        assert!(dep.report_failure().is_none());
        assert_eq!(dep.report_failure(), Some(FinalResult::Failure));
    }

    #[test]
    fn transition_happens_at_most_once() {
        let dep = Dependency::new("db", "db.internal", QuorumMode::Any, 2);
        assert_eq!(dep.report_success(), Some(FinalResult::Success));
        // A late failure report must not flip the decided outcome.
        assert_eq!(dep.report_failure(), None);
        assert_eq!(dep.final_result(), FinalResult::Success);
    }

    #[test]
    fn winning_transition_cancels_the_token() {
        let dep = Dependency::new("db", "db.internal", QuorumMode::Any, 1);
        assert!(!dep.cancel.is_cancelled());
        dep.report_success();
        assert!(dep.cancel.is_cancelled());
    }
}
