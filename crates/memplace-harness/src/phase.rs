use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of one strategy run.
///
/// A run enters `Allocated` when it requests its device and buffers. The
/// happy path is linear through `Released`; `Faulted` is entered on an
/// allocation error (from `Allocated`), a stage-in error (from
/// `Initialized`), or a kernel or stage-out error (from `Executed`), and
/// always proceeds to `Released`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Allocated,
    Initialized,
    StagedIn,
    Executed,
    StagedOut,
    Verified,
    Faulted,
    Released,
}

impl Phase {
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Allocated, Initialized)
                | (Initialized, StagedIn)
                | (StagedIn, Executed)
                | (Executed, StagedOut)
                | (StagedOut, Verified)
                | (Verified, Released)
                | (Allocated, Faulted)
                | (Initialized, Faulted)
                | (Executed, Faulted)
                | (Faulted, Released)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Allocated => "allocated",
            Phase::Initialized => "initialized",
            Phase::StagedIn => "staged-in",
            Phase::Executed => "executed",
            Phase::StagedOut => "staged-out",
            Phase::Verified => "verified",
            Phase::Faulted => "faulted",
            Phase::Released => "released",
        };
        f.write_str(s)
    }
}

/// The phases a run has passed through, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTrace {
    phases: Vec<Phase>,
}

impl PhaseTrace {
    /// A trace positioned at `Allocated`.
    pub fn start() -> Self {
        Self {
            phases: vec![Phase::Allocated],
        }
    }

    pub fn current(&self) -> Phase {
        // Never empty: `start` seeds the first phase and nothing removes one.
        self.phases[self.phases.len() - 1]
    }

    /// Move to `next`.
    ///
    /// # Panics
    /// Panics if the transition is not part of the state machine; the
    /// harness drives transitions in a fixed order, so this is a bug.
    pub fn advance(&mut self, next: Phase) {
        let cur = self.current();
        assert!(
            cur.can_transition_to(next),
            "invalid phase transition {} -> {}",
            cur,
            next
        );
        tracing::debug!("phase {} -> {}", cur, next);
        self.phases.push(next);
    }

    pub fn faulted(&self) -> bool {
        self.phases.contains(&Phase::Faulted)
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn into_phases(self) -> Vec<Phase> {
        self.phases
    }
}
