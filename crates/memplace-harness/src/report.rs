//! Per-strategy reports and the run summary.

use std::io::{self, Write};

use serde::Serialize;

use memplace_core::{DeviceInfo, MemplaceError, Placement, Verification};

use crate::config::HarnessConfig;
use crate::phase::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Allocation,
    KernelExecution,
    Transfer,
    Backend,
}

/// Why a strategy run was abandoned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl From<&MemplaceError> for Fault {
    fn from(e: &MemplaceError) -> Self {
        let kind = match e {
            MemplaceError::NoDevice(_) | MemplaceError::Allocation { .. } => FaultKind::Allocation,
            MemplaceError::KernelExecution(_) => FaultKind::KernelExecution,
            MemplaceError::Transfer(_) | MemplaceError::LengthMismatch { .. } => FaultKind::Transfer,
            MemplaceError::Backend(_) => FaultKind::Backend,
        };
        Self {
            kind,
            message: e.to_string(),
        }
    }
}

/// Result class of one strategy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Mismatched(usize),
    Faulted(FaultKind),
}

/// Everything observed while running one placement strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub placement: Placement,
    pub len: usize,
    /// Device the queue was built on; `None` if selection failed.
    pub device: Option<DeviceInfo>,
    /// Allocation through kernel completion, plus staging for device-private
    /// placement. Up to the fault for faulted runs.
    pub elapsed_ms: f64,
    pub kernel_ms: Option<f64>,
    pub phases: Vec<Phase>,
    pub verification: Option<Verification>,
    pub fault: Option<Fault>,
}

impl StrategyReport {
    pub fn new(placement: Placement, len: usize) -> Self {
        Self {
            placement,
            len,
            device: None,
            elapsed_ms: 0.0,
            kernel_ms: None,
            phases: Vec::new(),
            verification: None,
            fault: None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match (&self.fault, &self.verification) {
            (Some(f), _) => Outcome::Faulted(f.kind),
            (None, Some(v)) if !v.passed() => Outcome::Mismatched(v.mismatch_count()),
            (None, Some(_)) => Outcome::Passed,
            // Not reachable for reports produced by `Harness::run`.
            (None, None) => Outcome::Faulted(FaultKind::Backend),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome() == Outcome::Passed
    }

    pub fn mismatch_count(&self) -> Option<usize> {
        self.verification.as_ref().map(Verification::mismatch_count)
    }

    /// Console rendering: timing line, then one line per mismatch, or the
    /// fault diagnostic.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let label = self.placement.label();
        if let Some(fault) = &self.fault {
            return writeln!(out, "{} memory test failed: {}", label, fault.message);
        }
        writeln!(out, "{} memory time consuming: {:.3} ms", label, self.elapsed_ms)?;
        if let Some(v) = &self.verification {
            for m in &v.mismatches {
                writeln!(out, "{} error {}\t{}", m.index, m.actual, m.expected)?;
            }
        }
        Ok(())
    }
}

/// Reports for every strategy of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub len: usize,
    pub config: HarnessConfig,
    pub reports: Vec<StrategyReport>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(StrategyReport::passed)
    }

    /// Process exit status: 0 only when every strategy verified cleanly.
    pub fn exit_code(&self) -> u8 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memplace_core::Mismatch;

    fn verified(mismatches: Vec<Mismatch>) -> StrategyReport {
        let mut r = StrategyReport::new(Placement::Shared, 4);
        r.elapsed_ms = 1.5;
        r.verification = Some(Verification {
            checked: 4,
            tolerance: 1e-4,
            mismatches,
        });
        r
    }

    #[test]
    fn test_outcomes() {
        assert_eq!(verified(vec![]).outcome(), Outcome::Passed);

        let m = Mismatch { index: 2, actual: 0.0, expected: 1.0 };
        assert_eq!(verified(vec![m]).outcome(), Outcome::Mismatched(1));

        let mut r = StrategyReport::new(Placement::DevicePrivate, 4);
        r.fault = Some(Fault::from(&MemplaceError::KernelExecution("boom".into())));
        assert_eq!(r.outcome(), Outcome::Faulted(FaultKind::KernelExecution));
        assert_eq!(r.mismatch_count(), None);
    }

    #[test]
    fn test_text_rendering() {
        let m = Mismatch { index: 2, actual: 0.0, expected: 1.5 };
        let mut buf = Vec::new();
        verified(vec![m]).write_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "shared memory time consuming: 1.500 ms\n2 error 0\t1.5\n");
    }

    #[test]
    fn test_fault_rendering() {
        let mut r = StrategyReport::new(Placement::HostPinned, 4);
        r.fault = Some(Fault::from(&MemplaceError::Transfer("bus error".into())));
        let mut buf = Vec::new();
        r.write_text(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "host memory test failed: transfer failed: bus error\n"
        );
    }

    #[test]
    fn test_exit_code() {
        let mut summary = RunSummary {
            len: 4,
            config: HarnessConfig::default(),
            reports: vec![verified(vec![]), verified(vec![])],
        };
        assert_eq!(summary.exit_code(), 0);
        summary.reports.push(StrategyReport::new(Placement::DevicePrivate, 4));
        assert_eq!(summary.exit_code(), 1);
    }
}
