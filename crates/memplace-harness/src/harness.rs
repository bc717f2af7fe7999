//! One generic driver for every placement strategy.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use memplace_core::init::initialize;
use memplace_core::verify::verify;
use memplace_core::{Placement, Result};
use memplace_kernels::{allocate, execute, release, stage_in, stage_out, Platform};

use crate::config::HarnessConfig;
use crate::phase::{Phase, PhaseTrace};
use crate::report::{Fault, RunSummary, StrategyReport};

/// Runs placement strategies against the devices of a platform.
///
/// Runs share nothing but the random source: each one selects its own
/// queue and owns its buffers from allocation to release.
pub struct Harness<'p> {
    platform: &'p Platform,
    config: HarnessConfig,
    rng: StdRng,
}

impl<'p> Harness<'p> {
    pub fn new(platform: &'p Platform, config: HarnessConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { platform, config, rng }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run one strategy end to end. Never fails: allocation, transfer and
    /// kernel errors are recorded in the report.
    pub fn run(&mut self, placement: Placement, len: usize) -> StrategyReport {
        let mut report = StrategyReport::new(placement, len);
        let mut trace = PhaseTrace::start();
        let start = Instant::now();

        if let Err(e) = self.drive(placement, len, start, &mut trace, &mut report) {
            tracing::warn!("{} run faulted in phase {}: {}", placement, trace.current(), e);
            report.elapsed_ms = ms(start.elapsed());
            report.fault = Some(Fault::from(&e));
            trace.advance(Phase::Faulted);
        }
        trace.advance(Phase::Released);
        report.phases = trace.into_phases();

        tracing::info!(
            "{} run on {} elements: {:.3} ms, outcome {:?}",
            placement,
            len,
            report.elapsed_ms,
            report.outcome()
        );
        report
    }

    /// Run every strategy in order; a fault in one does not stop the rest.
    pub fn run_all(&mut self, len: usize) -> RunSummary {
        let reports = Placement::ALL.iter().map(|&p| self.run(p, len)).collect();
        RunSummary {
            len,
            config: self.config.clone(),
            reports,
        }
    }

    /// The linear part of the state machine. Buffers acquired here are
    /// dropped, and so freed, on every early return.
    fn drive(
        &mut self,
        placement: Placement,
        len: usize,
        start: Instant,
        trace: &mut PhaseTrace,
        report: &mut StrategyReport,
    ) -> Result<()> {
        let queue = self.platform.select(placement.selector())?;
        report.device = Some(queue.info().clone());
        let mut set = allocate(&queue, placement, len)?;

        initialize(set.host_view_mut(), &mut self.rng);
        trace.advance(Phase::Initialized);

        stage_in(&queue, &mut set)?;
        trace.advance(Phase::StagedIn);

        let kernel = execute(&queue, &mut set, self.config.launch_range(placement, len));
        trace.advance(Phase::Executed);
        let kernel = kernel?;
        let kernel_done = start.elapsed();
        report.kernel_ms = Some(ms(kernel.elapsed));

        stage_out(&queue, &mut set)?;
        trace.advance(Phase::StagedOut);
        // Staging copies are part of the device-private strategy's cost.
        report.elapsed_ms = ms(if placement.requires_staging() {
            start.elapsed()
        } else {
            kernel_done
        });

        report.verification = Some(verify(set.host_view(), self.config.tolerance));
        trace.advance(Phase::Verified);

        release(set);
        Ok(())
    }
}

fn ms(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{FaultKind, Outcome};

    #[test]
    fn test_run_all_passes() {
        let platform = Platform::emulated();
        let mut h = Harness::new(&platform, HarnessConfig::default().with_seed(3));
        let summary = h.run_all(4096);
        assert_eq!(summary.reports.len(), 3);
        for r in &summary.reports {
            assert_eq!(r.outcome(), Outcome::Passed, "{:?}", r);
            assert_eq!(r.phases.last(), Some(&Phase::Released));
            assert!(r.kernel_ms.is_some());
        }
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_happy_phase_sequence() {
        let platform = Platform::emulated();
        let mut h = Harness::new(&platform, HarnessConfig::default());
        let r = h.run(Placement::DevicePrivate, 8);
        assert_eq!(
            r.phases,
            vec![
                Phase::Allocated,
                Phase::Initialized,
                Phase::StagedIn,
                Phase::Executed,
                Phase::StagedOut,
                Phase::Verified,
                Phase::Released,
            ]
        );
    }

    #[test]
    fn test_kernel_fault_phase_sequence() {
        let platform = Platform::emulated();
        let mut h = Harness::new(&platform, HarnessConfig::default().with_fault(Placement::Shared));
        let r = h.run(Placement::Shared, 8);
        assert_eq!(r.outcome(), Outcome::Faulted(FaultKind::KernelExecution));
        assert_eq!(
            &r.phases[3..],
            &[Phase::Executed, Phase::Faulted, Phase::Released]
        );
        assert!(r.verification.is_none());
    }

    #[test]
    fn test_no_accelerator_faults_device_strategy_only() {
        let platform = Platform::host_only();
        let mut h = Harness::new(&platform, HarnessConfig::default());
        let summary = h.run_all(64);
        let outcomes: Vec<_> = summary.reports.iter().map(|r| r.outcome()).collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Passed,
                Outcome::Passed,
                Outcome::Faulted(FaultKind::Allocation),
            ]
        );
        let device = &summary.reports[2];
        assert!(device.device.is_none());
        assert_eq!(device.phases, vec![Phase::Allocated, Phase::Faulted, Phase::Released]);
    }
}
