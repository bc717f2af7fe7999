use serde::{Deserialize, Serialize};

use memplace_core::{Placement, DEFAULT_TOLERANCE};

/// Knobs for a harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Absolute tolerance used by the verifier.
    pub tolerance: f32,
    /// Seed for input generation; entropy-seeded when `None`.
    pub seed: Option<u64>,
    /// Launch this placement's kernel one work-item past the buffer end,
    /// simulating a device fault.
    pub inject_fault: Option<Placement>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            seed: None,
            inject_fault: None,
        }
    }
}

impl HarnessConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_fault(mut self, placement: Placement) -> Self {
        self.inject_fault = Some(placement);
        self
    }

    /// Kernel launch range for a run of `len` elements.
    pub fn launch_range(&self, placement: Placement, len: usize) -> usize {
        if self.inject_fault == Some(placement) {
            len.saturating_add(1)
        } else {
            len
        }
    }
}
