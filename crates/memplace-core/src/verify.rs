//! Host-side recomputation and comparison of the kernel output.

use serde::{Deserialize, Serialize};

use crate::{triad, Quad};

/// Absolute tolerance between device output and host recomputation.
pub const DEFAULT_TOLERANCE: f32 = 1e-4;

/// One index whose device result disagrees with the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub index: usize,
    pub actual: f32,
    pub expected: f32,
}

/// Outcome of comparing `w` against `x * y + z`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    /// Number of indices compared.
    pub checked: usize,
    pub tolerance: f32,
    /// Every mismatching index, in ascending order.
    pub mismatches: Vec<Mismatch>,
}

impl Verification {
    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len()
    }

    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Recompute every element on the host and record all disagreements.
///
/// Takes host slices only: device-private buffers expose no slice view, so
/// they must be staged out before they can be verified.
pub fn verify(view: Quad<&[f32]>, tolerance: f32) -> Verification {
    let (x, y, z, w) = view.into_parts();
    let mismatches = x
        .iter()
        .zip(y)
        .zip(z)
        .zip(w)
        .enumerate()
        .filter_map(|(index, (((&x, &y), &z), &actual))| {
            let expected = triad(x, y, z);
            // NaN never satisfies `<=`, so a NaN output is a mismatch.
            if (actual - expected).abs() <= tolerance {
                None
            } else {
                Some(Mismatch { index, actual, expected })
            }
        })
        .collect();

    Verification {
        checked: w.len(),
        tolerance,
        mismatches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(x: &[f32], y: &[f32], z: &[f32], w: &[f32]) -> (Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>) {
        (x.to_vec(), y.to_vec(), z.to_vec(), w.to_vec())
    }

    #[test]
    fn test_exact_output_passes() {
        let (x, y, z, w) = quad(&[0.5, 0.25], &[2.0, 4.0], &[1.0, 0.0], &[2.0, 1.0]);
        let v = verify(Quad::new(&x[..], &y[..], &z[..], &w[..]).unwrap(), DEFAULT_TOLERANCE);
        assert!(v.passed());
        assert_eq!(v.checked, 2);
    }

    #[test]
    fn test_records_every_mismatch() {
        let (x, y, z, w) = quad(&[1.0; 4], &[1.0; 4], &[1.0; 4], &[2.0, 0.0, 2.0, 5.0]);
        let v = verify(Quad::new(&x[..], &y[..], &z[..], &w[..]).unwrap(), DEFAULT_TOLERANCE);
        assert_eq!(v.mismatch_count(), 2);
        assert_eq!(v.mismatches[0], Mismatch { index: 1, actual: 0.0, expected: 2.0 });
        assert_eq!(v.mismatches[1].index, 3);
    }

    #[test]
    fn test_within_tolerance() {
        let (x, y, z, w) = quad(&[1.0], &[1.0], &[1.0], &[2.00005]);
        let v = verify(Quad::new(&x[..], &y[..], &z[..], &w[..]).unwrap(), DEFAULT_TOLERANCE);
        assert!(v.passed());

        let (x, y, z, w) = quad(&[1.0], &[1.0], &[1.0], &[2.001]);
        let v = verify(Quad::new(&x[..], &y[..], &z[..], &w[..]).unwrap(), DEFAULT_TOLERANCE);
        assert_eq!(v.mismatch_count(), 1);
    }

    #[test]
    fn test_nan_is_mismatch() {
        let (x, y, z, w) = quad(&[1.0], &[1.0], &[1.0], &[f32::NAN]);
        let v = verify(Quad::new(&x[..], &y[..], &z[..], &w[..]).unwrap(), DEFAULT_TOLERANCE);
        assert_eq!(v.mismatch_count(), 1);
    }

    #[test]
    fn test_zeroed_output_all_mismatch() {
        // An output never written by the kernel fails everywhere z > 0.
        let (x, y, z, w) = quad(&[0.5; 8], &[0.5; 8], &[0.5; 8], &[0.0; 8]);
        let v = verify(Quad::new(&x[..], &y[..], &z[..], &w[..]).unwrap(), DEFAULT_TOLERANCE);
        assert_eq!(v.mismatch_count(), 8);
    }

    #[test]
    fn test_empty() {
        let e: [f32; 0] = [];
        let v = verify(Quad::new(&e[..], &e[..], &e[..], &e[..]).unwrap(), DEFAULT_TOLERANCE);
        assert_eq!(v.checked, 0);
        assert!(v.passed());
    }
}
