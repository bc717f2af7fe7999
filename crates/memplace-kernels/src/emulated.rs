//! Emulated accelerator.
//!
//! A host-resident device model used when no hardware accelerator is
//! present and by the test suite. Memory handed out by the device is
//! counted against an optional byte budget so allocation failure is
//! reproducible, copies can be made to fail in one direction, and the
//! triad kernel runs data-parallel on rayon.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use memplace_core::{triad, DeviceInfo, DeviceKind, MemplaceError, Placement, Result};

/// Minimum elements per rayon task.
const PAR_MIN_LEN: usize = 4096;

const ELEM_BYTES: usize = std::mem::size_of::<f32>();

/// Direction of a staging copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    ToDevice,
    ToHost,
}

impl std::fmt::Display for CopyDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CopyDirection::ToDevice => "host-to-device",
            CopyDirection::ToHost => "device-to-host",
        })
    }
}

/// An emulated device with a byte budget shared by all its allocations.
#[derive(Debug)]
pub struct EmulatedDevice {
    info: DeviceInfo,
    capacity: Option<usize>,
    failing_copies: Option<CopyDirection>,
    used: AtomicUsize,
}

impl EmulatedDevice {
    /// Emulated accelerator, accepted by every selector.
    pub fn accelerator() -> Self {
        Self::new(DeviceInfo::new("emulated-accelerator", DeviceKind::Accelerator, 10))
    }

    /// The host CPU presented as a device, accepted only by `AnyDevice`.
    pub fn host() -> Self {
        Self::new(DeviceInfo::new("host-cpu", DeviceKind::Host, 1))
    }

    fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            capacity: None,
            failing_copies: None,
            used: AtomicUsize::new(0),
        }
    }

    /// Limit total live allocations to `bytes`.
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.capacity = Some(bytes);
        self
    }

    /// Make every copy in `direction` fail with a transfer error.
    pub fn with_failing_copies(mut self, direction: CopyDirection) -> Self {
        self.failing_copies = Some(direction);
        self
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Bytes currently held by live allocations.
    pub fn used_bytes(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Allocate `len` zeroed elements, charging them to the budget.
    pub(crate) fn alloc(self: &Arc<Self>, placement: Placement, len: usize) -> Result<EmulatedAlloc> {
        let alloc_err = |msg: String| MemplaceError::Allocation { placement, len, msg };
        let bytes = len
            .checked_mul(ELEM_BYTES)
            .ok_or_else(|| alloc_err(format!("{} elements overflow the address space", len)))?;

        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let next = used.checked_add(bytes)?;
                match self.capacity {
                    Some(cap) if next > cap => None,
                    _ => Some(next),
                }
            })
            .map_err(|used| {
                alloc_err(format!(
                    "{} out of memory: {} bytes requested, {} of {} in use",
                    self.info.name,
                    bytes,
                    used,
                    self.capacity.unwrap_or(usize::MAX),
                ))
            })?;

        let mut data = Vec::new();
        if let Err(e) = data.try_reserve_exact(len) {
            self.used.fetch_sub(bytes, Ordering::AcqRel);
            return Err(alloc_err(e.to_string()));
        }
        data.resize(len, 0.0);

        Ok(EmulatedAlloc {
            data,
            device: Arc::clone(self),
        })
    }

    /// Admit or reject a copy in `direction`.
    pub(crate) fn check_copy(&self, direction: CopyDirection) -> Result<()> {
        if self.failing_copies == Some(direction) {
            return Err(MemplaceError::Transfer(format!(
                "{}: bus error during {} copy",
                self.info.name, direction
            )));
        }
        Ok(())
    }
}

/// Elements owned by an emulated device. Returns its bytes to the device
/// budget on drop.
#[derive(Debug)]
pub(crate) struct EmulatedAlloc {
    data: Vec<f32>,
    device: Arc<EmulatedDevice>,
}

impl EmulatedAlloc {
    pub(crate) fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub(crate) fn device(&self) -> &EmulatedDevice {
        &self.device
    }
}

impl Drop for EmulatedAlloc {
    fn drop(&mut self) {
        self.device
            .used
            .fetch_sub(self.data.len() * ELEM_BYTES, Ordering::AcqRel);
    }
}

/// Run `w[i] = x[i] * y[i] + z[i]` for `i` in `0..range`.
///
/// A range beyond the buffer extent is reported the way a device runtime
/// reports an illegal address, and nothing is written.
pub(crate) fn launch_triad(x: &[f32], y: &[f32], z: &[f32], w: &mut [f32], range: usize) -> Result<()> {
    let extent = w.len();
    debug_assert!(x.len() == extent && y.len() == extent && z.len() == extent);
    if range > extent {
        return Err(MemplaceError::KernelExecution(format!(
            "illegal address: launch range {} exceeds buffer extent {}, work-item {} out of bounds",
            range, extent, extent
        )));
    }

    w[..range]
        .par_iter_mut()
        .zip(x[..range].par_iter())
        .zip(y[..range].par_iter())
        .zip(z[..range].par_iter())
        .with_min_len(PAR_MIN_LEN)
        .for_each(|(((w, &x), &y), &z)| *w = triad(x, y, z));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_accounting() {
        let dev = Arc::new(EmulatedDevice::accelerator());
        let a = dev.alloc(Placement::Shared, 256).unwrap();
        let b = dev.alloc(Placement::Shared, 128).unwrap();
        assert_eq!(dev.used_bytes(), 384 * 4);
        drop(a);
        assert_eq!(dev.used_bytes(), 128 * 4);
        drop(b);
        assert_eq!(dev.used_bytes(), 0);
    }

    #[test]
    fn test_capacity_exceeded() {
        let dev = Arc::new(EmulatedDevice::accelerator().with_capacity(1024));
        let _held = dev.alloc(Placement::DevicePrivate, 200).unwrap();
        let err = dev.alloc(Placement::DevicePrivate, 100).unwrap_err();
        assert!(err.is_allocation(), "{err}");
        // The failed request is not charged.
        assert_eq!(dev.used_bytes(), 800);
    }

    #[test]
    fn test_alloc_is_zeroed() {
        let dev = Arc::new(EmulatedDevice::host());
        let a = dev.alloc(Placement::HostPinned, 17).unwrap();
        assert_eq!(a.as_slice(), &[0.0; 17]);
    }

    #[test]
    fn test_launch_triad() {
        let x = vec![0.5f32; 10_000];
        let y = vec![2.0f32; 10_000];
        let z = vec![1.0f32; 10_000];
        let mut w = vec![0.0f32; 10_000];
        launch_triad(&x, &y, &z, &mut w, 10_000).unwrap();
        assert!(w.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_launch_partial_range() {
        let x = [1.0f32; 4];
        let mut w = [0.0f32; 4];
        launch_triad(&x, &x, &x, &mut w, 2).unwrap();
        assert_eq!(w, [2.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_launch_out_of_range_faults() {
        let x = [1.0f32; 4];
        let mut w = [0.0f32; 4];
        let err = launch_triad(&x, &x, &x, &mut w, 5).unwrap_err();
        assert!(err.is_kernel());
        assert_eq!(w, [0.0; 4]);
    }

    #[test]
    fn test_overrun_diagnostic_names_range() {
        let x = [1.0f32; 4];
        let mut w = [0.0f32; 4];
        let err = launch_triad(&x, &x, &x, &mut w, 9).unwrap_err();
        assert_eq!(
            err.to_string(),
            "kernel execution failed: illegal address: launch range 9 exceeds buffer extent 4, \
             work-item 4 out of bounds"
        );
    }

    #[test]
    fn test_oversized_request_is_allocation_error() {
        let dev = Arc::new(EmulatedDevice::accelerator());
        let err = dev.alloc(Placement::Shared, usize::MAX / 4 + 2).unwrap_err();
        assert!(err.is_allocation(), "{err}");
        assert!(err.to_string().contains("overflow"));
        assert_eq!(dev.used_bytes(), 0);
    }

    #[test]
    fn test_failing_copies_in_one_direction() {
        let dev = EmulatedDevice::accelerator().with_failing_copies(CopyDirection::ToHost);
        assert!(dev.check_copy(CopyDirection::ToDevice).is_ok());
        let err = dev.check_copy(CopyDirection::ToHost).unwrap_err();
        assert_eq!(
            err,
            MemplaceError::Transfer(
                "emulated-accelerator: bus error during device-to-host copy".into()
            )
        );
    }
}
