//! Triad kernel submission.
//!
//! `execute` is the only place device-side computation happens. It returns
//! once the device has signalled completion, so the output may be staged
//! out or verified immediately afterwards.

use std::time::{Duration, Instant};

use memplace_core::{MemplaceError, Quad, Result};

use crate::emulated;
use crate::memory::{BufferSet, KernelOperand};
use crate::platform::{Backend, Queue};

/// Timing of one completed kernel launch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelRun {
    /// Number of work-items launched.
    pub range: usize,
    /// Submission through device completion.
    pub elapsed: Duration,
}

/// Submit `w[i] = x[i] * y[i] + z[i]` over `0..range` and wait for it.
///
/// Any device fault is returned as `MemplaceError::KernelExecution`; the
/// contents of `w` are unspecified afterwards. A `range` larger than the
/// buffers is such a fault.
pub fn execute(queue: &Queue, set: &mut BufferSet, range: usize) -> Result<KernelRun> {
    let start = Instant::now();
    match set {
        BufferSet::Usm(bufs) => launch(queue, bufs, range)?,
        BufferSet::Staged { device, .. } => launch(queue, device, range)?,
    }
    queue
        .wait()
        .map_err(|e| MemplaceError::KernelExecution(e.to_string()))?;
    let elapsed = start.elapsed();

    tracing::debug!(
        "triad over {} items on {} took {:.3}ms",
        range,
        queue.info().name,
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(KernelRun { range, elapsed })
}

fn launch<B: KernelOperand>(queue: &Queue, bufs: &mut Quad<B>, range: usize) -> Result<()> {
    let (x, y, z, w) = bufs.split_io();
    match queue.backend() {
        Backend::Emulated(_) => match (x.emulated(), y.emulated(), z.emulated(), w.emulated_mut()) {
            (Some(x), Some(y), Some(z), Some(w)) => emulated::launch_triad(x, y, z, w, range),
            _ => Err(foreign_buffers(queue)),
        },
        #[cfg(feature = "cuda")]
        Backend::Cuda(target) => {
            use memplace_core::quad::Extent;

            let extent = w.extent();
            if range > extent {
                // The device would write past the allocation; refuse the launch.
                return Err(MemplaceError::KernelExecution(format!(
                    "illegal address: launch range {} exceeds buffer extent {}",
                    range, extent
                )));
            }
            match (x.cuda_ptr(), y.cuda_ptr(), z.cuda_ptr(), w.cuda_ptr()) {
                (Some(x), Some(y), Some(z), Some(w)) => {
                    crate::cuda::launch::launch_triad(target, x, y, z, w, range)
                        .map_err(|e| MemplaceError::KernelExecution(e.to_string()))
                }
                _ => Err(foreign_buffers(queue)),
            }
        }
    }
}

fn foreign_buffers(queue: &Queue) -> MemplaceError {
    MemplaceError::KernelExecution(format!(
        "buffers were not allocated by {}",
        queue.info().name
    ))
}
