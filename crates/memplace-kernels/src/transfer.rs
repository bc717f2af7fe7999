//! Host↔device staging copies.
//!
//! Only device-private placement moves data; for USM placements host and
//! device already address the same memory and both stages are no-ops.
//! Every copy has completed, and the queue has drained, when a function
//! here returns.

use memplace_core::{MemplaceError, Result};

use crate::emulated::CopyDirection;
use crate::memory::{BufferSet, DeviceBuffer, DeviceRepr};
use crate::platform::Queue;

/// Copy `x`, `y`, `z` from host staging into device memory.
pub fn stage_in(queue: &Queue, set: &mut BufferSet) -> Result<()> {
    let BufferSet::Staged { device, host } = set else {
        return Ok(());
    };
    let (dx, dy, dz, _) = device.parts_mut();
    copy_to_device(queue, host.x(), dx)?;
    copy_to_device(queue, host.y(), dy)?;
    copy_to_device(queue, host.z(), dz)?;
    queue.wait()?;
    tracing::debug!("staged in 3 x {} bytes", device.w().byte_count());
    Ok(())
}

/// Copy `w` from device memory back into its host staging vector.
pub fn stage_out(queue: &Queue, set: &mut BufferSet) -> Result<()> {
    let BufferSet::Staged { device, host } = set else {
        return Ok(());
    };
    let (_, _, _, hw) = host.view_mut().into_parts();
    copy_to_host(queue, device.w(), hw)?;
    queue.wait()?;
    tracing::debug!("staged out {} bytes", device.w().byte_count());
    Ok(())
}

/// Blocking host-to-device copy; `src` must match the buffer length.
pub fn copy_to_device(queue: &Queue, src: &[f32], dst: &mut DeviceBuffer) -> Result<()> {
    check_len(dst.len(), src.len())?;
    match &mut dst.repr {
        DeviceRepr::Emulated(a) => {
            a.device().check_copy(CopyDirection::ToDevice)?;
            a.as_mut_slice().copy_from_slice(src);
        }
        #[cfg(feature = "cuda")]
        DeviceRepr::Cuda(a) => a
            .copy_from_host(src)
            .map_err(|e| MemplaceError::Transfer(e.to_string()))?,
    }
    queue.wait()
}

/// Blocking device-to-host copy; `dst` must match the buffer length.
pub fn copy_to_host(queue: &Queue, src: &DeviceBuffer, dst: &mut [f32]) -> Result<()> {
    check_len(src.len(), dst.len())?;
    match &src.repr {
        DeviceRepr::Emulated(a) => {
            a.device().check_copy(CopyDirection::ToHost)?;
            dst.copy_from_slice(a.as_slice());
        }
        #[cfg(feature = "cuda")]
        DeviceRepr::Cuda(a) => a
            .copy_to_host(dst)
            .map_err(|e| MemplaceError::Transfer(e.to_string()))?,
    }
    queue.wait()
}

fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(MemplaceError::LengthMismatch { expected, got })
    }
}
