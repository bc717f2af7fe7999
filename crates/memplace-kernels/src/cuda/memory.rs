//! CUDA allocations for the three placements.
//!
//! - shared: `cuMemAllocManaged` (migrates on demand between host and GPU)
//! - host-pinned: `cuMemHostAlloc` with `DEVICEMAP` (page-locked, read over PCIe)
//! - device-private: `cuMemAlloc` through `CudaSlice`, reachable only by copies

use std::ffi::c_void;
use std::sync::Arc;

use cudarc::driver::{result, sys, CudaDevice, CudaSlice, DevicePtr};

use super::context::CudaError;

const ELEM_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsmKind {
    Managed,
    MappedPinned,
}

fn byte_len(len: usize) -> Result<usize, CudaError> {
    len.max(1)
        .checked_mul(ELEM_BYTES)
        .ok_or_else(|| CudaError::MemoryError(format!("{} elements overflow the address space", len)))
}

/// Host-addressable CUDA allocation of `len` f32 elements.
#[derive(Debug)]
pub struct UsmAlloc {
    ptr: *mut f32,
    len: usize,
    kind: UsmKind,
    device: Arc<CudaDevice>,
}

// The allocation is owned exclusively; the pointer is not aliased elsewhere.
unsafe impl Send for UsmAlloc {}
unsafe impl Sync for UsmAlloc {}

impl UsmAlloc {
    /// Zeroed managed memory, attached globally so any stream may access it.
    pub fn managed(device: &Arc<CudaDevice>, len: usize) -> Result<Self, CudaError> {
        device
            .bind_to_thread()
            .map_err(|e| CudaError::MemoryError(e.to_string()))?;
        // Zero-byte requests are rejected by the driver; keep one element.
        let nbytes = byte_len(len)?;
        let dptr = unsafe {
            result::malloc_managed(nbytes, sys::CUmemAttach_flags::CU_MEM_ATTACH_GLOBAL)
        }
        .map_err(|e| CudaError::MemoryError(format!("cuMemAllocManaged({} bytes): {}", nbytes, e)))?;
        let mut alloc = Self {
            ptr: dptr as usize as *mut f32,
            len,
            kind: UsmKind::Managed,
            device: Arc::clone(device),
        };
        alloc.as_mut_slice().fill(0.0);
        Ok(alloc)
    }

    /// Zeroed page-locked host memory mapped into the device address space.
    pub fn mapped_pinned(device: &Arc<CudaDevice>, len: usize) -> Result<Self, CudaError> {
        device
            .bind_to_thread()
            .map_err(|e| CudaError::MemoryError(e.to_string()))?;
        let nbytes = byte_len(len)?;
        let hptr = unsafe { result::malloc_host(nbytes, sys::CU_MEMHOSTALLOC_DEVICEMAP) }
            .map_err(|e| CudaError::MemoryError(format!("cuMemHostAlloc({} bytes): {}", nbytes, e)))?;
        let mut alloc = Self {
            ptr: hptr as *mut f32,
            len,
            kind: UsmKind::MappedPinned,
            device: Arc::clone(device),
        };
        alloc.as_mut_slice().fill(0.0);
        Ok(alloc)
    }

    pub fn as_slice(&self) -> &[f32] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// Address to pass as a kernel argument.
    ///
    /// Relies on unified virtual addressing, where mapped pinned host
    /// pointers are valid device pointers.
    pub fn device_ptr(&self) -> u64 {
        self.ptr as usize as u64
    }
}

impl Drop for UsmAlloc {
    fn drop(&mut self) {
        let _ = self.device.bind_to_thread();
        unsafe {
            let _ = match self.kind {
                UsmKind::Managed => result::free_sync(self.ptr as usize as sys::CUdeviceptr),
                UsmKind::MappedPinned => result::free_host(self.ptr as *mut c_void),
            };
        }
    }
}

/// Device-resident allocation of `len` f32 elements.
#[derive(Debug)]
pub struct DeviceAlloc {
    slice: CudaSlice<f32>,
    len: usize,
}

impl DeviceAlloc {
    pub fn zeros(device: &Arc<CudaDevice>, len: usize) -> Result<Self, CudaError> {
        byte_len(len)?;
        let slice = device
            .alloc_zeros::<f32>(len.max(1))
            .map_err(|e| CudaError::MemoryError(format!("alloc_zeros({} elements): {}", len, e)))?;
        Ok(Self { slice, len })
    }

    /// Blocking host-to-device copy of exactly `len` elements.
    pub fn copy_from_host(&mut self, src: &[f32]) -> Result<(), CudaError> {
        if self.len == 0 {
            return Ok(());
        }
        let device = self.slice.device();
        device
            .htod_sync_copy_into(src, &mut self.slice)
            .map_err(|e| CudaError::MemoryError(format!("htod_sync_copy_into: {}", e)))
    }

    /// Blocking device-to-host copy of exactly `len` elements.
    pub fn copy_to_host(&self, dst: &mut [f32]) -> Result<(), CudaError> {
        if self.len == 0 {
            return Ok(());
        }
        self.slice
            .device()
            .dtoh_sync_copy_into(&self.slice, dst)
            .map_err(|e| CudaError::MemoryError(format!("dtoh_sync_copy_into: {}", e)))
    }

    pub fn device_ptr(&self) -> u64 {
        *self.slice.device_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_len() {
        assert_eq!(byte_len(0).unwrap(), 4);
        assert_eq!(byte_len(10).unwrap(), 40);
        assert!(byte_len(usize::MAX / 4 + 1).is_err());
    }
}
