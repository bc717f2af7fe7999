//! Buffer allocation for the three placement strategies.
//!
//! Shared and host-pinned placement hand out [`UsmBuffer`]s that host code
//! reads and writes directly and kernels consume without copies.
//! Device-private placement hands out [`DeviceBuffer`]s, which have no host
//! accessor at all, together with host staging vectors.

use memplace_core::quad::{Extent, FixedExtent};
use memplace_core::{MemplaceError, Placement, Quad, Result};

use crate::emulated::EmulatedAlloc;
use crate::platform::{Backend, Queue};

#[derive(Debug)]
enum UsmRepr {
    Emulated(EmulatedAlloc),
    #[cfg(feature = "cuda")]
    Cuda(crate::cuda::UsmAlloc),
}

/// Host- and device-visible buffer (shared or host-pinned placement).
#[derive(Debug)]
pub struct UsmBuffer {
    placement: Placement,
    len: usize,
    repr: UsmRepr,
}

impl UsmBuffer {
    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        match &self.repr {
            UsmRepr::Emulated(a) => a.as_slice(),
            #[cfg(feature = "cuda")]
            UsmRepr::Cuda(a) => a.as_slice(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        match &mut self.repr {
            UsmRepr::Emulated(a) => a.as_mut_slice(),
            #[cfg(feature = "cuda")]
            UsmRepr::Cuda(a) => a.as_mut_slice(),
        }
    }
}

impl AsRef<[f32]> for UsmBuffer {
    fn as_ref(&self) -> &[f32] {
        self.as_slice()
    }
}

impl AsMut<[f32]> for UsmBuffer {
    fn as_mut(&mut self) -> &mut [f32] {
        self.as_mut_slice()
    }
}

impl Extent for UsmBuffer {
    fn extent(&self) -> usize {
        self.len
    }
}

impl FixedExtent for UsmBuffer {}

#[derive(Debug)]
pub(crate) enum DeviceRepr {
    Emulated(EmulatedAlloc),
    #[cfg(feature = "cuda")]
    Cuda(crate::cuda::DeviceAlloc),
}

/// Device-private buffer.
///
/// Deliberately exposes neither slices nor `AsRef<[f32]>`: its contents are
/// reachable from host code only through `transfer::copy_to_host`.
#[derive(Debug)]
pub struct DeviceBuffer {
    len: usize,
    pub(crate) repr: DeviceRepr,
}

impl DeviceBuffer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the allocation in bytes.
    pub fn byte_count(&self) -> usize {
        self.len * std::mem::size_of::<f32>()
    }
}

impl Extent for DeviceBuffer {
    fn extent(&self) -> usize {
        self.len
    }
}

impl FixedExtent for DeviceBuffer {}

/// Device-side view of a buffer handed to a kernel launch.
pub(crate) trait KernelOperand: FixedExtent {
    fn emulated(&self) -> Option<&[f32]>;

    fn emulated_mut(&mut self) -> Option<&mut [f32]>;

    #[cfg(feature = "cuda")]
    fn cuda_ptr(&self) -> Option<u64>;
}

impl KernelOperand for UsmBuffer {
    fn emulated(&self) -> Option<&[f32]> {
        match &self.repr {
            UsmRepr::Emulated(a) => Some(a.as_slice()),
            #[cfg(feature = "cuda")]
            _ => None,
        }
    }

    fn emulated_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.repr {
            UsmRepr::Emulated(a) => Some(a.as_mut_slice()),
            #[cfg(feature = "cuda")]
            _ => None,
        }
    }

    #[cfg(feature = "cuda")]
    fn cuda_ptr(&self) -> Option<u64> {
        match &self.repr {
            UsmRepr::Cuda(a) => Some(a.device_ptr()),
            _ => None,
        }
    }
}

impl KernelOperand for DeviceBuffer {
    fn emulated(&self) -> Option<&[f32]> {
        match &self.repr {
            DeviceRepr::Emulated(a) => Some(a.as_slice()),
            #[cfg(feature = "cuda")]
            _ => None,
        }
    }

    fn emulated_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.repr {
            DeviceRepr::Emulated(a) => Some(a.as_mut_slice()),
            #[cfg(feature = "cuda")]
            _ => None,
        }
    }

    #[cfg(feature = "cuda")]
    fn cuda_ptr(&self) -> Option<u64> {
        match &self.repr {
            DeviceRepr::Cuda(a) => Some(a.device_ptr()),
            _ => None,
        }
    }
}

/// All buffers of one strategy run.
#[derive(Debug)]
pub enum BufferSet {
    /// Shared or host-pinned: one set of buffers visible on both sides.
    Usm(Quad<UsmBuffer>),
    /// Device-private buffers plus the host staging vectors that feed them.
    Staged {
        device: Quad<DeviceBuffer>,
        host: Quad<Vec<f32>>,
    },
}

impl BufferSet {
    pub fn placement(&self) -> Placement {
        match self {
            BufferSet::Usm(q) => q.x().placement(),
            BufferSet::Staged { .. } => Placement::DevicePrivate,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BufferSet::Usm(q) => q.len(),
            BufferSet::Staged { device, .. } => device.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The buffers host code may read: the USM buffers themselves, or the
    /// staging vectors for device-private placement.
    pub fn host_view(&self) -> Quad<&[f32]> {
        match self {
            BufferSet::Usm(q) => q.view(),
            BufferSet::Staged { host, .. } => host.view(),
        }
    }

    pub fn host_view_mut(&mut self) -> Quad<&mut [f32]> {
        match self {
            BufferSet::Usm(q) => q.view_mut(),
            BufferSet::Staged { host, .. } => host.view_mut(),
        }
    }
}

/// Allocate the four buffers of a run with the given placement on `queue`.
///
/// On failure every buffer acquired so far is dropped, which frees it.
pub fn allocate(queue: &Queue, placement: Placement, len: usize) -> Result<BufferSet> {
    let set = match placement {
        Placement::Shared | Placement::HostPinned => {
            let alloc = || alloc_usm(queue, placement, len);
            BufferSet::Usm(Quad::new(alloc()?, alloc()?, alloc()?, alloc()?)?)
        }
        Placement::DevicePrivate => {
            let alloc = || alloc_device(queue, len);
            let device = Quad::new(alloc()?, alloc()?, alloc()?, alloc()?)?;
            let host = Quad::zeroed_host(len).map_err(|e| MemplaceError::Allocation {
                placement,
                len,
                msg: format!("host staging: {}", e),
            })?;
            BufferSet::Staged { device, host }
        }
    };
    tracing::debug!("allocated 4 x {} f32 ({}) on {}", len, placement, queue.info().name);
    Ok(set)
}

/// Free every allocation in `set`.
pub fn release(set: BufferSet) {
    let (placement, len) = (set.placement(), set.len());
    drop(set);
    tracing::debug!("released 4 x {} f32 ({})", len, placement);
}

fn alloc_usm(queue: &Queue, placement: Placement, len: usize) -> Result<UsmBuffer> {
    let repr = match queue.backend() {
        Backend::Emulated(dev) => UsmRepr::Emulated(dev.alloc(placement, len)?),
        #[cfg(feature = "cuda")]
        Backend::Cuda(target) => {
            let alloc = match placement {
                Placement::HostPinned => crate::cuda::UsmAlloc::mapped_pinned(&target.device, len),
                _ => crate::cuda::UsmAlloc::managed(&target.device, len),
            };
            UsmRepr::Cuda(alloc.map_err(|e| MemplaceError::Allocation {
                placement,
                len,
                msg: e.to_string(),
            })?)
        }
    };
    Ok(UsmBuffer { placement, len, repr })
}

fn alloc_device(queue: &Queue, len: usize) -> Result<DeviceBuffer> {
    let repr = match queue.backend() {
        Backend::Emulated(dev) => DeviceRepr::Emulated(dev.alloc(Placement::DevicePrivate, len)?),
        #[cfg(feature = "cuda")]
        Backend::Cuda(target) => DeviceRepr::Cuda(
            crate::cuda::DeviceAlloc::zeros(&target.device, len).map_err(|e| {
                MemplaceError::Allocation {
                    placement: Placement::DevicePrivate,
                    len,
                    msg: e.to_string(),
                }
            })?,
        ),
    };
    Ok(DeviceBuffer { len, repr })
}
