//! CUDA backend for memplace.
//!
//! Provides:
//! - Device context management (lazy singleton per GPU)
//! - Managed, mapped-pinned and device allocations with host↔device copies
//! - Runtime PTX compilation and launch of the triad kernel

pub mod context;
pub mod memory;
pub mod launch;

pub use context::{discover, get_device, CudaError, CudaTarget};
pub use memory::{DeviceAlloc, UsmAlloc};
