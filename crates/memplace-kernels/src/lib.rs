//! # memplace-kernels
//!
//! Device runtime for memplace: everything that touches device memory or
//! launches work.
//!
//! Provides:
//! - Device discovery and selector-driven queue construction
//! - USM (shared, host-pinned) and device-private allocation
//! - Blocking host↔device staging copies
//! - Triad kernel dispatch with completion wait
//! - An emulated accelerator (always available) and a CUDA backend
//!   (behind the `cuda` feature flag)

pub mod platform;
pub mod emulated;
pub mod memory;
pub mod transfer;
pub mod executor;

#[cfg(feature = "cuda")]
pub mod cuda;

pub use emulated::{CopyDirection, EmulatedDevice};
pub use executor::{execute, KernelRun};
pub use memory::{allocate, release, BufferSet, DeviceBuffer, UsmBuffer};
pub use platform::{Backend, Platform, Queue};
pub use transfer::{stage_in, stage_out};
