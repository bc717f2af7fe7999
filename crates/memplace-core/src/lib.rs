//! # memplace-core
//!
//! Domain types shared by every memplace crate.
//!
//! Provides:
//! - The closed set of memory placement strategies (`Placement`)
//! - Device descriptors and selection policy (`DeviceKind`, `DeviceSelector`)
//! - `Quad<B>`: the four equal-length X/Y/Z/W buffers of one run
//! - Input initialization and host-side verification of the triad kernel
//! - The workspace error type

pub mod placement;
pub mod device;
pub mod error;
pub mod quad;
pub mod init;
pub mod verify;

pub use placement::Placement;
pub use device::{DeviceInfo, DeviceKind, DeviceSelector};
pub use error::MemplaceError;
pub use quad::Quad;
pub use verify::{Mismatch, Verification, DEFAULT_TOLERANCE};

pub type Result<T> = std::result::Result<T, MemplaceError>;

/// The elementwise kernel body: `w = x * y + z`.
///
/// Every backend and the host verifier evaluate exactly this expression.
#[inline(always)]
pub fn triad(x: f32, y: f32, z: f32) -> f32 {
    x * y + z
}
