use crate::device::DeviceSelector;
use crate::placement::Placement;

/// Errors raised while running a placement strategy.
///
/// Verification mismatches are not errors; they are counted in
/// [`Verification`](crate::Verification).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MemplaceError {
    #[error("no device matches selector {0}")]
    NoDevice(DeviceSelector),

    #[error("{placement} allocation of {len} f32 elements failed: {msg}")]
    Allocation {
        placement: Placement,
        len: usize,
        msg: String,
    },

    #[error("kernel execution failed: {0}")]
    KernelExecution(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("buffer length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("device backend error: {0}")]
    Backend(String),
}

impl MemplaceError {
    /// Whether this error ends a run before any buffer was usable.
    ///
    /// Device selection failure counts as an allocation failure: the
    /// strategy never obtained memory to work with.
    pub fn is_allocation(&self) -> bool {
        matches!(self, MemplaceError::NoDevice(_) | MemplaceError::Allocation { .. })
    }

    pub fn is_kernel(&self) -> bool {
        matches!(self, MemplaceError::KernelExecution(_))
    }
}
