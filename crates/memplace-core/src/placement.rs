use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::DeviceSelector;

/// Where the four buffers of a run live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// USM-shared: one allocation visible to host and device, runtime-managed coherence.
    Shared,
    /// Page-locked host memory mapped into the device address space.
    HostPinned,
    /// Device-resident memory; host data moves through explicit staging copies.
    DevicePrivate,
}

impl Placement {
    /// Run order used by the harness.
    pub const ALL: [Placement; 3] = [
        Placement::Shared,
        Placement::HostPinned,
        Placement::DevicePrivate,
    ];

    /// Device selection policy for the queue serving this placement.
    pub fn selector(&self) -> DeviceSelector {
        match self {
            Placement::Shared | Placement::HostPinned => DeviceSelector::AnyDevice,
            Placement::DevicePrivate => DeviceSelector::AcceleratorOnly,
        }
    }

    /// Whether host data must be copied to and from the device explicitly.
    pub fn requires_staging(&self) -> bool {
        matches!(self, Placement::DevicePrivate)
    }

    /// Short label used in console output ("shared memory test...").
    pub fn label(&self) -> &'static str {
        match self {
            Placement::Shared => "shared",
            Placement::HostPinned => "host",
            Placement::DevicePrivate => "device",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Shared => write!(f, "shared"),
            Placement::HostPinned => write!(f, "host-pinned"),
            Placement::DevicePrivate => write!(f, "device-private"),
        }
    }
}
