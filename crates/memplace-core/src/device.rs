use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad class of a compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// The host CPU acting as its own device.
    Host,
    /// A discrete or integrated accelerator (GPU, or the emulated accelerator).
    Accelerator,
}

/// Queue construction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSelector {
    /// Best available device, accelerators preferred, host as fallback.
    AnyDevice,
    /// Accelerators only; selection fails if none is present.
    AcceleratorOnly,
}

impl DeviceSelector {
    /// Whether a device of `kind` may serve a queue built with this selector.
    pub fn accepts(&self, kind: DeviceKind) -> bool {
        match self {
            DeviceSelector::AnyDevice => true,
            DeviceSelector::AcceleratorOnly => kind == DeviceKind::Accelerator,
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::AnyDevice => write!(f, "any-device"),
            DeviceSelector::AcceleratorOnly => write!(f, "accelerator-only"),
        }
    }
}

/// Static description of a device a queue can be built on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human-readable name, e.g. `cuda:0 NVIDIA A100` or `emulated-accelerator`.
    pub name: String,
    pub kind: DeviceKind,
    /// Selection preference among accepted devices; higher wins.
    pub score: u32,
}

impl DeviceInfo {
    pub fn new(name: impl Into<String>, kind: DeviceKind, score: u32) -> Self {
        Self { name: name.into(), kind, score }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DeviceKind::Host => "host",
            DeviceKind::Accelerator => "accelerator",
        };
        write!(f, "{} ({})", self.name, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_accepts() {
        assert!(DeviceSelector::AnyDevice.accepts(DeviceKind::Host));
        assert!(DeviceSelector::AnyDevice.accepts(DeviceKind::Accelerator));
        assert!(!DeviceSelector::AcceleratorOnly.accepts(DeviceKind::Host));
        assert!(DeviceSelector::AcceleratorOnly.accepts(DeviceKind::Accelerator));
    }

    #[test]
    fn test_display() {
        let info = DeviceInfo::new("emulated-accelerator", DeviceKind::Accelerator, 10);
        assert_eq!(format!("{}", info), "emulated-accelerator (accelerator)");
        assert_eq!(format!("{}", DeviceSelector::AcceleratorOnly), "accelerator-only");
    }
}
