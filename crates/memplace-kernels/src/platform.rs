//! Device discovery and queue construction.
//!
//! A `Platform` lists the devices visible to the process; a `Queue` binds
//! one of them, chosen by a `DeviceSelector`, and is what the allocator,
//! transfer manager and executor operate through.

use std::sync::Arc;

use memplace_core::{DeviceInfo, DeviceSelector, MemplaceError, Result};

use crate::emulated::EmulatedDevice;

/// A concrete device implementation.
#[derive(Debug, Clone)]
pub enum Backend {
    Emulated(Arc<EmulatedDevice>),
    #[cfg(feature = "cuda")]
    Cuda(Arc<crate::cuda::CudaTarget>),
}

impl Backend {
    pub fn info(&self) -> &DeviceInfo {
        match self {
            Backend::Emulated(dev) => dev.info(),
            #[cfg(feature = "cuda")]
            Backend::Cuda(target) => target.info(),
        }
    }
}

impl From<EmulatedDevice> for Backend {
    fn from(dev: EmulatedDevice) -> Self {
        Backend::Emulated(Arc::new(dev))
    }
}

/// In-order queue bound to a single device.
#[derive(Debug, Clone)]
pub struct Queue {
    backend: Backend,
}

impl Queue {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn info(&self) -> &DeviceInfo {
        self.backend.info()
    }

    /// Block until all work submitted to the device has completed.
    pub fn wait(&self) -> Result<()> {
        match &self.backend {
            // Emulated operations complete before they return.
            Backend::Emulated(_) => Ok(()),
            #[cfg(feature = "cuda")]
            Backend::Cuda(target) => target
                .synchronize()
                .map_err(|e| MemplaceError::Backend(e.to_string())),
        }
    }
}

/// The set of devices a queue can be built on.
#[derive(Debug, Clone)]
pub struct Platform {
    devices: Vec<Backend>,
}

impl Platform {
    /// Every device visible to the process: CUDA GPUs (with the `cuda`
    /// feature), the emulated accelerator and the host CPU.
    pub fn discover() -> Self {
        #[allow(unused_mut)]
        let mut devices: Vec<Backend> = Vec::new();
        #[cfg(feature = "cuda")]
        devices.extend(crate::cuda::discover().into_iter().map(|t| Backend::Cuda(Arc::new(t))));
        let platform = Self::with_devices(devices.into_iter().chain(Self::emulated().devices));
        for dev in &platform.devices {
            tracing::debug!("discovered device {}", dev.info());
        }
        platform
    }

    /// The emulated accelerator plus the host CPU.
    pub fn emulated() -> Self {
        Self::with_devices([
            EmulatedDevice::accelerator().into(),
            EmulatedDevice::host().into(),
        ])
    }

    /// Only the host CPU; `AcceleratorOnly` selection fails on this platform.
    pub fn host_only() -> Self {
        Self::with_devices([EmulatedDevice::host().into()])
    }

    pub fn with_devices(devices: impl IntoIterator<Item = Backend>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
        }
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.iter().map(Backend::info)
    }

    /// Build a queue on the highest-scoring device the selector accepts.
    /// Ties go to the device listed first.
    pub fn select(&self, selector: DeviceSelector) -> Result<Queue> {
        let backend = self
            .devices
            .iter()
            .filter(|b| selector.accepts(b.info().kind))
            .fold(None::<&Backend>, |best, b| match best {
                Some(cur) if cur.info().score >= b.info().score => Some(cur),
                _ => Some(b),
            })
            .ok_or(MemplaceError::NoDevice(selector))?;

        tracing::info!("selected {} for {} queue", backend.info(), selector);
        Ok(Queue::new(backend.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memplace_core::DeviceKind;

    #[test]
    fn test_any_device_prefers_accelerator() {
        let q = Platform::emulated().select(DeviceSelector::AnyDevice).unwrap();
        assert_eq!(q.info().kind, DeviceKind::Accelerator);
    }

    #[test]
    fn test_any_device_falls_back_to_host() {
        let q = Platform::host_only().select(DeviceSelector::AnyDevice).unwrap();
        assert_eq!(q.info().kind, DeviceKind::Host);
    }

    #[test]
    fn test_accelerator_only_without_accelerator() {
        let err = Platform::host_only()
            .select(DeviceSelector::AcceleratorOnly)
            .unwrap_err();
        assert_eq!(err, MemplaceError::NoDevice(DeviceSelector::AcceleratorOnly));
        assert!(err.is_allocation());
    }

    #[test]
    fn test_empty_platform() {
        let p = Platform::with_devices([]);
        assert!(p.select(DeviceSelector::AnyDevice).is_err());
        assert_eq!(p.devices().count(), 0);
    }

    #[test]
    fn test_discover_always_has_emulated_devices() {
        let p = Platform::discover();
        let names: Vec<_> = p.devices().map(|d| d.name.clone()).collect();
        assert!(names.contains(&"emulated-accelerator".to_string()));
        assert!(names.contains(&"host-cpu".to_string()));
    }

    #[test]
    fn test_queue_wait() {
        let q = Platform::emulated().select(DeviceSelector::AnyDevice).unwrap();
        assert!(q.wait().is_ok());
    }
}
