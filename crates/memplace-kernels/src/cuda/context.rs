//! CUDA device context management.
//!
//! Provides lazy-initialized singleton `CudaDevice` handles per GPU index.
//! Uses `cudarc` for safe CUDA driver API access.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use cudarc::driver::CudaDevice;
use parking_lot::Mutex;

use memplace_core::{DeviceInfo, DeviceKind};

/// Upper bound on probed device ordinals.
const MAX_DEVICES: usize = 16;

/// Global registry of CUDA device handles (one per GPU index).
static DEVICES: OnceLock<Mutex<HashMap<usize, Arc<CudaDevice>>>> = OnceLock::new();

fn devices() -> &'static Mutex<HashMap<usize, Arc<CudaDevice>>> {
    DEVICES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Get or create a CUDA device handle for the given GPU index.
///
/// The device is lazily initialized on first access and cached for reuse.
pub fn get_device(device_idx: usize) -> Result<Arc<CudaDevice>, CudaError> {
    let mut map = devices().lock();
    if let Some(dev) = map.get(&device_idx) {
        return Ok(Arc::clone(dev));
    }
    let dev = CudaDevice::new(device_idx)
        .map_err(|e| CudaError::DeviceInit(format!("device {}: {}", device_idx, e)))?;
    map.insert(device_idx, Arc::clone(&dev));
    Ok(dev)
}

/// A CUDA device a queue can be bound to.
#[derive(Debug)]
pub struct CudaTarget {
    pub(crate) device: Arc<CudaDevice>,
    pub(crate) device_idx: usize,
    info: DeviceInfo,
}

impl CudaTarget {
    pub fn open(device_idx: usize) -> Result<Self, CudaError> {
        let device = get_device(device_idx)?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        Ok(Self {
            info: DeviceInfo::new(
                format!("cuda:{} {}", device_idx, name),
                DeviceKind::Accelerator,
                // Real GPUs outrank the emulated accelerator; lower ordinals win ties.
                100 + (MAX_DEVICES - device_idx) as u32,
            ),
            device,
            device_idx,
        })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Block until every stream on the device is idle.
    pub fn synchronize(&self) -> Result<(), CudaError> {
        self.device
            .synchronize()
            .map_err(|e| CudaError::Sync(e.to_string()))
    }
}

/// Open every CUDA device that initializes successfully.
pub fn discover() -> Vec<CudaTarget> {
    (0..MAX_DEVICES)
        .map_while(|idx| match CudaTarget::open(idx) {
            Ok(target) => Some(target),
            Err(e) => {
                if idx == 0 {
                    tracing::info!("no CUDA device available: {}", e);
                }
                None
            }
        })
        .collect()
}

/// CUDA-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum CudaError {
    #[error("CUDA device init failed: {0}")]
    DeviceInit(String),

    #[error("PTX compilation failed for module '{module}': {msg}")]
    PtxCompile { module: String, msg: String },

    #[error("Failed to load module '{module}': {msg}")]
    ModuleLoad { module: String, msg: String },

    #[error("Function '{func}' not found in module '{module}'")]
    FuncNotFound { module: String, func: String },

    #[error("CUDA kernel launch failed: {0}")]
    LaunchError(String),

    #[error("CUDA memory error: {0}")]
    MemoryError(String),

    #[error("CUDA synchronize failed: {0}")]
    Sync(String),
}
