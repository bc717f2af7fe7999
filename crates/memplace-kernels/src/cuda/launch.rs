//! CUDA kernel launcher with PTX compilation and caching.
//!
//! Compiles the triad source at runtime via NVRTC, caches the loaded
//! module per device, and launches over a 1-D grid.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use cudarc::driver::{CudaDevice, CudaFunction, LaunchAsync, LaunchConfig};
use parking_lot::Mutex;

use super::context::{CudaError, CudaTarget};

const TRIAD_CU: &str = include_str!("kernels/triad.cu");

const BLOCK_SIZE: usize = 256;

/// Registry of compiled PTX modules per device.
/// Key: (device_idx, module_name)
static LOADED: OnceLock<Mutex<HashSet<(usize, String)>>> = OnceLock::new();

fn loaded_set() -> &'static Mutex<HashSet<(usize, String)>> {
    LOADED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Ensure a PTX module is compiled and loaded on the given device.
/// No-op if already loaded.
pub fn ensure_module(
    device: &Arc<CudaDevice>,
    device_idx: usize,
    module_name: &str,
    func_names: &[&'static str],
    cu_source: &str,
) -> Result<(), CudaError> {
    let key = (device_idx, module_name.to_string());
    if loaded_set().lock().contains(&key) {
        return Ok(());
    }

    let ptx = cudarc::nvrtc::compile_ptx(cu_source).map_err(|e| CudaError::PtxCompile {
        module: module_name.to_string(),
        msg: e.to_string(),
    })?;

    device
        .load_ptx(ptx, module_name, func_names)
        .map_err(|e| CudaError::ModuleLoad {
            module: module_name.to_string(),
            msg: e.to_string(),
        })?;

    loaded_set().lock().insert(key);
    Ok(())
}

/// Get a kernel function handle, loading the module if needed.
pub fn get_or_load_func(
    device: &Arc<CudaDevice>,
    device_idx: usize,
    module_name: &str,
    func_name: &'static str,
    cu_source: &str,
) -> Result<CudaFunction, CudaError> {
    ensure_module(device, device_idx, module_name, &[func_name], cu_source)?;
    device
        .get_func(module_name, func_name)
        .ok_or_else(|| CudaError::FuncNotFound {
            module: module_name.to_string(),
            func: func_name.to_string(),
        })
}

/// Compute grid dimensions for a 1D kernel launch.
pub fn grid_1d(n: usize, block_size: usize) -> LaunchConfig {
    let grid = (n + block_size - 1) / block_size;
    LaunchConfig {
        grid_dim: (grid as u32, 1, 1),
        block_dim: (block_size as u32, 1, 1),
        shared_mem_bytes: 0,
    }
}

/// Launch `triad_f32` over `0..n` and wait for the device to finish.
///
/// Pointers may come from any placement; the caller guarantees each
/// addresses at least `n` elements.
pub fn launch_triad(target: &CudaTarget, x: u64, y: u64, z: u64, w: u64, n: usize) -> Result<(), CudaError> {
    if n == 0 {
        return Ok(());
    }
    let n32 = u32::try_from(n)
        .map_err(|_| CudaError::LaunchError(format!("range {} exceeds u32 indexing", n)))?;
    let f = get_or_load_func(&target.device, target.device_idx, "triad", "triad_f32", TRIAD_CU)?;
    let cfg = grid_1d(n, BLOCK_SIZE);
    unsafe {
        f.launch(cfg, (x, y, z, w, n32))
            .map_err(|e| CudaError::LaunchError(e.to_string()))?;
    }
    // Asynchronous faults surface at the next synchronization point.
    target
        .synchronize()
        .map_err(|e| CudaError::LaunchError(e.to_string()))
}
