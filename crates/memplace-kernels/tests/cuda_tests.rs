//! GPU integration tests for the memplace CUDA backend.
//! Run with: cargo test -p memplace-kernels --features cuda -- --nocapture

#![cfg(feature = "cuda")]

use std::sync::Arc;

use memplace_core::verify::verify;
use memplace_core::{DeviceKind, DeviceSelector, Placement, DEFAULT_TOLERANCE};
use memplace_kernels::cuda::{discover, CudaTarget};
use memplace_kernels::{allocate, execute, stage_in, stage_out, Backend, Platform, Queue};

fn cuda_queue() -> Option<Queue> {
    let target: CudaTarget = discover().into_iter().next()?;
    Some(Queue::new(Backend::Cuda(Arc::new(target))))
}

macro_rules! require_cuda {
    () => {
        match cuda_queue() {
            Some(q) => q,
            None => {
                eprintln!("CUDA not available, skipping");
                return;
            }
        }
    };
}

fn run_triad(queue: &Queue, placement: Placement, len: usize) -> usize {
    let mut set = allocate(queue, placement, len).expect("allocation failed");
    {
        let (x, y, z, w) = set.host_view_mut().into_parts();
        for (i, v) in x.iter_mut().enumerate() {
            *v = (i % 97) as f32 / 97.0;
        }
        y.fill(2.0);
        z.fill(0.25);
        w.fill(0.0);
    }
    stage_in(queue, &mut set).expect("stage in failed");
    execute(queue, &mut set, len).expect("kernel failed");
    stage_out(queue, &mut set).expect("stage out failed");
    verify(set.host_view(), DEFAULT_TOLERANCE).mismatch_count()
}

// ============================================================================
// Device discovery
// ============================================================================

#[test]
fn test_cuda_device_is_preferred() {
    let _ = require_cuda!();
    let q = Platform::discover().select(DeviceSelector::AcceleratorOnly).unwrap();
    assert_eq!(q.info().kind, DeviceKind::Accelerator);
    assert!(q.info().name.starts_with("cuda:"), "{}", q.info().name);
}

// ============================================================================
// Placements
// ============================================================================

#[test]
fn test_cuda_managed() {
    let q = require_cuda!();
    assert_eq!(run_triad(&q, Placement::Shared, 1 << 16), 0);
}

#[test]
fn test_cuda_mapped_pinned() {
    let q = require_cuda!();
    assert_eq!(run_triad(&q, Placement::HostPinned, 1 << 16), 0);
}

#[test]
fn test_cuda_device_private() {
    let q = require_cuda!();
    assert_eq!(run_triad(&q, Placement::DevicePrivate, 1 << 16), 0);
}

#[test]
fn test_cuda_odd_and_empty_lengths() {
    let q = require_cuda!();
    for placement in Placement::ALL {
        assert_eq!(run_triad(&q, placement, 1), 0);
        assert_eq!(run_triad(&q, placement, 1000), 0);
        assert_eq!(run_triad(&q, placement, 0), 0);
    }
}

#[test]
fn test_cuda_overrun_refused() {
    let q = require_cuda!();
    let mut set = allocate(&q, Placement::DevicePrivate, 32).unwrap();
    let err = execute(&q, &mut set, 33).unwrap_err();
    assert!(err.is_kernel(), "{err}");
}

#[test]
fn test_cuda_oversized_allocation_is_contained() {
    let q = require_cuda!();
    for placement in Placement::ALL {
        let err = allocate(&q, placement, usize::MAX / 4 + 2).unwrap_err();
        assert!(err.is_allocation(), "{placement}: {err}");
    }
}
