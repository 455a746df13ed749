//! Loaded executable and per-entry-point kernel metadata.
//!
//! Compilation and module loading live elsewhere; the command buffer only
//! resolves (executable, entry point ordinal) to the launch parameters the
//! compiler side-channeled: native function handle, block shape, shared
//! memory size, and the argument layout.

use std::sync::Arc;

use ripple_hal::{HalError, HalResult};

use crate::pipeline_layout::PipelineLayout;

/// Launch metadata for one kernel entry point.
#[derive(Debug)]
pub struct KernelInfo {
    /// Native function handle, as produced by module load. Stored as a
    /// 64-bit value so the type is independent of host pointer width.
    pub function: u64,
    pub block_dims: [u32; 3],
    pub shared_memory_bytes: u32,
    pub layout: Arc<PipelineLayout>,
}

#[derive(Debug)]
pub struct Executable {
    entry_points: Vec<KernelInfo>,
}

impl Executable {
    pub fn new(entry_points: Vec<KernelInfo>) -> Arc<Self> {
        Arc::new(Self { entry_points })
    }

    pub fn entry_point_count(&self) -> usize {
        self.entry_points.len()
    }

    pub fn entry_point_kernel_info(&self, ordinal: usize) -> HalResult<&KernelInfo> {
        self.entry_points.get(ordinal).ok_or_else(|| {
            HalError::Internal(format!(
                "invalid entry point ordinal {} (executable has {})",
                ordinal,
                self.entry_points.len()
            ))
        })
    }
}
