//! Shared test support: a deferred-execution stream fake.
//!
//! Submitted operations queue until `sync()`, which applies them in
//! submission order against host-simulated device memory (a `DevicePtr` is
//! an offset into the flat memory vector). Host-source copies read their
//! source pointer at execution time, not submission time, so staging bugs
//! in the command buffer show up as test failures.

#![allow(dead_code)]

use std::ffi::c_void;

use parking_lot::Mutex;

use ripple_hal::{DevicePtr, HalResult};
use ripple_hip::stream::StreamOps;

pub const FAKE_MEMORY_SIZE: usize = 1 << 20;

enum PendingOp {
    Fill8 {
        dst: DevicePtr,
        value: u8,
        count: usize,
    },
    Fill16 {
        dst: DevicePtr,
        value: u16,
        count: usize,
    },
    Fill32 {
        dst: DevicePtr,
        value: u32,
        count: usize,
    },
    CopyHtoD {
        dst: DevicePtr,
        src: *const u8,
        length: usize,
    },
    CopyDtoD {
        dst: DevicePtr,
        src: DevicePtr,
        length: usize,
    },
    Launch {
        function: u64,
        grid: [u32; 3],
        block: [u32; 3],
        shared_memory_bytes: u32,
        params_base: usize,
        params: Vec<*mut c_void>,
    },
}

/// One kernel launch as observed at execution time.
#[derive(Clone)]
pub struct LaunchRecord {
    pub function: u64,
    pub grid: [u32; 3],
    pub block: [u32; 3],
    pub shared_memory_bytes: u32,
    /// Address of the argument-pointer array itself.
    pub params_base: usize,
    /// The argument pointers, i.e. the address of each payload slot.
    pub param_ptrs: Vec<usize>,
    /// Each payload slot read back at pointer width (descriptor addresses).
    pub payload_u64: Vec<u64>,
    /// Each payload slot read back at push-constant width.
    pub payload_u32: Vec<u32>,
}

struct FakeState {
    memory: Vec<u8>,
    pending: Vec<PendingOp>,
    launches: Vec<LaunchRecord>,
}

pub struct FakeStream {
    state: Mutex<FakeState>,
}

// SAFETY: the queued raw pointers are only dereferenced under the lock in
// `sync`, while the memory they target (command-buffer arenas and test
// buffers) is kept alive by the test.
unsafe impl Send for FakeStream {}
unsafe impl Sync for FakeStream {}

impl FakeStream {
    pub fn new() -> std::sync::Arc<Self> {
        ripple_common::logging::try_init_logging();
        std::sync::Arc::new(Self {
            state: Mutex::new(FakeState {
                memory: vec![0; FAKE_MEMORY_SIZE],
                pending: Vec::new(),
                launches: Vec::new(),
            }),
        })
    }

    /// Number of submitted but not yet executed operations.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Execute every queued operation in submission order.
    pub fn sync(&self) {
        let mut state = self.state.lock();
        let ops = std::mem::take(&mut state.pending);
        for op in ops {
            match op {
                PendingOp::Fill8 { dst, value, count } => {
                    let dst = dst as usize;
                    state.memory[dst..dst + count].fill(value);
                }
                PendingOp::Fill16 { dst, value, count } => {
                    let dst = dst as usize;
                    for i in 0..count {
                        state.memory[dst + i * 2..dst + i * 2 + 2]
                            .copy_from_slice(&value.to_ne_bytes());
                    }
                }
                PendingOp::Fill32 { dst, value, count } => {
                    let dst = dst as usize;
                    for i in 0..count {
                        state.memory[dst + i * 4..dst + i * 4 + 4]
                            .copy_from_slice(&value.to_ne_bytes());
                    }
                }
                PendingOp::CopyHtoD { dst, src, length } => {
                    // SAFETY: the test keeps the staged source alive until
                    // after sync; see the struct-level contract.
                    let source = unsafe { std::slice::from_raw_parts(src, length) };
                    let dst = dst as usize;
                    state.memory[dst..dst + length].copy_from_slice(source);
                }
                PendingOp::CopyDtoD { dst, src, length } => {
                    let (dst, src) = (dst as usize, src as usize);
                    state.memory.copy_within(src..src + length, dst);
                }
                PendingOp::Launch {
                    function,
                    grid,
                    block,
                    shared_memory_bytes,
                    params_base,
                    params,
                } => {
                    let param_ptrs: Vec<usize> = params.iter().map(|p| *p as usize).collect();
                    // SAFETY: argument pointers target live arena payload
                    // slots; see the struct-level contract.
                    let payload_u64: Vec<u64> = params
                        .iter()
                        .map(|p| unsafe { std::ptr::read(*p as *const u64) })
                        .collect();
                    let payload_u32: Vec<u32> = params
                        .iter()
                        .map(|p| unsafe { std::ptr::read(*p as *const u32) })
                        .collect();
                    state.launches.push(LaunchRecord {
                        function,
                        grid,
                        block,
                        shared_memory_bytes,
                        params_base,
                        param_ptrs,
                        payload_u64,
                        payload_u32,
                    });
                }
            }
        }
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.state.lock().launches.clone()
    }

    pub fn read_memory(&self, offset: u64, length: usize) -> Vec<u8> {
        let offset = offset as usize;
        self.state.lock().memory[offset..offset + length].to_vec()
    }

    pub fn write_memory(&self, offset: u64, bytes: &[u8]) {
        let offset = offset as usize;
        self.state.lock().memory[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl StreamOps for FakeStream {
    fn fill8_async(&self, dst: DevicePtr, value: u8, count: usize) -> HalResult<()> {
        self.state
            .lock()
            .pending
            .push(PendingOp::Fill8 { dst, value, count });
        Ok(())
    }

    fn fill16_async(&self, dst: DevicePtr, value: u16, count: usize) -> HalResult<()> {
        self.state
            .lock()
            .pending
            .push(PendingOp::Fill16 { dst, value, count });
        Ok(())
    }

    fn fill32_async(&self, dst: DevicePtr, value: u32, count: usize) -> HalResult<()> {
        self.state
            .lock()
            .pending
            .push(PendingOp::Fill32 { dst, value, count });
        Ok(())
    }

    fn copy_host_to_device_async(
        &self,
        dst: DevicePtr,
        src: *const u8,
        length: usize,
    ) -> HalResult<()> {
        self.state
            .lock()
            .pending
            .push(PendingOp::CopyHtoD { dst, src, length });
        Ok(())
    }

    fn copy_device_to_device_async(
        &self,
        dst: DevicePtr,
        src: DevicePtr,
        length: usize,
    ) -> HalResult<()> {
        self.state
            .lock()
            .pending
            .push(PendingOp::CopyDtoD { dst, src, length });
        Ok(())
    }

    fn launch_kernel_async(
        &self,
        function: u64,
        grid: [u32; 3],
        block: [u32; 3],
        shared_memory_bytes: u32,
        params: &[*mut c_void],
    ) -> HalResult<()> {
        self.state.lock().pending.push(PendingOp::Launch {
            function,
            grid,
            block,
            shared_memory_bytes,
            params_base: params.as_ptr() as usize,
            params: params.to_vec(),
        });
        Ok(())
    }
}
