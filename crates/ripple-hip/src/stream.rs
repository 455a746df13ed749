//! The ordered asynchronous execution stream a command buffer records onto.
//!
//! [`StreamOps`] is the seam between command translation and the device:
//! operations execute and become memory-visible strictly in submission
//! order, and "asynchronous" describes only the gap between host-call
//! return and device-side completion.

use std::ffi::c_void;
use std::sync::Arc;

use ripple_hal::{DevicePtr, HalError, HalResult};

use crate::driver::{HipDriver, HipStreamRaw, HIP_SUCCESS};

/// Asynchronous operations accepted by an ordered execution stream.
pub trait StreamOps: Send + Sync {
    fn fill8_async(&self, dst: DevicePtr, value: u8, count: usize) -> HalResult<()>;
    fn fill16_async(&self, dst: DevicePtr, value: u16, count: usize) -> HalResult<()>;
    fn fill32_async(&self, dst: DevicePtr, value: u32, count: usize) -> HalResult<()>;

    /// Copy `length` bytes from host memory at `src` to the device. `src`
    /// must stay valid until stream ordering guarantees the copy completed;
    /// the command buffer stages through its arena to satisfy this.
    fn copy_host_to_device_async(
        &self,
        dst: DevicePtr,
        src: *const u8,
        length: usize,
    ) -> HalResult<()>;

    fn copy_device_to_device_async(
        &self,
        dst: DevicePtr,
        src: DevicePtr,
        length: usize,
    ) -> HalResult<()>;

    /// Launch a kernel. `params` is the argument-pointer array of the native
    /// launch convention; each element and its target must stay valid until
    /// stream ordering guarantees the launch consumed them.
    fn launch_kernel_async(
        &self,
        function: u64,
        grid: [u32; 3],
        block: [u32; 3],
        shared_memory_bytes: u32,
        params: &[*mut c_void],
    ) -> HalResult<()>;
}

/// A real HIP stream.
pub struct HipStream {
    driver: Arc<HipDriver>,
    raw: HipStreamRaw,
}

// SAFETY: HIP streams may be used from any thread; ordering comes from the
// stream itself.
unsafe impl Send for HipStream {}
unsafe impl Sync for HipStream {}

impl HipStream {
    pub fn create(driver: Arc<HipDriver>) -> HalResult<Self> {
        let raw = driver
            .stream_create()
            .map_err(|code| backend_err(&driver, "hipStreamCreate", code))?;
        Ok(Self { driver, raw })
    }

    pub fn raw(&self) -> HipStreamRaw {
        self.raw
    }

    /// Block the host until every submitted operation has completed.
    pub fn synchronize(&self) -> HalResult<()> {
        self.check("hipStreamSynchronize", self.driver.stream_synchronize(self.raw))
    }

    fn check(&self, call: &'static str, code: i32) -> HalResult<()> {
        if code == HIP_SUCCESS {
            Ok(())
        } else {
            Err(backend_err(&self.driver, call, code))
        }
    }
}

fn backend_err(driver: &HipDriver, call: &'static str, code: i32) -> HalError {
    HalError::BackendCall {
        call,
        code,
        name: driver.error_name(code),
    }
}

impl Drop for HipStream {
    fn drop(&mut self) {
        let code = self.driver.stream_destroy(self.raw);
        if code != HIP_SUCCESS {
            tracing::warn!(
                "hipStreamDestroy failed: {} ({})",
                self.driver.error_name(code),
                code
            );
        }
    }
}

impl StreamOps for HipStream {
    fn fill8_async(&self, dst: DevicePtr, value: u8, count: usize) -> HalResult<()> {
        self.check(
            "hipMemsetD8Async",
            self.driver.memset_d8_async(dst, value, count, self.raw),
        )
    }

    fn fill16_async(&self, dst: DevicePtr, value: u16, count: usize) -> HalResult<()> {
        self.check(
            "hipMemsetD16Async",
            self.driver.memset_d16_async(dst, value, count, self.raw),
        )
    }

    fn fill32_async(&self, dst: DevicePtr, value: u32, count: usize) -> HalResult<()> {
        self.check(
            "hipMemsetD32Async",
            self.driver.memset_d32_async(dst, value, count, self.raw),
        )
    }

    fn copy_host_to_device_async(
        &self,
        dst: DevicePtr,
        src: *const u8,
        length: usize,
    ) -> HalResult<()> {
        self.check(
            "hipMemcpyHtoDAsync",
            self.driver.memcpy_htod_async(dst, src, length, self.raw),
        )
    }

    fn copy_device_to_device_async(
        &self,
        dst: DevicePtr,
        src: DevicePtr,
        length: usize,
    ) -> HalResult<()> {
        self.check(
            "hipMemcpyDtoDAsync",
            self.driver.memcpy_dtod_async(dst, src, length, self.raw),
        )
    }

    fn launch_kernel_async(
        &self,
        function: u64,
        grid: [u32; 3],
        block: [u32; 3],
        shared_memory_bytes: u32,
        params: &[*mut c_void],
    ) -> HalResult<()> {
        // SAFETY: callers uphold the argument-array contract documented on
        // the trait; the pointer cast restores the launch ABI's mutable
        // array type.
        let code = unsafe {
            self.driver.module_launch_kernel(
                function as usize as *mut c_void,
                grid,
                block,
                shared_memory_bytes,
                self.raw,
                params.as_ptr() as *mut *mut c_void,
            )
        };
        self.check("hipModuleLaunchKernel", code)
    }
}
