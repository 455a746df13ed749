//! Dynamic loading of the HIP runtime library.
//!
//! Uses `libloading` to load `amdhip64.dll` (Windows) or `libamdhip64.so`
//! (Linux) and provides safe Rust wrappers around the raw HIP runtime API
//! functions this backend submits to its streams.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::sync::Arc;

use libloading::{Library, Symbol};
use tracing::{debug, info};

/// HIP result type (hipError_t).
pub type HipResult = c_int;

/// Opaque HIP types (represented as pointers).
pub type HipStreamRaw = *mut c_void;
pub type HipModule = *mut c_void;
pub type HipFunction = *mut c_void;

/// Device address width is fixed at 64 bits regardless of host pointer width.
pub type HipDeviceptr = u64;

pub const HIP_SUCCESS: HipResult = 0;

/// Function pointer type definitions for the HIP runtime API.
type FnHipInit = unsafe extern "C" fn(flags: c_uint) -> HipResult;
type FnHipGetDeviceCount = unsafe extern "C" fn(count: *mut c_int) -> HipResult;
type FnHipStreamCreate = unsafe extern "C" fn(stream: *mut HipStreamRaw) -> HipResult;
type FnHipStreamDestroy = unsafe extern "C" fn(stream: HipStreamRaw) -> HipResult;
type FnHipStreamSynchronize = unsafe extern "C" fn(stream: HipStreamRaw) -> HipResult;

// Async memory operations
type FnHipMemsetD8Async = unsafe extern "C" fn(
    dst: HipDeviceptr,
    value: u8,
    count: usize,
    stream: HipStreamRaw,
) -> HipResult;
type FnHipMemsetD16Async = unsafe extern "C" fn(
    dst: HipDeviceptr,
    value: u16,
    count: usize,
    stream: HipStreamRaw,
) -> HipResult;
type FnHipMemsetD32Async = unsafe extern "C" fn(
    dst: HipDeviceptr,
    value: c_int,
    count: usize,
    stream: HipStreamRaw,
) -> HipResult;
type FnHipMemcpyHtoDAsync = unsafe extern "C" fn(
    dst: HipDeviceptr,
    src: *const c_void,
    byte_count: usize,
    stream: HipStreamRaw,
) -> HipResult;
type FnHipMemcpyDtoDAsync = unsafe extern "C" fn(
    dst: HipDeviceptr,
    src: HipDeviceptr,
    byte_count: usize,
    stream: HipStreamRaw,
) -> HipResult;

// Module and kernel management
type FnHipModuleLoadData =
    unsafe extern "C" fn(module: *mut HipModule, image: *const c_void) -> HipResult;
type FnHipModuleUnload = unsafe extern "C" fn(module: HipModule) -> HipResult;
type FnHipModuleGetFunction = unsafe extern "C" fn(
    function: *mut HipFunction,
    module: HipModule,
    name: *const c_char,
) -> HipResult;
type FnHipModuleLaunchKernel = unsafe extern "C" fn(
    function: HipFunction,
    grid_x: c_uint,
    grid_y: c_uint,
    grid_z: c_uint,
    block_x: c_uint,
    block_y: c_uint,
    block_z: c_uint,
    shared_mem_bytes: c_uint,
    stream: HipStreamRaw,
    kernel_params: *mut *mut c_void,
    extra: *mut *mut c_void,
) -> HipResult;
type FnHipGetErrorName = unsafe extern "C" fn(error: HipResult) -> *const c_char;

/// Loaded HIP runtime with the symbols the stream backend calls.
pub struct HipDriver {
    hip_init: FnHipInit,
    hip_get_device_count: FnHipGetDeviceCount,
    hip_stream_create: FnHipStreamCreate,
    hip_stream_destroy: FnHipStreamDestroy,
    hip_stream_synchronize: FnHipStreamSynchronize,
    hip_memset_d8_async: FnHipMemsetD8Async,
    hip_memset_d16_async: FnHipMemsetD16Async,
    hip_memset_d32_async: FnHipMemsetD32Async,
    hip_memcpy_htod_async: FnHipMemcpyHtoDAsync,
    hip_memcpy_dtod_async: FnHipMemcpyDtoDAsync,
    hip_module_load_data: FnHipModuleLoadData,
    hip_module_unload: FnHipModuleUnload,
    hip_module_get_function: FnHipModuleGetFunction,
    hip_module_launch_kernel: FnHipModuleLaunchKernel,
    hip_get_error_name: Option<FnHipGetErrorName>,
    _lib: Library,
}

// SAFETY: HIP runtime entry points are callable from any thread; stream
// ordering is the synchronization model.
unsafe impl Send for HipDriver {}
unsafe impl Sync for HipDriver {}

impl HipDriver {
    /// Load the HIP runtime and resolve the symbols this backend uses.
    /// `path_override` replaces the platform library search list.
    pub fn load(path_override: Option<&str>) -> Result<Arc<Self>, String> {
        unsafe {
            let lib = Self::load_library(path_override)?;

            let driver = Self {
                hip_init: Self::load_fn(&lib, "hipInit")?,
                hip_get_device_count: Self::load_fn(&lib, "hipGetDeviceCount")?,
                hip_stream_create: Self::load_fn(&lib, "hipStreamCreate")?,
                hip_stream_destroy: Self::load_fn(&lib, "hipStreamDestroy")?,
                hip_stream_synchronize: Self::load_fn(&lib, "hipStreamSynchronize")?,
                hip_memset_d8_async: Self::load_fn(&lib, "hipMemsetD8Async")?,
                hip_memset_d16_async: Self::load_fn(&lib, "hipMemsetD16Async")?,
                hip_memset_d32_async: Self::load_fn(&lib, "hipMemsetD32Async")?,
                hip_memcpy_htod_async: Self::load_fn(&lib, "hipMemcpyHtoDAsync")?,
                hip_memcpy_dtod_async: Self::load_fn(&lib, "hipMemcpyDtoDAsync")?,
                hip_module_load_data: Self::load_fn(&lib, "hipModuleLoadData")?,
                hip_module_unload: Self::load_fn(&lib, "hipModuleUnload")?,
                hip_module_get_function: Self::load_fn(&lib, "hipModuleGetFunction")?,
                hip_module_launch_kernel: Self::load_fn(&lib, "hipModuleLaunchKernel")?,
                hip_get_error_name: Self::load_fn_opt(&lib, "hipGetErrorName"),
                _lib: lib,
            };

            info!("HIP runtime loaded successfully");
            Ok(Arc::new(driver))
        }
    }

    fn load_library(path_override: Option<&str>) -> Result<Library, String> {
        #[cfg(target_os = "windows")]
        let lib_names: &[&str] = &["amdhip64.dll"];

        #[cfg(not(target_os = "windows"))]
        let lib_names: &[&str] = &["libamdhip64.so.6", "libamdhip64.so"];

        let names: Vec<&str> = match path_override {
            Some(path) => vec![path],
            None => lib_names.to_vec(),
        };

        let mut last_err = String::new();
        for name in names {
            match unsafe { Library::new(name) } {
                Ok(lib) => {
                    info!("loaded HIP runtime from: {}", name);
                    return Ok(lib);
                }
                Err(e) => {
                    last_err = format!("{}: {}", name, e);
                    debug!("failed to load {}: {}", name, e);
                }
            }
        }

        Err(format!("failed to load HIP runtime library: {}", last_err))
    }

    unsafe fn load_fn<F: Copy>(lib: &Library, name: &str) -> Result<F, String> {
        let sym: Symbol<F> = unsafe { lib.get(name.as_bytes()) }
            .map_err(|e| format!("failed to load {}: {}", name, e))?;
        Ok(*sym)
    }

    unsafe fn load_fn_opt<F: Copy>(lib: &Library, name: &str) -> Option<F> {
        unsafe { lib.get(name.as_bytes()) }.ok().map(|s: Symbol<F>| *s)
    }

    /// Resolve a readable name for a HIP error code.
    pub fn error_name(&self, code: HipResult) -> String {
        if let Some(func) = self.hip_get_error_name {
            let ptr = unsafe { func(code) };
            if !ptr.is_null() {
                let name = unsafe { CStr::from_ptr(ptr) };
                return name.to_string_lossy().into_owned();
            }
        }
        format!("hipError#{}", code)
    }

    // ── Initialization ────────────────────────────────────────────

    pub fn init(&self, flags: u32) -> HipResult {
        unsafe { (self.hip_init)(flags as c_uint) }
    }

    pub fn get_device_count(&self) -> Result<i32, HipResult> {
        let mut count: c_int = 0;
        let res = unsafe { (self.hip_get_device_count)(&mut count) };
        if res == HIP_SUCCESS { Ok(count) } else { Err(res) }
    }

    // ── Streams ───────────────────────────────────────────────────

    pub fn stream_create(&self) -> Result<HipStreamRaw, HipResult> {
        let mut stream: HipStreamRaw = std::ptr::null_mut();
        let res = unsafe { (self.hip_stream_create)(&mut stream) };
        if res == HIP_SUCCESS { Ok(stream) } else { Err(res) }
    }

    pub fn stream_destroy(&self, stream: HipStreamRaw) -> HipResult {
        unsafe { (self.hip_stream_destroy)(stream) }
    }

    pub fn stream_synchronize(&self, stream: HipStreamRaw) -> HipResult {
        unsafe { (self.hip_stream_synchronize)(stream) }
    }

    // ── Async memory operations ───────────────────────────────────

    pub fn memset_d8_async(
        &self,
        dst: HipDeviceptr,
        value: u8,
        count: usize,
        stream: HipStreamRaw,
    ) -> HipResult {
        unsafe { (self.hip_memset_d8_async)(dst, value, count, stream) }
    }

    pub fn memset_d16_async(
        &self,
        dst: HipDeviceptr,
        value: u16,
        count: usize,
        stream: HipStreamRaw,
    ) -> HipResult {
        unsafe { (self.hip_memset_d16_async)(dst, value, count, stream) }
    }

    pub fn memset_d32_async(
        &self,
        dst: HipDeviceptr,
        value: u32,
        count: usize,
        stream: HipStreamRaw,
    ) -> HipResult {
        unsafe { (self.hip_memset_d32_async)(dst, value as c_int, count, stream) }
    }

    pub fn memcpy_htod_async(
        &self,
        dst: HipDeviceptr,
        src: *const u8,
        byte_count: usize,
        stream: HipStreamRaw,
    ) -> HipResult {
        unsafe { (self.hip_memcpy_htod_async)(dst, src as *const c_void, byte_count, stream) }
    }

    pub fn memcpy_dtod_async(
        &self,
        dst: HipDeviceptr,
        src: HipDeviceptr,
        byte_count: usize,
        stream: HipStreamRaw,
    ) -> HipResult {
        unsafe { (self.hip_memcpy_dtod_async)(dst, src, byte_count, stream) }
    }

    // ── Modules and kernels ───────────────────────────────────────

    pub fn module_load_data(&self, image: &[u8]) -> Result<HipModule, HipResult> {
        let mut module: HipModule = std::ptr::null_mut();
        let res =
            unsafe { (self.hip_module_load_data)(&mut module, image.as_ptr() as *const c_void) };
        if res == HIP_SUCCESS { Ok(module) } else { Err(res) }
    }

    pub fn module_unload(&self, module: HipModule) -> HipResult {
        unsafe { (self.hip_module_unload)(module) }
    }

    pub fn module_get_function(
        &self,
        module: HipModule,
        name: &str,
    ) -> Result<HipFunction, HipResult> {
        let c_name = match std::ffi::CString::new(name) {
            Ok(s) => s,
            Err(_) => return Err(1), // hipErrorInvalidValue
        };
        let mut function: HipFunction = std::ptr::null_mut();
        let res = unsafe { (self.hip_module_get_function)(&mut function, module, c_name.as_ptr()) };
        if res == HIP_SUCCESS { Ok(function) } else { Err(res) }
    }

    /// Launch a kernel with an argument-pointer array per the native launch
    /// convention (each element points at one argument value).
    ///
    /// # Safety
    /// `kernel_params` must hold one valid pointer per kernel argument, each
    /// pointing at memory that stays alive until stream ordering guarantees
    /// the launch has consumed it.
    pub unsafe fn module_launch_kernel(
        &self,
        function: HipFunction,
        grid: [u32; 3],
        block: [u32; 3],
        shared_mem_bytes: u32,
        stream: HipStreamRaw,
        kernel_params: *mut *mut c_void,
    ) -> HipResult {
        unsafe {
            (self.hip_module_launch_kernel)(
                function,
                grid[0],
                grid[1],
                grid[2],
                block[0],
                block[1],
                block[2],
                shared_mem_bytes,
                stream,
                kernel_params,
                std::ptr::null_mut(),
            )
        }
    }
}
