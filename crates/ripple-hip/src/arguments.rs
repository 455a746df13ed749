//! Kernel-argument assembly for the native launch convention.
//!
//! The launch API takes an array of pointers to argument values, not the
//! values themselves. One arena region holds two parallel arrays of
//! pointer-size slots: the argument-pointer array handed to the driver and,
//! immediately after it, the payload array it points into. Descriptor
//! addresses occupy full payload slots; push constants are 32-bit values
//! written through the argument pointer into the low bytes of a
//! pointer-width slot, which is exactly what the kernel ABI reads back.
//! All of the pointer arithmetic lives here.

use std::ffi::c_void;
use std::mem::size_of;

use ripple_hal::{DevicePtr, HalResult};

use crate::arena::Arena;
use crate::pipeline_layout::DispatchLayout;

// Payload slots hold a DevicePtr per pointer-size slot; the parallel-array
// arithmetic requires the two widths to agree.
const _: () = assert!(size_of::<*mut c_void>() == size_of::<DevicePtr>());

pub struct KernelArguments {
    params: *mut *mut c_void,
    payload: *mut DevicePtr,
    count: usize,
}

impl KernelArguments {
    /// Carve one arena region sized for both arrays and aim every argument
    /// pointer at its payload slot.
    pub fn build(arena: &mut Arena, layout: &DispatchLayout) -> HalResult<Self> {
        let count = layout.total_binding_count + layout.push_constant_count;
        if count == 0 {
            // Argument-less kernel: the launch ABI accepts an empty array.
            return Ok(Self {
                params: std::ptr::NonNull::dangling().as_ptr(),
                payload: std::ptr::NonNull::dangling().as_ptr(),
                count: 0,
            });
        }

        let params_length = count * size_of::<*mut c_void>();
        let storage = arena.allocate(params_length * 2)?;

        let params = storage.as_ptr() as *mut *mut c_void;
        // SAFETY: the region spans `params_length * 2` bytes; the payload
        // array starts exactly one array-length past the base and both
        // arrays stay in bounds for `count` slots.
        let payload = unsafe { storage.as_ptr().add(params_length) } as *mut DevicePtr;
        for i in 0..count {
            unsafe {
                *params.add(i) = payload.add(i) as *mut c_void;
            }
        }

        Ok(Self {
            params,
            payload,
            count,
        })
    }

    /// Copy one descriptor set's resolved addresses into the payload at the
    /// set's flattened base index.
    pub fn write_bindings(&mut self, base_index: usize, addresses: &[DevicePtr]) {
        debug_assert!(base_index + addresses.len() <= self.count);
        // SAFETY: bounds asserted above; payload slots are plain u64s owned
        // by this region.
        unsafe {
            std::ptr::copy_nonoverlapping(
                addresses.as_ptr(),
                self.payload.add(base_index),
                addresses.len(),
            );
        }
    }

    /// Write one 32-bit push constant through the argument pointer at
    /// `index`. Only the low 32 bits of the pointer-width slot are written;
    /// the kernel reads the value back at the same width.
    pub fn write_push_constant(&mut self, index: usize, value: u32) {
        debug_assert!(index < self.count);
        unsafe {
            *(*self.params.add(index) as *mut u32) = value;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The argument-pointer array in launch-ABI form. Valid until the
    /// owning arena resets.
    pub fn as_param_slice(&self) -> &[*mut c_void] {
        // SAFETY: `params` holds `count` initialized pointers for the life
        // of the arena region.
        unsafe { std::slice::from_raw_parts(self.params, self.count) }
    }
}
