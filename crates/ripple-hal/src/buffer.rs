use std::sync::Arc;

/// Raw device address. Null is 0.
pub type DevicePtr = u64;

pub const NULL_DEVICE_PTR: DevicePtr = 0;

/// Device-visible buffer handle.
///
/// Carries the base device address of the backing allocation plus the byte
/// range this buffer spans within it. Allocation and lifetime of the backing
/// memory belong to the device allocator, not to this handle; a command
/// buffer resolves addresses as `device_pointer + byte_offset + call offset`.
#[derive(Debug)]
pub struct Buffer {
    device_ptr: DevicePtr,
    byte_offset: u64,
    byte_length: u64,
}

impl Buffer {
    pub fn new(device_ptr: DevicePtr, byte_offset: u64, byte_length: u64) -> Arc<Self> {
        Arc::new(Self {
            device_ptr,
            byte_offset,
            byte_length,
        })
    }

    /// Base device address of the backing allocation.
    pub fn device_pointer(&self) -> DevicePtr {
        self.device_ptr
    }

    /// Byte offset of this buffer within its backing allocation.
    pub fn byte_offset(&self) -> u64 {
        self.byte_offset
    }

    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }
}
