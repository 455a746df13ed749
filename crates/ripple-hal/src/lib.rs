//! Shared vocabulary for the ripple compute recording API: typed errors,
//! command/stage bitmasks, and the device-agnostic buffer handle consumed
//! by backend command buffers.

pub mod buffer;
pub mod error;
pub mod types;

pub use buffer::{Buffer, DevicePtr, NULL_DEVICE_PTR};
pub use error::{HalError, HalResult};
