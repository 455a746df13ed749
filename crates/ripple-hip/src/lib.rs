//! HIP stream backend for the ripple recording API.
//!
//! One command buffer records onto one ordered asynchronous HIP stream;
//! every recorded call is translated immediately into stream operations
//! (inline execution), so there is no replayable command graph. The
//! interesting parts are resource retention across asynchronous
//! operations, arena-staged host transfers, and kernel-argument packing
//! for the native launch convention.

pub mod arena;
pub mod arguments;
pub mod command_buffer;
pub mod config;
pub mod device;
pub mod driver;
pub mod executable;
pub mod pipeline_layout;
pub mod resource_set;
pub mod stream;

pub use command_buffer::StreamCommandBuffer;
pub use device::HipDevice;
