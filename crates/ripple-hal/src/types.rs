use std::sync::Arc;

use bitflags::bitflags;

use crate::buffer::Buffer;

bitflags! {
    /// Categories of commands a command buffer may record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandCategory: u32 {
        const TRANSFER = 1 << 0;
        const DISPATCH = 1 << 1;
    }
}

bitflags! {
    /// Recording/submission behavior of a command buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandBufferMode: u32 {
        /// Recorded once, submitted once, then discarded.
        const ONE_SHOT = 1 << 0;
        /// Commands may execute while recording is still in progress.
        const ALLOW_INLINE_EXECUTION = 1 << 1;
    }
}

bitflags! {
    /// Pipeline stages used in barrier source/target masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExecutionStage: u32 {
        const COMMAND_ISSUE = 1 << 0;
        const COMMAND_PROCESS = 1 << 1;
        const DISPATCH = 1 << 2;
        const TRANSFER = 1 << 3;
        const COMMAND_RETIRE = 1 << 4;
        /// Host access; a barrier naming this stage cannot be expressed on
        /// a single device stream.
        const HOST = 1 << 5;
    }
}

bitflags! {
    /// Behavior modifiers for execution barriers. None are supported by the
    /// stream backend.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BarrierFlags: u32 {
        const RESERVED = 1 << 0;
    }
}

bitflags! {
    /// Memory access scopes named by memory/buffer barriers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessScope: u32 {
        const DISPATCH_READ = 1 << 0;
        const DISPATCH_WRITE = 1 << 1;
        const TRANSFER_READ = 1 << 2;
        const TRANSFER_WRITE = 1 << 3;
        const HOST_READ = 1 << 4;
        const HOST_WRITE = 1 << 5;
    }
}

/// Bitmap of device queues a command buffer may be submitted to.
pub type QueueAffinity = u64;

/// Any queue on the device.
pub const QUEUE_AFFINITY_ANY: QueueAffinity = !0;

/// Global memory barrier between stages.
#[derive(Debug, Clone, Copy)]
pub struct MemoryBarrier {
    pub source_scope: AccessScope,
    pub target_scope: AccessScope,
}

/// Memory barrier limited to a range of one buffer.
#[derive(Debug, Clone)]
pub struct BufferBarrier {
    pub source_scope: AccessScope,
    pub target_scope: AccessScope,
    pub buffer: Arc<Buffer>,
    pub offset: u64,
    pub length: u64,
}

/// One slot of a push descriptor set: a binding index and the buffer range
/// (if any) to expose at it.
#[derive(Debug, Clone)]
pub struct DescriptorSetBinding {
    pub binding: u32,
    pub buffer: Option<Arc<Buffer>>,
    pub offset: u64,
    pub length: u64,
}

/// Buffer range handed to a collective operation.
#[derive(Debug, Clone)]
pub struct BufferBinding {
    pub buffer: Option<Arc<Buffer>>,
    pub offset: u64,
    pub length: u64,
}

/// Collective operation kinds. None are supported by the stream backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectiveOp {
    AllGather,
    AllReduce,
    AllToAll,
    Broadcast,
    Reduce,
    ReduceScatter,
    Send,
    Recv,
}

/// Opaque synchronization event. The stream backend exposes no event
/// implementation; the type exists so event operations have a signature.
#[derive(Debug, Default)]
pub struct Event {
    _private: (),
}

impl Event {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Opaque collective channel identifying a rank within a group.
#[derive(Debug)]
pub struct Channel {
    pub rank: u32,
    pub count: u32,
}
