//! Inline-execution command buffer recording onto one stream.
//!
//! Every recorded call is translated immediately into zero or more
//! asynchronous stream operations; there is no deferred graph and no
//! replay. Resources referenced by submitted operations are pinned in a
//! [`ResourceSet`] and host memory that must outlive a call is staged in an
//! [`Arena`], both reset at the begin/end boundary once stream ordering has
//! made the operations safe to abandon.

use std::sync::Arc;

use tracing::{debug, trace};

use ripple_hal::buffer::Buffer;
use ripple_hal::types::{
    BarrierFlags, BufferBarrier, BufferBinding, Channel, CollectiveOp, CommandBufferMode,
    CommandCategory, DescriptorSetBinding, Event, ExecutionStage, MemoryBarrier, QueueAffinity,
};
use ripple_hal::{DevicePtr, HalError, HalResult, NULL_DEVICE_PTR};

use crate::arena::{Arena, BlockPool};
use crate::arguments::KernelArguments;
use crate::executable::Executable;
use crate::pipeline_layout::{
    PipelineLayout, MAX_DESCRIPTOR_SET_BINDING_COUNT, MAX_DESCRIPTOR_SET_COUNT,
    MAX_PUSH_CONSTANT_COUNT,
};
use crate::resource_set::ResourceSet;
use crate::stream::StreamOps;

/// Resolved device addresses of one descriptor set. Entries persist until
/// overwritten by a later push.
#[derive(Clone, Copy)]
struct DescriptorSet {
    bindings: [DevicePtr; MAX_DESCRIPTOR_SET_BINDING_COUNT],
}

impl Default for DescriptorSet {
    fn default() -> Self {
        Self {
            bindings: [NULL_DEVICE_PTR; MAX_DESCRIPTOR_SET_BINDING_COUNT],
        }
    }
}

pub struct StreamCommandBuffer {
    mode: CommandBufferMode,
    categories: CommandCategory,
    queue_affinity: QueueAffinity,
    stream: Arc<dyn StreamOps>,
    arena: Arena,
    /// `None` after a failed `end()` reallocation: the command buffer is
    /// unusable until dropped.
    resource_set: Option<ResourceSet>,
    push_constants: [u32; MAX_PUSH_CONSTANT_COUNT],
    descriptor_sets: [DescriptorSet; MAX_DESCRIPTOR_SET_COUNT],
}

impl StreamCommandBuffer {
    /// Create a command buffer recording onto `stream`, with transient
    /// state drawn from `block_pool`.
    pub fn create(
        mode: CommandBufferMode,
        categories: CommandCategory,
        queue_affinity: QueueAffinity,
        binding_capacity: usize,
        stream: Arc<dyn StreamOps>,
        block_pool: Arc<BlockPool>,
    ) -> HalResult<Self> {
        if binding_capacity > 0 {
            return Err(HalError::Unimplemented(
                "indirect command buffers with binding tables",
            ));
        }

        let resource_set = ResourceSet::allocate()?;
        debug!(?mode, ?categories, "created stream command buffer");
        Ok(Self {
            mode,
            categories,
            queue_affinity,
            stream,
            arena: Arena::new(block_pool),
            resource_set: Some(resource_set),
            push_constants: [0; MAX_PUSH_CONSTANT_COUNT],
            descriptor_sets: [DescriptorSet::default(); MAX_DESCRIPTOR_SET_COUNT],
        })
    }

    pub fn mode(&self) -> CommandBufferMode {
        self.mode
    }

    pub fn categories(&self) -> CommandCategory {
        self.categories
    }

    pub fn queue_affinity(&self) -> QueueAffinity {
        self.queue_affinity
    }

    fn resource_set_mut(&mut self) -> HalResult<&mut ResourceSet> {
        self.resource_set.as_mut().ok_or_else(|| {
            HalError::Internal(
                "command buffer is unusable: resource set reallocation failed".to_string(),
            )
        })
    }

    /// Resolved device address of `offset` bytes into `buffer`.
    fn resolve(buffer: &Buffer, offset: u64) -> DevicePtr {
        buffer.device_pointer() + buffer.byte_offset() + offset
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Recording and execution are not separated in this backend.
    pub fn begin(&mut self) -> HalResult<()> {
        Ok(())
    }

    /// Drop transient state from the finished cycle. Everything submitted
    /// so far is ordered ahead of any future submission on this stream, so
    /// nothing needs to stay pinned past this point.
    pub fn end(&mut self) -> HalResult<()> {
        self.arena.reset();
        self.resource_set = None;
        self.resource_set = Some(ResourceSet::allocate()?);
        Ok(())
    }

    pub fn begin_debug_group(&mut self, label: &str) {
        trace!(label, "begin debug group");
    }

    pub fn end_debug_group(&mut self) {
        trace!("end debug group");
    }

    // ── Barriers and synchronization stubs ──────────────────────

    pub fn execution_barrier(
        &mut self,
        source_stage_mask: ExecutionStage,
        target_stage_mask: ExecutionStage,
        flags: BarrierFlags,
        _memory_barriers: &[MemoryBarrier],
        _buffer_barriers: &[BufferBarrier],
    ) -> HalResult<()> {
        if source_stage_mask.contains(ExecutionStage::HOST)
            || target_stage_mask.contains(ExecutionStage::HOST)
        {
            return Err(HalError::Unimplemented("barrier involving host"));
        }
        if flags != BarrierFlags::empty() {
            return Err(HalError::Unimplemented("non-default barrier flags"));
        }

        // Nothing to emit: a single stream executes and makes memory
        // visible in submission order.
        Ok(())
    }

    pub fn signal_event(
        &mut self,
        _event: &Arc<Event>,
        _source_stage_mask: ExecutionStage,
    ) -> HalResult<()> {
        Err(HalError::Unimplemented("events"))
    }

    pub fn reset_event(
        &mut self,
        _event: &Arc<Event>,
        _source_stage_mask: ExecutionStage,
    ) -> HalResult<()> {
        Err(HalError::Unimplemented("events"))
    }

    pub fn wait_events(
        &mut self,
        _events: &[Arc<Event>],
        _source_stage_mask: ExecutionStage,
        _target_stage_mask: ExecutionStage,
        _memory_barriers: &[MemoryBarrier],
        _buffer_barriers: &[BufferBarrier],
    ) -> HalResult<()> {
        Err(HalError::Unimplemented("events"))
    }

    pub fn discard_buffer(&mut self, _buffer: &Arc<Buffer>) -> HalResult<()> {
        Ok(())
    }

    // ── Transfer operations ─────────────────────────────────────

    /// Fill `length` bytes at `target_offset` with `pattern` repeated.
    /// The pattern must be 1, 2, or 4 bytes wide.
    pub fn fill_buffer(
        &mut self,
        target_buffer: &Arc<Buffer>,
        target_offset: u64,
        length: u64,
        pattern: &[u8],
    ) -> HalResult<()> {
        let dst = Self::resolve(target_buffer, target_offset);

        match pattern.len() {
            1 => self.stream.fill8_async(dst, pattern[0], length as usize),
            2 => {
                let value: u16 = bytemuck::pod_read_unaligned(pattern);
                self.stream.fill16_async(dst, value, (length / 2) as usize)
            }
            4 => {
                let value: u32 = bytemuck::pod_read_unaligned(pattern);
                self.stream.fill32_async(dst, value, (length / 4) as usize)
            }
            width => Err(HalError::Internal(format!(
                "unsupported fill pattern length {}",
                width
            ))),
        }
    }

    /// Copy host bytes to the device. The source is captured into arena
    /// scratch synchronously: the transfer is asynchronous and the caller
    /// may reuse its memory as soon as this returns.
    pub fn update_buffer(
        &mut self,
        source_buffer: &[u8],
        source_offset: usize,
        target_buffer: &Arc<Buffer>,
        target_offset: u64,
        length: u64,
    ) -> HalResult<()> {
        let end = source_offset
            .checked_add(length as usize)
            .filter(|end| *end <= source_buffer.len())
            .ok_or_else(|| {
                HalError::Internal(format!(
                    "update source range {}+{} exceeds {} source bytes",
                    source_offset,
                    length,
                    source_buffer.len()
                ))
            })?;
        let staged = self.arena.allocate_copy(&source_buffer[source_offset..end])?;

        let dst = Self::resolve(target_buffer, target_offset);
        self.stream
            .copy_host_to_device_async(dst, staged.as_ptr(), length as usize)
    }

    pub fn copy_buffer(
        &mut self,
        source_buffer: &Arc<Buffer>,
        source_offset: u64,
        target_buffer: &Arc<Buffer>,
        target_offset: u64,
        length: u64,
    ) -> HalResult<()> {
        let src = Self::resolve(source_buffer, source_offset);
        let dst = Self::resolve(target_buffer, target_offset);
        self.stream
            .copy_device_to_device_async(dst, src, length as usize)
    }

    pub fn collective(
        &mut self,
        _channel: &Arc<Channel>,
        _op: CollectiveOp,
        _param: u32,
        _send_binding: BufferBinding,
        _recv_binding: BufferBinding,
        _element_count: u64,
    ) -> HalResult<()> {
        Err(HalError::Unimplemented("collectives"))
    }

    // ── Descriptor and push-constant state ──────────────────────

    /// Write `values` into the word-addressed constant bank. Later writes
    /// to the same words win; the bank is read at the next dispatch.
    pub fn push_constants(
        &mut self,
        _pipeline_layout: &Arc<PipelineLayout>,
        offset: usize,
        values: &[u8],
    ) -> HalResult<()> {
        let base_index = offset / 4;
        let word_count = values.len() / 4;
        if base_index + word_count > MAX_PUSH_CONSTANT_COUNT {
            return Err(HalError::ResourceExhausted {
                message: "exceeded push constant bank".to_string(),
                requested: base_index + word_count,
                maximal: MAX_PUSH_CONSTANT_COUNT,
            });
        }

        for (i, word) in values.chunks_exact(4).enumerate() {
            self.push_constants[base_index + i] = bytemuck::pod_read_unaligned(word);
        }
        Ok(())
    }

    /// Resolve and store device addresses for `bindings` in set `set`.
    /// Bound buffers are retained until the next begin/end boundary;
    /// untouched binding indices keep their previous addresses.
    pub fn push_descriptor_set(
        &mut self,
        _pipeline_layout: &Arc<PipelineLayout>,
        set: u32,
        bindings: &[DescriptorSetBinding],
    ) -> HalResult<()> {
        if set as usize >= MAX_DESCRIPTOR_SET_COUNT {
            return Err(HalError::ResourceExhausted {
                message: format!("invalid push descriptor set index #{}", set),
                requested: set as usize + 1,
                maximal: MAX_DESCRIPTOR_SET_COUNT,
            });
        }
        if bindings.len() > MAX_DESCRIPTOR_SET_BINDING_COUNT {
            return Err(HalError::ResourceExhausted {
                message: format!(
                    "exceeded available binding slots for push descriptor set #{}",
                    set
                ),
                requested: bindings.len(),
                maximal: MAX_DESCRIPTOR_SET_BINDING_COUNT,
            });
        }
        // Validate every binding index before the first mutation.
        for binding in bindings {
            if binding.binding as usize >= MAX_DESCRIPTOR_SET_BINDING_COUNT {
                return Err(HalError::ResourceExhausted {
                    message: format!(
                        "invalid binding index #{} in push descriptor set #{}",
                        binding.binding, set
                    ),
                    requested: binding.binding as usize + 1,
                    maximal: MAX_DESCRIPTOR_SET_BINDING_COUNT,
                });
            }
        }

        for binding in bindings {
            let device_ptr = match &binding.buffer {
                Some(buffer) => {
                    self.resource_set_mut()?.insert(buffer)?;
                    Self::resolve(buffer, binding.offset)
                }
                None => NULL_DEVICE_PTR,
            };
            self.descriptor_sets[set as usize].bindings[binding.binding as usize] = device_ptr;
        }
        Ok(())
    }

    // ── Dispatch ────────────────────────────────────────────────

    /// Launch `executable`'s entry point over a 3D grid of workgroups,
    /// packing bound descriptor addresses and push constants into the
    /// argument layout the kernel was compiled against.
    pub fn dispatch(
        &mut self,
        executable: &Arc<Executable>,
        entry_point: usize,
        workgroups: [u32; 3],
    ) -> HalResult<()> {
        let kernel_info = executable.entry_point_kernel_info(entry_point)?;
        self.resource_set_mut()?.insert(executable)?;

        let layout = kernel_info.layout.dispatch_layout();
        let mut args = KernelArguments::build(&mut self.arena, &layout)?;

        for set in 0..layout.set_layout_count {
            let binding_count = kernel_info.layout.set_layout(set).binding_count();
            let base_index = kernel_info.layout.base_binding_index(set);
            args.write_bindings(
                base_index,
                &self.descriptor_sets[set].bindings[..binding_count],
            );
        }
        for i in 0..layout.push_constant_count {
            args.write_push_constant(
                layout.push_constant_base_index + i,
                self.push_constants[i],
            );
        }

        trace!(
            entry_point,
            grid_x = workgroups[0],
            grid_y = workgroups[1],
            grid_z = workgroups[2],
            params = args.len(),
            "dispatch"
        );
        self.stream.launch_kernel_async(
            kernel_info.function,
            workgroups,
            kernel_info.block_dims,
            kernel_info.shared_memory_bytes,
            args.as_param_slice(),
        )
    }

    pub fn dispatch_indirect(
        &mut self,
        _executable: &Arc<Executable>,
        _entry_point: usize,
        _workgroups_buffer: &Arc<Buffer>,
        _workgroups_offset: u64,
    ) -> HalResult<()> {
        Err(HalError::Unimplemented("indirect dispatch"))
    }

    pub fn execute_commands(
        &mut self,
        _commands: &StreamCommandBuffer,
        _binding_table: &[BufferBinding],
    ) -> HalResult<()> {
        Err(HalError::Unimplemented(
            "indirect command buffers with binding tables",
        ))
    }
}
