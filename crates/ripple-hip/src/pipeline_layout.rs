//! Kernel binding and push-constant layout metadata.
//!
//! The dispatch hot path indexes fixed-capacity arrays, so the capacities
//! are named constants validated at layout construction and again before
//! any command-buffer mutation.

use std::sync::Arc;

use ripple_hal::{HalError, HalResult};

pub const MAX_DESCRIPTOR_SET_COUNT: usize = 4;
pub const MAX_DESCRIPTOR_SET_BINDING_COUNT: usize = 16;
pub const MAX_PUSH_CONSTANT_COUNT: usize = 64;

/// Binding count of one descriptor set.
#[derive(Debug)]
pub struct DescriptorSetLayout {
    binding_count: usize,
}

impl DescriptorSetLayout {
    pub fn new(binding_count: usize) -> HalResult<Arc<Self>> {
        if binding_count > MAX_DESCRIPTOR_SET_BINDING_COUNT {
            return Err(HalError::ResourceExhausted {
                message: "descriptor set layout binding count".to_string(),
                requested: binding_count,
                maximal: MAX_DESCRIPTOR_SET_BINDING_COUNT,
            });
        }
        Ok(Arc::new(Self { binding_count }))
    }

    pub fn binding_count(&self) -> usize {
        self.binding_count
    }
}

/// Sets plus push-constant count for one kernel signature.
#[derive(Debug)]
pub struct PipelineLayout {
    set_layouts: Vec<Arc<DescriptorSetLayout>>,
    push_constant_count: usize,
}

impl PipelineLayout {
    pub fn new(
        set_layouts: Vec<Arc<DescriptorSetLayout>>,
        push_constant_count: usize,
    ) -> HalResult<Arc<Self>> {
        if set_layouts.len() > MAX_DESCRIPTOR_SET_COUNT {
            return Err(HalError::ResourceExhausted {
                message: "pipeline layout descriptor set count".to_string(),
                requested: set_layouts.len(),
                maximal: MAX_DESCRIPTOR_SET_COUNT,
            });
        }
        if push_constant_count > MAX_PUSH_CONSTANT_COUNT {
            return Err(HalError::ResourceExhausted {
                message: "pipeline layout push constant count".to_string(),
                requested: push_constant_count,
                maximal: MAX_PUSH_CONSTANT_COUNT,
            });
        }
        Ok(Arc::new(Self {
            set_layouts,
            push_constant_count,
        }))
    }

    pub fn set_layout_count(&self) -> usize {
        self.set_layouts.len()
    }

    pub fn set_layout(&self, set: usize) -> &Arc<DescriptorSetLayout> {
        &self.set_layouts[set]
    }

    pub fn push_constant_count(&self) -> usize {
        self.push_constant_count
    }

    /// Flattened index of `set`'s first binding across all preceding sets.
    pub fn base_binding_index(&self, set: usize) -> usize {
        self.set_layouts[..set]
            .iter()
            .map(|layout| layout.binding_count())
            .sum()
    }

    pub fn dispatch_layout(&self) -> DispatchLayout {
        let total_binding_count = self.base_binding_index(self.set_layouts.len());
        DispatchLayout {
            set_layout_count: self.set_layouts.len(),
            total_binding_count,
            push_constant_count: self.push_constant_count,
            // Push constants are appended after all bindings to form one
            // linear chain of kernel arguments.
            push_constant_base_index: total_binding_count,
        }
    }
}

/// Flattened view of a pipeline layout used while packing dispatch
/// arguments.
#[derive(Debug, Clone, Copy)]
pub struct DispatchLayout {
    pub set_layout_count: usize,
    pub total_binding_count: usize,
    pub push_constant_count: usize,
    pub push_constant_base_index: usize,
}
