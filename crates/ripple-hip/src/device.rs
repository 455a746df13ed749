//! Device wiring: driver loading, the shared block pool, and stream and
//! command buffer construction.

use std::sync::Arc;

use tracing::info;

use ripple_hal::types::{CommandBufferMode, CommandCategory, QueueAffinity};
use ripple_hal::{HalError, HalResult};

use crate::arena::BlockPool;
use crate::command_buffer::StreamCommandBuffer;
use crate::config::BackendConfig;
use crate::driver::{HipDriver, HIP_SUCCESS};
use crate::stream::HipStream;

pub struct HipDevice {
    driver: Arc<HipDriver>,
    block_pool: Arc<BlockPool>,
}

impl HipDevice {
    /// Load the HIP runtime, initialize it, and build the shared block
    /// pool for command buffer transient state.
    pub fn open(config: &BackendConfig) -> HalResult<Self> {
        let driver = HipDriver::load(config.driver_path.as_deref())
            .map_err(HalError::RuntimeUnavailable)?;

        let code = driver.init(0);
        if code != HIP_SUCCESS {
            return Err(HalError::BackendCall {
                call: "hipInit",
                code,
                name: driver.error_name(code),
            });
        }

        let device_count = driver.get_device_count().map_err(|code| {
            HalError::BackendCall {
                call: "hipGetDeviceCount",
                code,
                name: driver.error_name(code),
            }
        })?;
        info!(device_count, "HIP runtime initialized");

        Ok(Self {
            driver,
            block_pool: BlockPool::new(config.arena_block_size),
        })
    }

    pub fn driver(&self) -> &Arc<HipDriver> {
        &self.driver
    }

    pub fn block_pool(&self) -> &Arc<BlockPool> {
        &self.block_pool
    }

    pub fn create_stream(&self) -> HalResult<Arc<HipStream>> {
        Ok(Arc::new(HipStream::create(self.driver.clone())?))
    }

    /// Create a command buffer recording onto `stream`.
    pub fn create_command_buffer(
        &self,
        mode: CommandBufferMode,
        categories: CommandCategory,
        queue_affinity: QueueAffinity,
        binding_capacity: usize,
        stream: Arc<HipStream>,
    ) -> HalResult<StreamCommandBuffer> {
        StreamCommandBuffer::create(
            mode,
            categories,
            queue_affinity,
            binding_capacity,
            stream,
            self.block_pool.clone(),
        )
    }
}
