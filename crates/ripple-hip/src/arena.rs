//! Bump allocation over pooled blocks for transient recording state.
//!
//! Regions handed out by an [`Arena`] are stable raw pointers that stay
//! valid until [`Arena::reset`]; individual allocations are never freed.
//! Blocks go back to the shared [`BlockPool`] on reset so repeated
//! begin/end cycles reuse storage instead of hitting the system allocator.

use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::Mutex;

use ripple_hal::{HalError, HalResult};

/// Alignment of every arena region; enough for pointer-size kernel
/// argument arrays and any staged transfer source.
const ARENA_ALIGNMENT: usize = 16;

struct Block {
    /// Owns the storage; never touched again once `base` is taken.
    _storage: Box<[u8]>,
    /// Captured once so outstanding region pointers stay derived from a
    /// single borrow of the storage.
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: `base` points into heap storage owned by `_storage`; moving a
// Block between threads moves ownership of that storage with it.
unsafe impl Send for Block {}

impl Block {
    fn allocate(size: usize) -> HalResult<Self> {
        let mut storage = Vec::new();
        storage.try_reserve_exact(size)?;
        storage.resize(size, 0);
        let mut storage = storage.into_boxed_slice();
        let base = NonNull::new(storage.as_mut_ptr())
            .ok_or_else(|| HalError::Allocation("null arena block".to_string()))?;
        Ok(Self {
            _storage: storage,
            base,
            len: size,
        })
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Shared pool of fixed-size blocks. Arenas acquire blocks as they grow and
/// return them wholesale on reset.
pub struct BlockPool {
    block_size: usize,
    free_blocks: Mutex<Vec<Block>>,
}

impl BlockPool {
    pub fn new(block_size: usize) -> Arc<Self> {
        Arc::new(Self {
            block_size,
            free_blocks: Mutex::new(Vec::new()),
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks currently parked in the pool.
    pub fn free_block_count(&self) -> usize {
        self.free_blocks.lock().len()
    }

    fn acquire(&self, min_size: usize) -> HalResult<Block> {
        if min_size <= self.block_size {
            if let Some(block) = self.free_blocks.lock().pop() {
                return Ok(block);
            }
            return Block::allocate(self.block_size);
        }
        // Oversized request: dedicated block, still returned to the pool on
        // reset and reusable by any later allocation it can satisfy.
        Block::allocate(min_size)
    }

    fn release(&self, blocks: impl IntoIterator<Item = Block>) {
        let mut free = self.free_blocks.lock();
        free.extend(blocks);
    }
}

/// Monotonic allocator over blocks from a shared pool.
pub struct Arena {
    pool: Arc<BlockPool>,
    used_blocks: Vec<Block>,
    /// Bump offset into the last block of `used_blocks`.
    offset: usize,
}

impl Arena {
    pub fn new(pool: Arc<BlockPool>) -> Self {
        Self {
            pool,
            used_blocks: Vec::new(),
            offset: 0,
        }
    }

    pub fn block_pool(&self) -> &Arc<BlockPool> {
        &self.pool
    }

    /// Allocate `size` bytes, 16-byte aligned. The returned region is valid
    /// until the next [`reset`](Self::reset); the arena never relocates
    /// blocks it has handed pointers into.
    pub fn allocate(&mut self, size: usize) -> HalResult<NonNull<u8>> {
        if size == 0 {
            return Err(HalError::Allocation(
                "zero-length arena allocation".to_string(),
            ));
        }

        let aligned = (self.offset + ARENA_ALIGNMENT - 1) & !(ARENA_ALIGNMENT - 1);
        let fits = self
            .used_blocks
            .last()
            .is_some_and(|block| aligned + size <= block.len());

        if !fits {
            let block = self.pool.acquire(size)?;
            self.used_blocks.try_reserve(1)?;
            self.used_blocks.push(block);
            self.offset = 0;
            return self.allocate_from_current(0, size);
        }
        self.allocate_from_current(aligned, size)
    }

    /// Allocate and fill a region with `bytes`, returning the staged copy.
    pub fn allocate_copy(&mut self, bytes: &[u8]) -> HalResult<NonNull<u8>> {
        let region = self.allocate(bytes.len())?;
        // SAFETY: `region` points at `bytes.len()` writable bytes that no
        // other reference aliases until reset.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), region.as_ptr(), bytes.len());
        }
        Ok(region)
    }

    fn allocate_from_current(&mut self, start: usize, size: usize) -> HalResult<NonNull<u8>> {
        let block = self
            .used_blocks
            .last()
            .ok_or_else(|| HalError::Allocation("arena has no current block".to_string()))?;
        self.offset = start + size;
        // SAFETY: `start + size <= block.len()` was checked by the caller;
        // block base addresses are stable for the life of the block.
        let ptr = unsafe { block.base.as_ptr().add(start) };
        NonNull::new(ptr).ok_or_else(|| HalError::Allocation("null arena block".to_string()))
    }

    /// Invalidate every outstanding region and return all blocks to the pool.
    pub fn reset(&mut self) {
        self.pool.release(self.used_blocks.drain(..));
        self.offset = 0;
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.reset();
    }
}
