//! Deduplicating retention list pinning resources for one recording cycle.
//!
//! Stream operations are asynchronous: a buffer or executable referenced by
//! a submitted operation must stay alive until stream ordering guarantees
//! completion. The set clones the `Arc` of each inserted resource once and
//! drops every clone when freed, which in this backend happens at the next
//! begin/end boundary.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use ripple_hal::HalResult;

/// Initial slots reserved at construction; growth past this is fallible too.
const INITIAL_CAPACITY: usize = 16;

pub struct ResourceSet {
    retained: Vec<Arc<dyn Any + Send + Sync>>,
    /// Data-pointer identity of everything in `retained`.
    seen: HashSet<usize>,
}

impl ResourceSet {
    pub fn allocate() -> HalResult<Self> {
        let mut retained: Vec<Arc<dyn Any + Send + Sync>> = Vec::new();
        retained.try_reserve(INITIAL_CAPACITY)?;
        let mut seen = HashSet::new();
        seen.try_reserve(INITIAL_CAPACITY)?;
        Ok(Self { retained, seen })
    }

    /// Retain `resource` until this set is dropped. Inserting the same
    /// resource again is a no-op.
    pub fn insert<T: Send + Sync + 'static>(&mut self, resource: &Arc<T>) -> HalResult<()> {
        let key = Arc::as_ptr(resource) as usize;
        if self.seen.contains(&key) {
            return Ok(());
        }
        self.retained.try_reserve(1)?;
        self.seen.try_reserve(1)?;
        self.seen.insert(key);
        self.retained.push(resource.clone());
        Ok(())
    }

    pub fn contains<T: Send + Sync + 'static>(&self, resource: &Arc<T>) -> bool {
        self.seen.contains(&(Arc::as_ptr(resource) as usize))
    }

    pub fn len(&self) -> usize {
        self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }
}
