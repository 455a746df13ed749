//! Integration test: arena allocation and resource retention.
//!
//! Run with: cargo test --test memory_test -- --nocapture

use std::sync::Arc;

use ripple_hal::buffer::Buffer;
use ripple_hal::HalError;
use ripple_hip::arena::{Arena, BlockPool};
use ripple_hip::resource_set::ResourceSet;

#[test]
fn test_arena_allocations_are_distinct_and_aligned() {
    let pool = BlockPool::new(1024);
    let mut arena = Arena::new(pool);

    let a = arena.allocate(24).expect("first allocation");
    let b = arena.allocate(8).expect("second allocation");

    assert_eq!(a.as_ptr() as usize % 16, 0);
    assert_eq!(b.as_ptr() as usize % 16, 0);
    let distance = b.as_ptr() as usize - a.as_ptr() as usize;
    assert!(distance >= 24, "regions must not overlap");
}

#[test]
fn test_arena_regions_survive_later_allocations() {
    let pool = BlockPool::new(256);
    let mut arena = Arena::new(pool);

    let staged = arena.allocate_copy(&[1, 2, 3, 4]).expect("staged copy");
    // Force growth into more blocks.
    for _ in 0..16 {
        arena.allocate(128).expect("growth allocation");
    }

    // SAFETY: the region is valid until reset.
    let bytes = unsafe { std::slice::from_raw_parts(staged.as_ptr(), 4) };
    assert_eq!(bytes, &[1, 2, 3, 4]);
}

#[test]
fn test_arena_reset_returns_blocks_to_pool() {
    let pool = BlockPool::new(256);
    let mut arena = Arena::new(pool.clone());

    arena.allocate(200).expect("a");
    arena.allocate(200).expect("b");
    assert_eq!(pool.free_block_count(), 0);

    arena.reset();
    assert_eq!(pool.free_block_count(), 2);

    // A fresh cycle reuses pooled blocks instead of growing the pool.
    arena.allocate(200).expect("c");
    assert_eq!(pool.free_block_count(), 1);
}

#[test]
fn test_arena_oversized_allocation_gets_dedicated_block() {
    let pool = BlockPool::new(64);
    let mut arena = Arena::new(pool);

    let big = arena.allocate(1000).expect("oversized allocation");
    // SAFETY: region is valid until reset; write the whole span.
    unsafe {
        std::ptr::write_bytes(big.as_ptr(), 0x5A, 1000);
    }
}

#[test]
fn test_arena_rejects_zero_length() {
    let pool = BlockPool::new(64);
    let mut arena = Arena::new(pool);

    match arena.allocate(0) {
        Err(HalError::Allocation(_)) => {}
        other => panic!("expected Allocation error, got {:?}", other),
    }
}

#[test]
fn test_arena_drop_releases_blocks() {
    let pool = BlockPool::new(128);
    {
        let mut arena = Arena::new(pool.clone());
        arena.allocate(100).expect("allocation");
    }
    assert_eq!(pool.free_block_count(), 1);
}

#[test]
fn test_resource_set_deduplicates() {
    let mut set = ResourceSet::allocate().expect("allocate");
    let buffer = Buffer::new(0x100, 0, 64);

    set.insert(&buffer).expect("first insert");
    set.insert(&buffer).expect("duplicate insert");
    assert_eq!(set.len(), 1);
    assert!(set.contains(&buffer));
}

#[test]
fn test_resource_set_distinguishes_instances() {
    let mut set = ResourceSet::allocate().expect("allocate");
    // Same contents, different allocations: both retained.
    let a = Buffer::new(0x100, 0, 64);
    let b = Buffer::new(0x100, 0, 64);

    set.insert(&a).expect("insert a");
    set.insert(&b).expect("insert b");
    assert_eq!(set.len(), 2);
}

#[test]
fn test_resource_set_pins_liveness_until_drop() {
    let buffer = Buffer::new(0x200, 0, 64);
    let mut set = ResourceSet::allocate().expect("allocate");

    set.insert(&buffer).expect("insert");
    assert_eq!(Arc::strong_count(&buffer), 2);

    drop(set);
    assert_eq!(Arc::strong_count(&buffer), 1);
}
