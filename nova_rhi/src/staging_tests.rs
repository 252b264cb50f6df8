/// Tests for the staging buffer allocator
///
/// Run against the mock device; validate bump allocation, heap recycling
/// and oversized dedicated heaps.

use super::*;
use crate::rhi::mock_device::MockDevice;
use std::sync::atomic::Ordering;

#[test]
fn test_allocations_bump_within_one_heap() {
    let device = MockDevice::new();
    let allocator = StagingAllocator::new(1024);

    let a = allocator.allocate(&device, 100).unwrap();
    let b = allocator.allocate(&device, 100).unwrap();

    // Same backing buffer, disjoint offsets
    assert!(Arc::ptr_eq(&a.buffer, &b.buffer));
    assert_ne!(a.offset, b.offset);
    assert_eq!(device.buffer_creations.load(Ordering::SeqCst), 1);
    assert_eq!(allocator.heap_count(), 1);
}

#[test]
fn test_exhausted_heap_gets_replacement() {
    let device = MockDevice::new();
    let allocator = StagingAllocator::new(1024);

    let a = allocator.allocate(&device, 768).unwrap();
    // 768 rounds to 768; the next 512 does not fit in the remaining 256
    let b = allocator.allocate(&device, 512).unwrap();

    assert!(!Arc::ptr_eq(&a.buffer, &b.buffer));
    assert_eq!(device.buffer_creations.load(Ordering::SeqCst), 2);
    assert_eq!(allocator.heap_count(), 2);
}

#[test]
fn test_submit_recycles_heaps() {
    let device = MockDevice::new();
    let allocator = StagingAllocator::new(1024);

    let first = allocator.allocate(&device, 512).unwrap();
    allocator.submit();

    // The recycled heap is reused instead of allocating a new one
    let second = allocator.allocate(&device, 512).unwrap();
    assert!(Arc::ptr_eq(&first.buffer, &second.buffer));
    assert_eq!(second.offset, 0);
    assert_eq!(device.buffer_creations.load(Ordering::SeqCst), 1);
}

#[test]
fn test_oversized_request_gets_dedicated_heap() {
    let device = MockDevice::new();
    let allocator = StagingAllocator::new(1024);

    let slice = allocator.allocate(&device, 4096).unwrap();
    assert_eq!(slice.offset, 0);
    assert_eq!(slice.size, 4096);
    assert!(slice.buffer.size() >= 4096);
}

#[test]
fn test_free_list_scan_prefers_fitting_heap() {
    let device = MockDevice::new();
    let allocator = StagingAllocator::new(1024);

    // Create a small heap and a big heap, then recycle both
    allocator.allocate(&device, 512).unwrap();
    allocator.allocate(&device, 8192).unwrap();
    allocator.submit();
    assert_eq!(device.buffer_creations.load(Ordering::SeqCst), 2);

    // A large request must reuse the big recycled heap, not allocate
    let slice = allocator.allocate(&device, 8000).unwrap();
    assert!(slice.buffer.size() >= 8000);
    assert_eq!(device.buffer_creations.load(Ordering::SeqCst), 2);
}

#[test]
fn test_slice_write_lands_in_buffer() {
    let device = MockDevice::new();
    let allocator = StagingAllocator::new(1024);

    let slice = allocator.allocate(&device, 4).unwrap();
    slice.write(&[1, 2, 3, 4]).unwrap();

    // Downcast through the mock to inspect the bytes
    let mock = Arc::as_ptr(&slice.buffer) as *const crate::rhi::mock_device::MockBuffer;
    let contents = unsafe { &*mock }.contents();
    let start = slice.offset as usize;
    assert_eq!(&contents[start..start + 4], &[1, 2, 3, 4]);
}
