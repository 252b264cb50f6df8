//! Staging buffer allocator — batched CPU→GPU upload memory
//!
//! A ring of pre-allocated host-visible heaps. Allocation bumps a cursor
//! within the current heap; when the heap is exhausted the allocator scans a
//! free list of recycled heaps and only creates a fresh heap when nothing is
//! large enough. `submit()` retires the heaps carved up this frame into the
//! free list for the next frame to reclaim.
//!
//! The whole allocator is serialized behind a single mutex. This is a known
//! scaling limitation for heavily threaded upload workloads.

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::rhi::{Buffer, BufferAccess, BufferDesc, BufferUsage, Device};

/// Copy offsets handed to the GPU are aligned to this boundary
const STAGING_ALIGNMENT: u64 = 256;

/// Default size of one staging heap (4 MiB)
pub const DEFAULT_HEAP_SIZE: u64 = 4 * 1024 * 1024;

/// A slice of staging memory handed out by the allocator
///
/// The slice stays valid until the owning heap is recycled (after the
/// frame's `submit()` and the caller's own fencing).
#[derive(Clone)]
pub struct StagingSlice {
    /// Host-visible buffer backing the slice
    pub buffer: Arc<dyn Buffer>,
    /// Offset of the slice within the buffer
    pub offset: u64,
    /// Slice size in bytes
    pub size: u64,
}

impl StagingSlice {
    /// Write `data` into the slice (at most `size` bytes)
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.buffer.update(data, self.offset, false)
    }
}

/// One pre-allocated host-visible heap
struct StagingHeap {
    buffer: Arc<dyn Buffer>,
    capacity: u64,
    cursor: u64,
}

struct StagingInner {
    /// Heap currently being carved up
    current: Option<StagingHeap>,
    /// Heaps exhausted since the last submit (still referenced by in-flight copies)
    retired: Vec<StagingHeap>,
    /// Recycled heaps ready for reuse
    free: Vec<StagingHeap>,
    /// Size of newly created heaps
    heap_size: u64,
}

/// Staging buffer allocator
///
/// Explicitly constructed and owned by the device; no global state.
pub struct StagingAllocator {
    inner: Mutex<StagingInner>,
}

impl StagingAllocator {
    /// Create an allocator that carves heaps of `heap_size` bytes
    pub fn new(heap_size: u64) -> Self {
        Self {
            inner: Mutex::new(StagingInner {
                current: None,
                retired: Vec::new(),
                free: Vec::new(),
                heap_size,
            }),
        }
    }

    /// Allocate `size` bytes of staging memory
    ///
    /// Requests larger than the heap size get a dedicated heap.
    pub fn allocate(&self, device: &dyn Device, size: u64) -> Result<StagingSlice> {
        let aligned = size.div_ceil(STAGING_ALIGNMENT) * STAGING_ALIGNMENT;
        let mut inner = self.inner.lock().unwrap();

        // Bump within the current heap when it still fits
        if let Some(heap) = &mut inner.current {
            if heap.cursor + aligned <= heap.capacity {
                let offset = heap.cursor;
                heap.cursor += aligned;
                return Ok(StagingSlice {
                    buffer: Arc::clone(&heap.buffer),
                    offset,
                    size,
                });
            }
        }

        // Current heap exhausted (or absent): retire it and find a new one
        if let Some(exhausted) = inner.current.take() {
            inner.retired.push(exhausted);
        }

        // Scan the free list for a recycled heap large enough
        let mut heap = match inner.free.iter().position(|h| h.capacity >= aligned) {
            Some(index) => {
                let mut heap = inner.free.swap_remove(index);
                heap.cursor = 0;
                heap
            }
            None => {
                let capacity = inner.heap_size.max(aligned);
                let desc = BufferDesc::new(capacity)
                    .with_usage(BufferUsage::TRANSFER_SRC)
                    .with_access(BufferAccess::CPU_WRITE | BufferAccess::GPU_READ);
                let buffer = device.create_buffer(&desc)?;
                StagingHeap {
                    buffer,
                    capacity,
                    cursor: 0,
                }
            }
        };

        let offset = heap.cursor;
        heap.cursor += aligned;
        let slice = StagingSlice {
            buffer: Arc::clone(&heap.buffer),
            offset,
            size,
        };
        inner.current = Some(heap);
        Ok(slice)
    }

    /// Retire the frame's heaps into the free list
    ///
    /// Called once the frame's upload commands have been submitted; the
    /// caller's frame fencing guarantees the GPU is done with a heap before
    /// it is carved up again.
    pub fn submit(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(heap) = inner.current.take() {
            inner.retired.push(heap);
        }
        let mut retired = std::mem::take(&mut inner.retired);
        for heap in &mut retired {
            heap.cursor = 0;
        }
        inner.free.append(&mut retired);
    }

    /// Number of heaps currently held (current + retired + free)
    pub fn heap_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.current.is_some() as usize + inner.retired.len() + inner.free.len()
    }
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
