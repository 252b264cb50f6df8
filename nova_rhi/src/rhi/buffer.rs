/// Buffer trait and buffer descriptor

use bitflags::bitflags;

use crate::error::Result;
use crate::hash::{ContentHash, DescHasher, HashCell};

/// Sentinel size meaning "from offset to the end of the buffer"
pub const WHOLE_SIZE: u64 = u64::MAX;

bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Vertex buffer
        const VERTEX = 1 << 0;
        /// Index buffer
        const INDEX = 1 << 1;
        /// Uniform/constant buffer
        const UNIFORM = 1 << 2;
        /// Storage buffer
        const STORAGE = 1 << 3;
        /// Indirect draw/dispatch argument buffer
        const INDIRECT = 1 << 4;
        /// Source of copy commands
        const TRANSFER_SRC = 1 << 5;
        /// Destination of copy commands
        const TRANSFER_DST = 1 << 6;
    }
}

bitflags! {
    /// Memory access flags — which side can touch the buffer memory
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferAccess: u32 {
        const GPU_READ = 1 << 0;
        const GPU_WRITE = 1 << 1;
        const CPU_READ = 1 << 2;
        const CPU_WRITE = 1 << 3;
    }
}

/// Descriptor for creating a buffer
///
/// Built via chained setters; the content hash is memoized and invalidated
/// by every setter.
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Memory access
    pub access: BufferAccess,
    hash: HashCell,
}

impl BufferDesc {
    /// Create a descriptor for a buffer of `size` bytes
    pub fn new(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::empty(),
            access: BufferAccess::GPU_READ,
            hash: HashCell::new(),
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self.hash.invalidate();
        self
    }

    pub fn with_usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self.hash.invalidate();
        self
    }

    pub fn with_access(mut self, access: BufferAccess) -> Self {
        self.access = access;
        self.hash.invalidate();
        self
    }

    /// True if the buffer memory can be mapped for CPU writes
    pub fn cpu_writable(&self) -> bool {
        self.access.contains(BufferAccess::CPU_WRITE)
    }
}

impl ContentHash for BufferDesc {
    fn content_hash(&self) -> u64 {
        self.hash.get_or_compute(|| {
            let mut h = DescHasher::new();
            h.field(&self.size)
                .field(&self.usage.bits())
                .field(&self.access.bits());
            h.finish()
        })
    }
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types. The native buffer is
/// destroyed when the last handle is dropped.
pub trait Buffer: Send + Sync {
    /// Buffer size in bytes
    fn size(&self) -> u64;

    /// Map a range for CPU writes and return a host pointer
    ///
    /// `size` may be [`WHOLE_SIZE`] to map from `offset` to the end.
    /// Calling `map` while already mapped returns the existing mapping.
    ///
    /// # Errors
    ///
    /// Fails if the buffer was not created with `CPU_WRITE`/`CPU_READ`
    /// access or the range is out of bounds.
    fn map(&self, size: u64, offset: u64) -> Result<*mut u8>;

    /// Release the mapping; no-op when not mapped
    fn unmap(&self);

    /// Map (if needed), copy `data` to `dst_offset`, then either
    /// flush-and-unmap (`persistent == false`) or leave the buffer mapped
    /// (`persistent == true`)
    fn update(&self, data: &[u8], dst_offset: u64, persistent: bool) -> Result<()>;

    /// Make CPU writes in the range visible to the GPU
    ///
    /// No-op for coherent memory.
    fn flush_mapped_range(&self, offset: u64, size: u64) -> Result<()>;

    /// Make GPU writes in the range visible to the CPU
    ///
    /// No-op for coherent memory.
    fn invalidate_mapped_range(&self, offset: u64, size: u64) -> Result<()>;
}

/// Validate a map/update range against a buffer size
///
/// Returns the resolved byte count (`WHOLE_SIZE` resolves to the remainder
/// after `offset`).
pub fn resolve_range(buffer_size: u64, size: u64, offset: u64) -> Option<u64> {
    if offset >= buffer_size {
        return None;
    }
    if size == WHOLE_SIZE {
        return Some(buffer_size - offset);
    }
    if offset + size > buffer_size {
        return None;
    }
    Some(size)
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
