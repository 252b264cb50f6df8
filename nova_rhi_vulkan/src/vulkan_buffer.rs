/// Buffer - Vulkan implementation of the Buffer trait

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::{Arc, Mutex};

use nova_rhi::nova::rhi::{resolve_range, Buffer as RhiBuffer};
use nova_rhi::nova::{Error, Result};
use nova_rhi::{rhi_err, rhi_error};

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
///
/// Host-visible buffers are persistently mapped by the allocator; `map` and
/// `unmap` track the logical mapping state so repeated maps are idempotent
/// and `update` can flush-and-unmap transient writes.
pub struct Buffer {
    /// Shared GPU context (device, allocator, queues, upload pool)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Mutex<Option<Allocation>>,
    /// Logical map state (the allocator keeps host-visible memory mapped)
    mapped: Mutex<bool>,
    /// Buffer size
    size: u64,
    /// Created with CPU write access
    cpu_writable: bool,
}

impl Buffer {
    /// Wrap a created Vulkan buffer and its allocation
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
        cpu_writable: bool,
    ) -> Self {
        Self {
            ctx,
            buffer,
            allocation: Mutex::new(Some(allocation)),
            mapped: Mutex::new(false),
            size,
            cpu_writable,
        }
    }

    fn host_ptr(&self, offset: u64) -> Result<*mut u8> {
        let allocation = self.allocation.lock().unwrap();
        let allocation = allocation.as_ref().ok_or_else(|| {
            Error::InvalidOperation("buffer allocation already released".to_string())
        })?;
        let base = allocation
            .mapped_ptr()
            .ok_or_else(|| {
                rhi_error!("nova::vulkan", "Buffer memory is not host-visible");
                Error::InvalidOperation("buffer memory is not host-visible".to_string())
            })?
            .as_ptr() as *mut u8;
        Ok(unsafe { base.add(offset as usize) })
    }

    /// Flush or invalidate an aligned mapped range
    fn sync_mapped_range(&self, offset: u64, size: u64, flush: bool) -> Result<()> {
        let resolved = resolve_range(self.size, size, offset).ok_or_else(|| {
            Error::InvalidOperation(format!(
                "mapped range (offset {}, size {}) exceeds buffer size {}",
                offset, size, self.size
            ))
        })?;

        let allocation = self.allocation.lock().unwrap();
        let allocation = allocation.as_ref().ok_or_else(|| {
            Error::InvalidOperation("buffer allocation already released".to_string())
        })?;
        if allocation.mapped_ptr().is_none() {
            // Device-local memory has no mapped range to synchronize
            return Ok(());
        }

        let (aligned_offset, aligned_size) = self.ctx.align_mapped_range(
            allocation.offset() + offset,
            resolved,
            allocation.offset() + allocation.size(),
        );
        let range = vk::MappedMemoryRange::default()
            .memory(unsafe { allocation.memory() })
            .offset(aligned_offset)
            .size(aligned_size);

        unsafe {
            if flush {
                self.ctx
                    .device
                    .flush_mapped_memory_ranges(&[range])
                    .map_err(|e| {
                        rhi_err!("nova::vulkan", "Failed to flush mapped range: {:?}", e)
                    })?;
            } else {
                self.ctx
                    .device
                    .invalidate_mapped_memory_ranges(&[range])
                    .map_err(|e| {
                        rhi_err!("nova::vulkan", "Failed to invalidate mapped range: {:?}", e)
                    })?;
            }
        }
        Ok(())
    }
}

impl RhiBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn map(&self, size: u64, offset: u64) -> Result<*mut u8> {
        if !self.cpu_writable {
            rhi_error!("nova::vulkan", "map: buffer was not created with CPU write access");
            return Err(Error::InvalidOperation(
                "map: buffer was not created with CPU write access".to_string(),
            ));
        }
        resolve_range(self.size, size, offset).ok_or_else(|| {
            Error::InvalidOperation(format!(
                "map: range (offset {}, size {}) exceeds buffer size {}",
                offset, size, self.size
            ))
        })?;

        // Idempotent: a second map returns the existing mapping
        *self.mapped.lock().unwrap() = true;
        self.host_ptr(offset)
    }

    fn unmap(&self) {
        // No-op if not mapped
        *self.mapped.lock().unwrap() = false;
    }

    fn update(&self, data: &[u8], dst_offset: u64, persistent: bool) -> Result<()> {
        let ptr = self.map(data.len() as u64, dst_offset)?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
        }
        if !persistent {
            self.flush_mapped_range(dst_offset, data.len() as u64)?;
            self.unmap();
        }
        Ok(())
    }

    fn flush_mapped_range(&self, offset: u64, size: u64) -> Result<()> {
        self.sync_mapped_range(offset, size, true)
    }

    fn invalidate_mapped_range(&self, offset: u64, size: u64) -> Result<()> {
        self.sync_mapped_range(offset, size, false)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.lock().unwrap().take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
