/// GpuContext - Shared GPU resources for all Vulkan objects
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queues for command submission
/// - Command pool for one-shot upload operations

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

/// Shared GPU context for all Vulkan resources.
///
/// This struct is shared (via `Arc`) by all GPU resources (buffers, images,
/// samplers, pipelines) to avoid duplicating device/allocator/queue
/// references in each resource.
///
/// Note: Device and instance destruction is handled by VulkanDevice::drop()
/// to avoid issues with drop ordering.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics queue for command submission (guarded: vkQueueSubmit
    /// requires external synchronization)
    pub graphics_queue: Mutex<vk::Queue>,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Reusable command pool for one-shot upload operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: Mutex<vk::CommandPool>,

    /// Alignment for flush/invalidate of non-coherent mapped ranges
    pub non_coherent_atom_size: u64,

    /// Vulkan instance (kept for reference, destroyed by VulkanDevice)
    #[allow(dead_code)]
    pub(crate) instance: ash::Instance,

    /// Debug utils loader for command markers (present when validation is enabled)
    pub(crate) debug_utils_device: Option<ash::ext::debug_utils::Device>,

    /// Debug utils instance loader (for messenger destruction)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
        non_coherent_atom_size: u64,
        instance: ash::Instance,
        debug_utils_device: Option<ash::ext::debug_utils::Device>,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(allocator),
            graphics_queue: Mutex::new(graphics_queue),
            graphics_queue_family,
            upload_command_pool: Mutex::new(upload_command_pool),
            non_coherent_atom_size,
            instance,
            debug_utils_device,
            debug_utils_loader,
            debug_messenger,
        }
    }

    /// Align a mapped range to the non-coherent atom size, clamped to the
    /// allocation's extent
    pub fn align_mapped_range(&self, offset: u64, size: u64, max_size: u64) -> (u64, u64) {
        let atom = self.non_coherent_atom_size.max(1);
        let aligned_offset = (offset / atom) * atom;
        let end = (offset + size).div_ceil(atom) * atom;
        (aligned_offset, end.min(max_size) - aligned_offset)
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        // NOTE: Device and instance destruction is handled by
        // VulkanDevice::drop() to avoid issues with drop ordering.
        // This Drop impl intentionally does nothing.
    }
}
