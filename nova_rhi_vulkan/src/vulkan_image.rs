/// Image - Vulkan implementation of the Image trait

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::{Arc, Mutex};

use nova_rhi::nova::rhi::{Image as RhiImage, ImageDesc};

use crate::vulkan_context::GpuContext;

/// Vulkan image implementation
///
/// Owns the VkImage (unless it belongs to the swapchain), its allocation
/// and a full-resource view used for sampling and attachments. The current
/// layout is tracked so command recording can emit the right transitions.
pub struct Image {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Full-resource image view
    pub(crate) view: vk::ImageView,
    /// GPU memory allocation (None for swapchain-owned images)
    allocation: Mutex<Option<Allocation>>,
    /// Current layout, updated by recorded transitions
    pub(crate) layout: Mutex<vk::ImageLayout>,
    /// Swapchain images are destroyed by the swapchain, not by this handle
    pub(crate) is_swapchain: bool,
    /// The descriptor the image was created from
    desc: ImageDesc,
}

impl Image {
    /// Wrap a created Vulkan image and its allocation
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        allocation: Allocation,
        desc: ImageDesc,
    ) -> Self {
        Self {
            ctx,
            image,
            view,
            allocation: Mutex::new(Some(allocation)),
            layout: Mutex::new(vk::ImageLayout::UNDEFINED),
            is_swapchain: false,
            desc,
        }
    }

    /// Wrap a swapchain-owned image (no allocation; the view is ours)
    pub(crate) fn from_swapchain(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        desc: ImageDesc,
    ) -> Self {
        Self {
            ctx,
            image,
            view,
            allocation: Mutex::new(None),
            layout: Mutex::new(vk::ImageLayout::UNDEFINED),
            is_swapchain: true,
            desc,
        }
    }

    /// Aspect mask derived from the image format
    pub(crate) fn aspect_mask(&self) -> vk::ImageAspectFlags {
        if self.desc.format.is_depth() {
            if self.desc.format.has_stencil() {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            } else {
                vk::ImageAspectFlags::DEPTH
            }
        } else {
            vk::ImageAspectFlags::COLOR
        }
    }

    /// Record a layout transition barrier into `cmd` and update the tracked
    /// layout
    pub(crate) fn transition_layout(
        &self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        new_layout: vk::ImageLayout,
    ) {
        let mut layout = self.layout.lock().unwrap();
        if *layout == new_layout {
            return;
        }

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(*layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: self.aspect_mask(),
                base_mip_level: 0,
                level_count: self.desc.mip_levels,
                base_array_layer: 0,
                layer_count: self.desc.array_layers,
            })
            .src_access_mask(vk::AccessFlags::MEMORY_WRITE)
            .dst_access_mask(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE);

        unsafe {
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::ALL_COMMANDS,
                vk::PipelineStageFlags::ALL_COMMANDS,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
        *layout = new_layout;
    }
}

impl RhiImage for Image {
    fn desc(&self) -> &ImageDesc {
        &self.desc
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);

            if self.is_swapchain {
                // The swapchain owns the VkImage
                return;
            }

            if let Some(allocation) = self.allocation.lock().unwrap().take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
