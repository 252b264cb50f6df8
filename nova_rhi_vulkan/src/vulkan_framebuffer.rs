/// FrameBuffer - Vulkan implementation of the FrameBuffer trait
///
/// A frame buffer owns the render pass derived from its attachment set plus
/// the VkFramebuffer binding the attachment views. De-duplicated through
/// the device cache by descriptor hash.

use ash::vk;
use std::sync::Arc;

use nova_rhi::nova::rhi::{
    FrameBuffer as RhiFrameBuffer, FrameBufferDesc, Image as RhiImage, ImageUsage,
};
use nova_rhi::nova::Result;
use nova_rhi::rhi_err;

use crate::vulkan_context::GpuContext;
use crate::vulkan_convert as convert;
use crate::vulkan_image::Image;

/// Vulkan frame buffer implementation
pub struct FrameBuffer {
    ctx: Arc<GpuContext>,
    /// Render pass compatible with this attachment set
    pub(crate) render_pass: vk::RenderPass,
    /// Framebuffer binding the attachment views
    pub(crate) framebuffer: vk::Framebuffer,
    /// Attachments kept alive for the frame buffer's lifetime, with the
    /// layout each one lands in when a render pass ends
    pub(crate) attachments: Vec<(Arc<dyn RhiImage>, vk::ImageLayout)>,
    width: u32,
    height: u32,
    color_count: usize,
    has_depth: bool,
}

impl FrameBuffer {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &FrameBufferDesc) -> Result<Self> {
        desc.validate()?;

        let mut attachments = Vec::new();
        let mut attachment_views = Vec::new();
        let mut kept: Vec<(Arc<dyn RhiImage>, vk::ImageLayout)> = Vec::new();
        let mut color_refs = Vec::new();
        let mut depth_ref: Option<vk::AttachmentReference> = None;

        for (i, attachment) in desc.color_attachments.iter().enumerate() {
            let image = downcast_image(&attachment.image);
            let image_desc = attachment.image.desc();

            // Swapchain targets present after the pass; sampled targets are
            // read by a later pass
            let final_layout = if image.is_swapchain {
                vk::ImageLayout::PRESENT_SRC_KHR
            } else if image_desc.usage.contains(ImageUsage::SAMPLED) {
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
            } else {
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
            };

            attachments.push(
                vk::AttachmentDescription::default()
                    .format(convert::format_to_vk(image_desc.format))
                    .samples(convert::sample_count_to_vk(image_desc.samples))
                    .load_op(convert::load_op_to_vk(attachment.load_op))
                    .store_op(convert::store_op_to_vk(attachment.store_op))
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(vk::ImageLayout::UNDEFINED)
                    .final_layout(final_layout),
            );
            color_refs.push(
                vk::AttachmentReference::default()
                    .attachment(i as u32)
                    .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
            );
            attachment_views.push(image.view);
            kept.push((Arc::clone(&attachment.image), final_layout));
        }

        if let Some(attachment) = &desc.depth_stencil_attachment {
            let image = downcast_image(&attachment.image);
            let image_desc = attachment.image.desc();
            let index = attachments.len() as u32;
            let final_layout = vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL;

            attachments.push(
                vk::AttachmentDescription::default()
                    .format(convert::format_to_vk(image_desc.format))
                    .samples(convert::sample_count_to_vk(image_desc.samples))
                    .load_op(convert::load_op_to_vk(attachment.load_op))
                    .store_op(convert::store_op_to_vk(attachment.store_op))
                    .stencil_load_op(convert::load_op_to_vk(attachment.load_op))
                    .stencil_store_op(convert::store_op_to_vk(attachment.store_op))
                    .initial_layout(vk::ImageLayout::UNDEFINED)
                    .final_layout(final_layout),
            );
            depth_ref = Some(
                vk::AttachmentReference::default()
                    .attachment(index)
                    .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
            );
            attachment_views.push(image.view);
            kept.push((Arc::clone(&attachment.image), final_layout));
        }

        // Single subpass
        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if let Some(ref depth) = depth_ref {
            subpass = subpass.depth_stencil_attachment(depth);
        }

        // Subpass dependency - include depth stages when depth attachment is present
        let has_depth = depth_ref.is_some();
        let (stage_mask, access_mask) = if has_depth {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
        } else {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            )
        };
        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stage_mask)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stage_mask)
            .dst_access_mask(access_mask);

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        let render_pass = unsafe {
            ctx.device
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to create render pass ({}): {:?}",
                        convert::describe_vk_result(e), e)
                })?
        };

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachment_views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe {
            match ctx.device.create_framebuffer(&framebuffer_info, None) {
                Ok(fb) => fb,
                Err(e) => {
                    ctx.device.destroy_render_pass(render_pass, None);
                    return Err(rhi_err!("nova::vulkan",
                        "Failed to create framebuffer ({}): {:?}",
                        convert::describe_vk_result(e), e));
                }
            }
        };

        Ok(Self {
            ctx,
            render_pass,
            framebuffer,
            attachments: kept,
            width: desc.width,
            height: desc.height,
            color_count: desc.color_attachments.len(),
            has_depth,
        })
    }

    /// Update the tracked layout of every attachment to its post-pass layout
    pub(crate) fn note_render_pass_end(&self) {
        for (image, final_layout) in &self.attachments {
            let vk_image = downcast_image(image);
            *vk_image.layout.lock().unwrap() = *final_layout;
        }
    }
}

/// Downcast an RHI image handle to the Vulkan implementation
pub(crate) fn downcast_image(image: &Arc<dyn RhiImage>) -> &Image {
    unsafe { &*(Arc::as_ptr(image) as *const Image) }
}

impl RhiFrameBuffer for FrameBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn color_attachment_count(&self) -> usize {
        self.color_count
    }

    fn has_depth_stencil(&self) -> bool {
        self.has_depth
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
