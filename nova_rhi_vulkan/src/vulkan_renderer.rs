/// VulkanRenderer - Vulkan implementation of the Renderer trait
///
/// Owns the device and swapchain, and advances frames: waits the frame
/// fence, acquires the next image, submits the frame's primary command
/// buffers in order and presents.

use ash::vk;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use winit::window::Window;

use nova_rhi::nova::rhi::{
    AttachmentDesc, CommandBuffer as RhiCommandBuffer, Device as RhiDevice,
    FrameBuffer as RhiFrameBuffer, FrameBufferDesc, LoadOp, RecordState, Renderer as RhiRenderer,
    RendererConfig, RendererStats, StoreOp,
};
use nova_rhi::nova::{Error, Result};
use nova_rhi::{rhi_err, rhi_info};

use crate::vulkan_command_buffer::CommandBuffer;
use crate::vulkan_convert as convert;
use crate::vulkan_device::VulkanDevice;
use crate::vulkan_swapchain::Swapchain;

/// Vulkan renderer implementation
pub struct VulkanRenderer {
    device: Arc<VulkanDevice>,
    swapchain: Swapchain,
    /// One frame buffer per swapchain image (uncached: swapchain images
    /// change identity on recreate)
    framebuffers: Vec<Arc<dyn RhiFrameBuffer>>,

    /// Per-frame sync objects
    image_available: Vec<vk::Semaphore>,
    render_finished: Vec<vk::Semaphore>,
    in_flight: Vec<vk::Fence>,

    frames_in_flight: usize,
    current_frame: usize,
    /// Image acquired by the current begin_frame
    current_image: Option<u32>,
    /// Deferred resize request applied at the next begin_frame
    pending_resize: Option<(u32, u32)>,

    stats: RendererStats,
}

impl VulkanRenderer {
    /// Create the renderer, device and swapchain for `window`
    pub fn new(window: &Window, config: RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let device = Arc::new(VulkanDevice::new(window, &config)?);
        let swapchain = Swapchain::new(&device, window, size.width.max(1), size.height.max(1))?;

        let frames_in_flight = config.frames_in_flight.max(1) as usize;
        let mut image_available = Vec::with_capacity(frames_in_flight);
        let mut render_finished = Vec::with_capacity(frames_in_flight);
        let mut in_flight = Vec::with_capacity(frames_in_flight);
        unsafe {
            for _ in 0..frames_in_flight {
                image_available.push(
                    device
                        .device
                        .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                        .map_err(|e| {
                            rhi_err!("nova::vulkan", "Failed to create semaphore: {:?}", e)
                        })?,
                );
                render_finished.push(
                    device
                        .device
                        .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                        .map_err(|e| {
                            rhi_err!("nova::vulkan", "Failed to create semaphore: {:?}", e)
                        })?,
                );
                let fence_info =
                    vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
                in_flight.push(device.device.create_fence(&fence_info, None).map_err(
                    |e| rhi_err!("nova::vulkan", "Failed to create frame fence: {:?}", e),
                )?);
            }
        }

        let mut renderer = Self {
            device,
            swapchain,
            framebuffers: Vec::new(),
            image_available,
            render_finished,
            in_flight,
            frames_in_flight,
            current_frame: 0,
            current_image: None,
            pending_resize: None,
            stats: RendererStats::default(),
        };
        renderer.rebuild_framebuffers()?;
        rhi_info!("nova::vulkan", "Renderer initialized with {} frames in flight",
            frames_in_flight);
        Ok(renderer)
    }

    /// The concrete device (backend-specific callers)
    pub fn vulkan_device(&self) -> &Arc<VulkanDevice> {
        &self.device
    }

    fn rebuild_framebuffers(&mut self) -> Result<()> {
        self.framebuffers.clear();
        for image in self.swapchain.images() {
            let desc = FrameBufferDesc::new(self.swapchain.width(), self.swapchain.height())
                .with_color_attachment(
                    AttachmentDesc::new(Arc::clone(image))
                        .with_ops(LoadOp::Clear, StoreOp::Store),
                );
            self.framebuffers.push(self.device.create_framebuffer(&desc)?);
        }
        Ok(())
    }

    fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        self.swapchain.recreate(width, height)?;
        self.rebuild_framebuffers()
    }
}

impl RhiRenderer for VulkanRenderer {
    fn device(&self) -> Arc<dyn RhiDevice> {
        Arc::clone(&self.device) as Arc<dyn RhiDevice>
    }

    fn begin_frame(&mut self) -> Result<()> {
        if let Some((width, height)) = self.pending_resize.take() {
            self.recreate_swapchain(width, height)?;
        }

        unsafe {
            self.device
                .device
                .wait_for_fences(&[self.in_flight[self.current_frame]], true, u64::MAX)
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Frame fence wait failed: {:?}", e)
                })?;
        }

        let image_index = match self
            .swapchain
            .acquire_next_image(self.image_available[self.current_frame])
        {
            Ok(index) => index,
            Err(Error::BackendError(msg)) if msg.contains("out of date") => {
                // Window changed under us; rebuild and try once more
                let (width, height) = (self.swapchain.width(), self.swapchain.height());
                self.recreate_swapchain(width, height)?;
                self.swapchain
                    .acquire_next_image(self.image_available[self.current_frame])?
            }
            Err(e) => return Err(e),
        };

        unsafe {
            self.device
                .device
                .reset_fences(&[self.in_flight[self.current_frame]])
                .map_err(|e| rhi_err!("nova::vulkan", "Frame fence reset failed: {:?}", e))?;
        }

        self.current_image = Some(image_index);
        self.stats.command_buffers_submitted = 0;
        self.stats.draw_calls = 0;
        Ok(())
    }

    fn current_framebuffer(&self) -> Result<Arc<dyn RhiFrameBuffer>> {
        let index = self.current_image.ok_or_else(|| {
            Error::InvalidOperation(
                "current_framebuffer called outside begin_frame/end_frame".to_string(),
            )
        })?;
        Ok(Arc::clone(&self.framebuffers[index as usize]))
    }

    fn end_frame(&mut self, commands: &[&dyn RhiCommandBuffer]) -> Result<()> {
        let image_index = self.current_image.take().ok_or_else(|| {
            Error::InvalidOperation("end_frame without begin_frame".to_string())
        })?;

        // Collect the frame's primary buffers, preserving order
        let mut command_buffers = Vec::with_capacity(commands.len());
        let mut wait_semaphores = vec![self.image_available[self.current_frame]];
        let mut wait_values = vec![0u64];
        let mut wait_stages = vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let mut signal_semaphores = vec![self.render_finished[self.current_frame]];
        let mut signal_values = vec![0u64];

        for buffer in commands {
            if buffer.state() != RecordState::Closed {
                return Err(Error::InvalidOperation(
                    "end_frame: command buffer was not closed with end()".to_string(),
                ));
            }
            let vk_buffer =
                unsafe { &*(*buffer as *const dyn RhiCommandBuffer as *const CommandBuffer) };
            command_buffers.push(vk_buffer.cmd);
            for (semaphore, value) in &vk_buffer.waits {
                wait_semaphores.push(*semaphore);
                wait_values.push(*value);
                wait_stages.push(vk::PipelineStageFlags::ALL_COMMANDS);
            }
            let next = vk_buffer.timeline_value.fetch_add(1, Ordering::SeqCst) + 1;
            signal_semaphores.push(vk_buffer.timeline);
            signal_values.push(next);
        }

        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default()
            .wait_semaphore_values(&wait_values)
            .signal_semaphore_values(&signal_values);
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        unsafe {
            let queue = self.device.ctx.graphics_queue.lock().unwrap();
            self.device
                .device
                .queue_submit(
                    *queue,
                    &[submit_info],
                    self.in_flight[self.current_frame],
                )
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Frame submit failed ({}): {:?}",
                        convert::describe_vk_result(e), e)
                })?;
        }

        let present_queue = self.device.present_queue.ok_or_else(|| {
            Error::InvalidOperation("renderer device has no present queue".to_string())
        })?;
        let needs_recreate = self.swapchain.present(
            present_queue,
            image_index,
            self.render_finished[self.current_frame],
        )?;
        if needs_recreate {
            let (width, height) = (self.swapchain.width(), self.swapchain.height());
            self.pending_resize = Some((width, height));
        }

        self.stats.command_buffers_submitted = commands.len() as u32;
        self.current_frame = (self.current_frame + 1) % self.frames_in_flight;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.pending_resize = Some((width, height));
        }
    }

    fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    fn stats(&self) -> RendererStats {
        self.stats
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe {
            self.device.device.device_wait_idle().ok();
            for semaphore in self
                .image_available
                .drain(..)
                .chain(self.render_finished.drain(..))
            {
                self.device.device.destroy_semaphore(semaphore, None);
            }
            for fence in self.in_flight.drain(..) {
                self.device.device.destroy_fence(fence, None);
            }
        }
    }
}
