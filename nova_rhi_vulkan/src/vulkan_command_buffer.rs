/// CommandBuffer - Vulkan implementation of the CommandBuffer trait
///
/// Each command buffer owns its pool (so worker threads record without
/// sharing pools), a set of transient descriptor pools recycled on reset,
/// and a timeline semaphore used to honor `wait_command` dependencies at
/// submit time.

use ash::vk;
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nova_rhi::nova::rhi::{
    Buffer as RhiBuffer, BufferCopy, BufferImageCopy, ClearValue,
    CommandBuffer as RhiCommandBuffer, CommandBufferKind, FrameBuffer as RhiFrameBuffer,
    GraphicsPipeline as RhiGraphicsPipeline, Image as RhiImage, ImageCopy, IndexType, Rect2D,
    RecordState, Sampler as RhiSampler, ShaderStageFlags, ShaderVariable, ShaderVariableKind,
    Viewport,
};
use nova_rhi::nova::{Error, Result};
use nova_rhi::{rhi_err, rhi_info};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_convert as convert;
use crate::vulkan_framebuffer::{downcast_image, FrameBuffer};
use crate::vulkan_image::Image;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_sampler::Sampler;

/// One deferred descriptor write, flushed before the next draw/dispatch
struct PendingBinding {
    slot: u32,
    descriptor_type: vk::DescriptorType,
    buffer: Option<(vk::Buffer, u64)>,
    image_view: Option<vk::ImageView>,
    sampler: Option<vk::Sampler>,
}

/// Vulkan command buffer implementation
pub struct CommandBuffer {
    ctx: Arc<GpuContext>,
    kind: CommandBufferKind,
    pool: vk::CommandPool,
    pub(crate) cmd: vk::CommandBuffer,
    state: RecordState,
    in_render_pass: bool,
    /// Frame buffer of the active render pass (layout bookkeeping at end)
    active_framebuffer: Option<Arc<dyn RhiFrameBuffer>>,
    /// Layout info of the currently bound pipeline
    bound: Option<BoundPipeline>,
    /// Bound pipeline handle (keeps set layouts alive for binding flushes)
    bound_pipeline: Option<Arc<dyn RhiGraphicsPipeline>>,
    /// Descriptor writes accumulated since the last draw, keyed by set index
    pending: FxHashMap<u32, Vec<PendingBinding>>,
    /// Transient descriptor pools, reset when the buffer is reset
    descriptor_pools: Vec<vk::DescriptorPool>,
    /// Timeline semaphore signaled when a submit containing this buffer completes
    pub(crate) timeline: vk::Semaphore,
    /// Last value signaled (or scheduled to be signaled) on the timeline
    pub(crate) timeline_value: AtomicU64,
    /// Dependencies recorded via `wait_command`, honored at submit
    pub(crate) waits: Vec<(vk::Semaphore, u64)>,
}

struct BoundPipeline {
    layout: vk::PipelineLayout,
    bind_point: vk::PipelineBindPoint,
}

impl CommandBuffer {
    pub(crate) fn create(ctx: Arc<GpuContext>, kind: CommandBufferKind) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let pool = ctx.device.create_command_pool(&pool_info, None).map_err(|e| {
                rhi_err!("nova::vulkan", "Failed to create command pool ({}): {:?}",
                    convert::describe_vk_result(e), e)
            })?;

            let level = match kind {
                CommandBufferKind::Primary => vk::CommandBufferLevel::PRIMARY,
                CommandBufferKind::Secondary => vk::CommandBufferLevel::SECONDARY,
            };
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(level)
                .command_buffer_count(1);
            let buffers = match ctx.device.allocate_command_buffers(&alloc_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(pool, None);
                    return Err(rhi_err!("nova::vulkan",
                        "Failed to allocate command buffer ({}): {:?}",
                        convert::describe_vk_result(e), e));
                }
            };

            // Timeline semaphore for wait_command dependencies
            let mut type_info = vk::SemaphoreTypeCreateInfo::default()
                .semaphore_type(vk::SemaphoreType::TIMELINE)
                .initial_value(0);
            let semaphore_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
            let timeline = match ctx.device.create_semaphore(&semaphore_info, None) {
                Ok(semaphore) => semaphore,
                Err(e) => {
                    ctx.device.destroy_command_pool(pool, None);
                    return Err(rhi_err!("nova::vulkan",
                        "Failed to create timeline semaphore ({}): {:?}",
                        convert::describe_vk_result(e), e));
                }
            };

            Ok(Self {
                ctx,
                kind,
                pool,
                cmd: buffers[0],
                state: RecordState::Initial,
                in_render_pass: false,
                active_framebuffer: None,
                bound: None,
                bound_pipeline: None,
                pending: FxHashMap::default(),
                descriptor_pools: Vec::new(),
                timeline,
                timeline_value: AtomicU64::new(0),
                waits: Vec::new(),
            })
        }
    }

    /// Create a descriptor pool for this buffer's transient sets
    fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 512,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLED_IMAGE,
                descriptor_count: 512,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::SAMPLER,
                descriptor_count: 256,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 512,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: 256,
            },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(256);
        unsafe {
            device.create_descriptor_pool(&info, None).map_err(|e| {
                rhi_err!("nova::vulkan", "Failed to create descriptor pool ({}): {:?}",
                    convert::describe_vk_result(e), e)
            })
        }
    }

    /// Allocate one descriptor set, growing the pool list when exhausted
    fn allocate_descriptor_set(
        &mut self,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet> {
        unsafe {
            if self.descriptor_pools.is_empty() {
                self.descriptor_pools
                    .push(Self::create_descriptor_pool(&self.ctx.device)?);
            }
            let layouts = [layout];
            let current_pool = *self.descriptor_pools.last().unwrap();
            let alloc_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(current_pool)
                .set_layouts(&layouts);

            match self.ctx.device.allocate_descriptor_sets(&alloc_info) {
                Ok(sets) => Ok(sets[0]),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY)
                | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                    let new_pool = Self::create_descriptor_pool(&self.ctx.device)?;
                    self.descriptor_pools.push(new_pool);
                    rhi_info!("nova::vulkan",
                        "Descriptor pool exhausted, created new pool (total: {})",
                        self.descriptor_pools.len());
                    let retry_info = vk::DescriptorSetAllocateInfo::default()
                        .descriptor_pool(new_pool)
                        .set_layouts(&layouts);
                    Ok(self
                        .ctx
                        .device
                        .allocate_descriptor_sets(&retry_info)
                        .map_err(|e| {
                            rhi_err!("nova::vulkan",
                                "Failed to allocate descriptor set ({}): {:?}",
                                convert::describe_vk_result(e), e)
                        })?[0])
                }
                Err(e) => Err(rhi_err!("nova::vulkan",
                    "Failed to allocate descriptor set ({}): {:?}",
                    convert::describe_vk_result(e), e)),
            }
        }
    }

    fn queue_binding(&mut self, variable: ShaderVariable, binding: PendingBinding) -> Result<()> {
        self.state.require_recording()?;
        let set = self.pending.entry(variable.permutation() as u32).or_default();
        set.retain(|b| b.slot != binding.slot);
        set.push(binding);
        Ok(())
    }

    /// Write and bind the accumulated descriptor sets before a draw/dispatch
    fn flush_bindings(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let (layout, bind_point) = {
            let bound = self.bound.as_ref().ok_or_else(|| {
                Error::InvalidOperation("resource binding requires a bound pipeline".to_string())
            })?;
            (bound.layout, bound.bind_point)
        };
        let pipeline = self.bound_pipeline.clone().ok_or_else(|| {
            Error::InvalidOperation("resource binding requires a bound pipeline".to_string())
        })?;
        let vk_pipeline = unsafe { &*(Arc::as_ptr(&pipeline) as *const Pipeline) };
        let set_layouts: Vec<vk::DescriptorSetLayout> = vk_pipeline.set_layouts.clone();

        let pending = std::mem::take(&mut self.pending);
        for (set_index, bindings) in pending {
            let set_layout = *set_layouts.get(set_index as usize).ok_or_else(|| {
                Error::InvalidOperation(format!(
                    "binding targets set {} but the pipeline has {} set layouts",
                    set_index,
                    set_layouts.len()
                ))
            })?;
            let descriptor_set = self.allocate_descriptor_set(set_layout)?;

            // Info structs must outlive the write list
            let mut buffer_infos = Vec::with_capacity(bindings.len());
            let mut image_infos = Vec::with_capacity(bindings.len());
            for binding in &bindings {
                if let Some((buffer, size)) = binding.buffer {
                    buffer_infos.push(
                        vk::DescriptorBufferInfo::default()
                            .buffer(buffer)
                            .offset(0)
                            .range(size),
                    );
                }
                if binding.image_view.is_some() || binding.sampler.is_some() {
                    let mut info = vk::DescriptorImageInfo::default()
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                    if let Some(view) = binding.image_view {
                        info = info.image_view(view);
                    }
                    if let Some(sampler) = binding.sampler {
                        info = info.sampler(sampler);
                    }
                    image_infos.push(info);
                }
            }

            let mut writes = Vec::with_capacity(bindings.len());
            let mut buffer_cursor = 0;
            let mut image_cursor = 0;
            for binding in &bindings {
                let mut write = vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(binding.slot)
                    .descriptor_type(binding.descriptor_type)
                    .descriptor_count(1);
                if binding.buffer.is_some() {
                    write =
                        write.buffer_info(std::slice::from_ref(&buffer_infos[buffer_cursor]));
                    buffer_cursor += 1;
                } else {
                    write = write.image_info(std::slice::from_ref(&image_infos[image_cursor]));
                    image_cursor += 1;
                }
                writes.push(write);
            }

            unsafe {
                self.ctx.device.update_descriptor_sets(&writes, &[]);
                self.ctx.device.cmd_bind_descriptor_sets(
                    self.cmd,
                    bind_point,
                    layout,
                    set_index,
                    &[descriptor_set],
                    &[],
                );
            }
        }
        Ok(())
    }

    fn require_render_pass(&self) -> Result<()> {
        if !self.in_render_pass {
            return Err(Error::InvalidOperation(
                "draw recorded outside a render pass".to_string(),
            ));
        }
        Ok(())
    }

    fn begin_render_pass_inner(
        &mut self,
        framebuffer: &Arc<dyn RhiFrameBuffer>,
        clear_values: &[ClearValue],
        contents: vk::SubpassContents,
    ) -> Result<()> {
        self.state.require_recording()?;
        if self.kind != CommandBufferKind::Primary {
            return Err(Error::InvalidOperation(
                "begin_render_pass on a secondary command buffer".to_string(),
            ));
        }
        if self.in_render_pass {
            return Err(Error::InvalidOperation(
                "begin_render_pass while already inside a render pass".to_string(),
            ));
        }

        let vk_framebuffer =
            unsafe { &*(Arc::as_ptr(framebuffer) as *const FrameBuffer) };

        let vk_clear_values: Vec<vk::ClearValue> = clear_values
            .iter()
            .map(|cv| match cv {
                ClearValue::Color(color) => vk::ClearValue {
                    color: vk::ClearColorValue { float32: *color },
                },
                ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: *depth,
                        stencil: *stencil,
                    },
                },
            })
            .collect();

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_framebuffer.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: framebuffer.width(),
                    height: framebuffer.height(),
                },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.ctx
                .device
                .cmd_begin_render_pass(self.cmd, &begin_info, contents);
        }
        self.in_render_pass = true;
        self.active_framebuffer = Some(Arc::clone(framebuffer));
        Ok(())
    }
}

impl RhiCommandBuffer for CommandBuffer {
    fn kind(&self) -> CommandBufferKind {
        self.kind
    }

    fn state(&self) -> RecordState {
        self.state
    }

    fn begin(&mut self) -> Result<()> {
        self.state.begin()?;
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.ctx
                .device
                .begin_command_buffer(self.cmd, &begin_info)
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to begin command buffer ({}): {:?}",
                        convert::describe_vk_result(e), e)
                })?;
        }
        self.in_render_pass = false;
        self.bound = None;
        self.bound_pipeline = None;
        Ok(())
    }

    fn begin_with_target(&mut self, framebuffer: &Arc<dyn RhiFrameBuffer>) -> Result<()> {
        if self.kind != CommandBufferKind::Secondary {
            return Err(Error::InvalidOperation(
                "begin_with_target: only secondary buffers take an inherited target".to_string(),
            ));
        }
        self.state.begin()?;

        let vk_framebuffer =
            unsafe { &*(Arc::as_ptr(framebuffer) as *const FrameBuffer) };
        let inheritance = vk::CommandBufferInheritanceInfo::default()
            .render_pass(vk_framebuffer.render_pass)
            .subpass(0)
            .framebuffer(vk_framebuffer.framebuffer);
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(
                vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT
                    | vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE,
            )
            .inheritance_info(&inheritance);

        unsafe {
            self.ctx
                .device
                .begin_command_buffer(self.cmd, &begin_info)
                .map_err(|e| {
                    rhi_err!("nova::vulkan",
                        "Failed to begin secondary command buffer ({}): {:?}",
                        convert::describe_vk_result(e), e)
                })?;
        }
        // Draws in this buffer execute inside the inherited render pass
        self.in_render_pass = true;
        self.active_framebuffer = None;
        self.bound = None;
        self.bound_pipeline = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if self.in_render_pass && self.kind == CommandBufferKind::Primary {
            return Err(Error::InvalidOperation(
                "end() called with an open render pass".to_string(),
            ));
        }
        self.state.end()?;
        unsafe {
            self.ctx.device.end_command_buffer(self.cmd).map_err(|e| {
                rhi_err!("nova::vulkan", "Failed to end command buffer ({}): {:?}",
                    convert::describe_vk_result(e), e)
            })?;
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.state.reset()?;
        unsafe {
            self.ctx
                .device
                .reset_command_buffer(self.cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to reset command buffer ({}): {:?}",
                        convert::describe_vk_result(e), e)
                })?;
            // Recycle the transient descriptor sets
            for pool in &self.descriptor_pools {
                self.ctx
                    .device
                    .reset_descriptor_pool(*pool, vk::DescriptorPoolResetFlags::empty())
                    .map_err(|e| {
                        rhi_err!("nova::vulkan", "Failed to reset descriptor pool ({}): {:?}",
                            convert::describe_vk_result(e), e)
                    })?;
            }
        }
        self.pending.clear();
        self.waits.clear();
        self.bound = None;
        self.bound_pipeline = None;
        self.active_framebuffer = None;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        framebuffer: &Arc<dyn RhiFrameBuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.begin_render_pass_inner(framebuffer, clear_values, vk::SubpassContents::INLINE)
    }

    fn begin_render_pass_with_secondaries(
        &mut self,
        framebuffer: &Arc<dyn RhiFrameBuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.begin_render_pass_inner(
            framebuffer,
            clear_values,
            vk::SubpassContents::SECONDARY_COMMAND_BUFFERS,
        )
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.state.require_recording()?;
        if !self.in_render_pass {
            return Err(Error::InvalidOperation(
                "end_render_pass without an open render pass".to_string(),
            ));
        }
        unsafe {
            self.ctx.device.cmd_end_render_pass(self.cmd);
        }
        self.in_render_pass = false;
        if let Some(framebuffer) = self.active_framebuffer.take() {
            let vk_framebuffer =
                unsafe { &*(Arc::as_ptr(&framebuffer) as *const FrameBuffer) };
            vk_framebuffer.note_render_pass_end();
        }
        Ok(())
    }

    fn set_graphics_pipeline(&mut self, pipeline: &Arc<dyn RhiGraphicsPipeline>) -> Result<()> {
        self.state.require_recording()?;
        let vk_pipeline = unsafe { &*(Arc::as_ptr(pipeline) as *const Pipeline) };
        let bind_point = if pipeline.is_compute() {
            vk::PipelineBindPoint::COMPUTE
        } else {
            vk::PipelineBindPoint::GRAPHICS
        };
        unsafe {
            self.ctx
                .device
                .cmd_bind_pipeline(self.cmd, bind_point, vk_pipeline.pipeline);
        }
        self.bound = Some(BoundPipeline {
            layout: vk_pipeline.layout,
            bind_point,
        });
        self.bound_pipeline = Some(Arc::clone(pipeline));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.state.require_recording()?;
        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);
        unsafe {
            self.ctx.device.cmd_set_viewport(self.cmd, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.state.require_recording()?;
        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D {
                x: scissor.x,
                y: scissor.y,
            },
            extent: vk::Extent2D {
                width: scissor.width,
                height: scissor.height,
            },
        };
        unsafe {
            self.ctx.device.cmd_set_scissor(self.cmd, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn RhiBuffer>, offset: u64) -> Result<()> {
        self.state.require_recording()?;
        let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
        unsafe {
            self.ctx
                .device
                .cmd_bind_vertex_buffers(self.cmd, 0, &[vk_buffer.buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(
        &mut self,
        buffer: &Arc<dyn RhiBuffer>,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()> {
        self.state.require_recording()?;
        let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.cmd,
                vk_buffer.buffer,
                offset,
                convert::index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn bind_image(&mut self, variable: ShaderVariable, image: &Arc<dyn RhiImage>) -> Result<()> {
        let vk_image = unsafe { &*(Arc::as_ptr(image) as *const Image) };
        self.queue_binding(
            variable,
            PendingBinding {
                slot: variable.slot() as u32,
                descriptor_type: convert::variable_kind_to_vk(variable.kind()),
                buffer: None,
                image_view: Some(vk_image.view),
                sampler: None,
            },
        )
    }

    fn bind_sampler(
        &mut self,
        variable: ShaderVariable,
        sampler: &Arc<dyn RhiSampler>,
    ) -> Result<()> {
        let vk_sampler = unsafe { &*(Arc::as_ptr(sampler) as *const Sampler) };
        self.queue_binding(
            variable,
            PendingBinding {
                slot: variable.slot() as u32,
                descriptor_type: convert::variable_kind_to_vk(variable.kind()),
                buffer: None,
                image_view: None,
                sampler: Some(vk_sampler.sampler),
            },
        )
    }

    fn bind_uniform_buffer(
        &mut self,
        variable: ShaderVariable,
        buffer: &Arc<dyn RhiBuffer>,
    ) -> Result<()> {
        let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
        let descriptor_type = match variable.kind() {
            ShaderVariableKind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
            _ => vk::DescriptorType::UNIFORM_BUFFER,
        };
        self.queue_binding(
            variable,
            PendingBinding {
                slot: variable.slot() as u32,
                descriptor_type,
                buffer: Some((vk_buffer.buffer, buffer.size())),
                image_view: None,
                sampler: None,
            },
        )
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.state.require_recording()?;
        let bound = self.bound.as_ref().ok_or_else(|| {
            Error::InvalidOperation("push_constants requires a bound pipeline".to_string())
        })?;
        unsafe {
            self.ctx.device.cmd_push_constants(
                self.cmd,
                bound.layout,
                convert::stage_flags_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()> {
        self.state.require_recording()?;
        self.require_render_pass()?;
        self.flush_bindings()?;
        unsafe {
            self.ctx.device.cmd_draw(
                self.cmd,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.state.require_recording()?;
        self.require_render_pass()?;
        self.flush_bindings()?;
        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.cmd,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
        Ok(())
    }

    fn draw_indirect(
        &mut self,
        buffer: &Arc<dyn RhiBuffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.state.require_recording()?;
        self.require_render_pass()?;
        self.flush_bindings()?;
        let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
        unsafe {
            self.ctx.device.cmd_draw_indirect(
                self.cmd,
                vk_buffer.buffer,
                offset,
                draw_count,
                stride,
            );
        }
        Ok(())
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.state.require_recording()?;
        self.flush_bindings()?;
        unsafe {
            self.ctx.device.cmd_dispatch(self.cmd, x, y, z);
        }
        Ok(())
    }

    fn dispatch_indirect(&mut self, buffer: &Arc<dyn RhiBuffer>, offset: u64) -> Result<()> {
        self.state.require_recording()?;
        self.flush_bindings()?;
        let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
        unsafe {
            self.ctx
                .device
                .cmd_dispatch_indirect(self.cmd, vk_buffer.buffer, offset);
        }
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &Arc<dyn RhiBuffer>,
        dst: &Arc<dyn RhiBuffer>,
        regions: &[BufferCopy],
    ) -> Result<()> {
        self.state.require_recording()?;
        let vk_src = unsafe { &*(Arc::as_ptr(src) as *const Buffer) };
        let vk_dst = unsafe { &*(Arc::as_ptr(dst) as *const Buffer) };
        let vk_regions: Vec<vk::BufferCopy> = regions
            .iter()
            .map(|r| {
                vk::BufferCopy::default()
                    .src_offset(r.src_offset)
                    .dst_offset(r.dst_offset)
                    .size(r.size)
            })
            .collect();
        unsafe {
            self.ctx
                .device
                .cmd_copy_buffer(self.cmd, vk_src.buffer, vk_dst.buffer, &vk_regions);
        }
        Ok(())
    }

    fn copy_image(
        &mut self,
        src: &Arc<dyn RhiImage>,
        dst: &Arc<dyn RhiImage>,
        regions: &[ImageCopy],
    ) -> Result<()> {
        self.state.require_recording()?;
        let vk_src = downcast_image(src);
        let vk_dst = downcast_image(dst);
        vk_src.transition_layout(
            &self.ctx.device,
            self.cmd,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );
        vk_dst.transition_layout(
            &self.ctx.device,
            self.cmd,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        let vk_regions: Vec<vk::ImageCopy> = regions
            .iter()
            .map(|r| {
                vk::ImageCopy::default()
                    .src_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: vk_src.aspect_mask(),
                        mip_level: r.src_mip_level,
                        base_array_layer: r.src_array_layer,
                        layer_count: 1,
                    })
                    .dst_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: vk_dst.aspect_mask(),
                        mip_level: r.dst_mip_level,
                        base_array_layer: r.dst_array_layer,
                        layer_count: 1,
                    })
                    .extent(vk::Extent3D {
                        width: r.width,
                        height: r.height,
                        depth: r.depth,
                    })
            })
            .collect();
        unsafe {
            self.ctx.device.cmd_copy_image(
                self.cmd,
                vk_src.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk_dst.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &vk_regions,
            );
        }
        Ok(())
    }

    fn copy_buffer_to_image(
        &mut self,
        src: &Arc<dyn RhiBuffer>,
        dst: &Arc<dyn RhiImage>,
        regions: &[BufferImageCopy],
    ) -> Result<()> {
        self.state.require_recording()?;
        let vk_src = unsafe { &*(Arc::as_ptr(src) as *const Buffer) };
        let vk_dst = downcast_image(dst);
        vk_dst.transition_layout(
            &self.ctx.device,
            self.cmd,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        let vk_regions: Vec<vk::BufferImageCopy> = regions
            .iter()
            .map(|r| {
                vk::BufferImageCopy::default()
                    .buffer_offset(r.buffer_offset)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: vk_dst.aspect_mask(),
                        mip_level: r.mip_level,
                        base_array_layer: r.array_layer,
                        layer_count: 1,
                    })
                    .image_extent(vk::Extent3D {
                        width: r.width,
                        height: r.height,
                        depth: r.depth,
                    })
            })
            .collect();
        unsafe {
            self.ctx.device.cmd_copy_buffer_to_image(
                self.cmd,
                vk_src.buffer,
                vk_dst.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &vk_regions,
            );
        }
        Ok(())
    }

    fn clear_color_image(&mut self, image: &Arc<dyn RhiImage>, color: [f32; 4]) -> Result<()> {
        self.state.require_recording()?;
        let vk_image = downcast_image(image);
        vk_image.transition_layout(
            &self.ctx.device,
            self.cmd,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        let clear_color = vk::ClearColorValue { float32: color };
        let range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: image.desc().mip_levels,
            base_array_layer: 0,
            layer_count: image.desc().array_layers,
        };
        unsafe {
            self.ctx.device.cmd_clear_color_image(
                self.cmd,
                vk_image.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &clear_color,
                &[range],
            );
        }
        Ok(())
    }

    fn clear_depth_stencil_image(
        &mut self,
        image: &Arc<dyn RhiImage>,
        depth: f32,
        stencil: u32,
    ) -> Result<()> {
        self.state.require_recording()?;
        let vk_image = downcast_image(image);
        vk_image.transition_layout(
            &self.ctx.device,
            self.cmd,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        let clear_value = vk::ClearDepthStencilValue { depth, stencil };
        let range = vk::ImageSubresourceRange {
            aspect_mask: vk_image.aspect_mask(),
            base_mip_level: 0,
            level_count: image.desc().mip_levels,
            base_array_layer: 0,
            layer_count: image.desc().array_layers,
        };
        unsafe {
            self.ctx.device.cmd_clear_depth_stencil_image(
                self.cmd,
                vk_image.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &clear_value,
                &[range],
            );
        }
        Ok(())
    }

    fn begin_debug_marker(&mut self, name: &str, color: [f32; 4]) -> Result<()> {
        self.state.require_recording()?;
        if let Some(debug_utils) = &self.ctx.debug_utils_device {
            let label_name = CString::new(name).unwrap_or_default();
            let label = vk::DebugUtilsLabelEXT::default()
                .label_name(&label_name)
                .color(color);
            unsafe {
                debug_utils.cmd_begin_debug_utils_label(self.cmd, &label);
            }
        }
        Ok(())
    }

    fn end_debug_marker(&mut self) -> Result<()> {
        self.state.require_recording()?;
        if let Some(debug_utils) = &self.ctx.debug_utils_device {
            unsafe {
                debug_utils.cmd_end_debug_utils_label(self.cmd);
            }
        }
        Ok(())
    }

    fn wait_command(&mut self, other: &dyn RhiCommandBuffer) -> Result<()> {
        let vk_other = unsafe { &*(other as *const dyn RhiCommandBuffer as *const CommandBuffer) };
        // Target the value the other buffer signals at its next submission
        let target = vk_other.timeline_value.load(Ordering::SeqCst) + 1;
        self.waits.push((vk_other.timeline, target));
        Ok(())
    }

    fn execute_commands(&mut self, secondaries: &[&dyn RhiCommandBuffer]) -> Result<()> {
        self.state.require_recording()?;
        if self.kind != CommandBufferKind::Primary {
            return Err(Error::InvalidOperation(
                "execute_commands: only primary buffers execute secondaries".to_string(),
            ));
        }
        let mut handles = Vec::with_capacity(secondaries.len());
        for secondary in secondaries {
            if secondary.kind() != CommandBufferKind::Secondary {
                return Err(Error::InvalidOperation(
                    "execute_commands: buffer is not secondary".to_string(),
                ));
            }
            if secondary.state() != RecordState::Closed {
                return Err(Error::InvalidOperation(
                    "execute_commands: secondary buffer was not closed with end()".to_string(),
                ));
            }
            let vk_secondary =
                unsafe { &*(*secondary as *const dyn RhiCommandBuffer as *const CommandBuffer) };
            handles.push(vk_secondary.cmd);
        }
        unsafe {
            self.ctx.device.cmd_execute_commands(self.cmd, &handles);
        }
        Ok(())
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.timeline, None);
            for pool in self.descriptor_pools.drain(..) {
                self.ctx.device.destroy_descriptor_pool(pool, None);
            }
            // Command buffer is freed with its pool
            self.ctx.device.destroy_command_pool(self.pool, None);
        }
    }
}
