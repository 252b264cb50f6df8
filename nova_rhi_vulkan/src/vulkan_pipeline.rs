/// GraphicsPipeline - Vulkan implementation of the GraphicsPipeline trait
///
/// Builds the pipeline layout (descriptor set layouts + push constant
/// ranges) from the merged shader variable table, then the graphics or
/// compute PSO. De-duplicated through the device cache by descriptor hash.

use ash::vk;
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::sync::Arc;

use nova_rhi::nova::rhi::{
    GraphicsPipeline as RhiGraphicsPipeline, GraphicsPipelineDesc, Shader as RhiShader,
    ShaderStage, ShaderVariableTable,
};
use nova_rhi::nova::{Error, Result};
use nova_rhi::rhi_err;

use crate::vulkan_context::GpuContext;
use crate::vulkan_convert as convert;
use crate::vulkan_framebuffer::FrameBuffer;
use crate::vulkan_input_layout::InputLayout;
use crate::vulkan_shader::Shader;

/// Vulkan pipeline implementation (graphics or compute PSO)
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    /// Vulkan pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout (accessed internally for descriptor/push-constant binding)
    pub(crate) layout: vk::PipelineLayout,
    /// One descriptor set layout per set index (empty layouts fill gaps)
    pub(crate) set_layouts: Vec<vk::DescriptorSetLayout>,
    /// Merged variable table of the attached shaders
    variables: ShaderVariableTable,
    is_compute: bool,
}

/// Downcast an RHI shader handle to the Vulkan implementation
fn downcast_shader(shader: &Arc<dyn RhiShader>) -> &Shader {
    unsafe { &*(Arc::as_ptr(shader) as *const Shader) }
}

impl Pipeline {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &GraphicsPipelineDesc) -> Result<Self> {
        desc.validate()?;

        let variables = desc.merged_variables();

        // Group variables by set index to build descriptor set layouts
        let mut set_bindings: FxHashMap<u32, Vec<vk::DescriptorSetLayoutBinding>> =
            FxHashMap::default();
        for (_, variable) in variables.iter() {
            let bindings = set_bindings.entry(variable.permutation() as u32).or_default();
            let slot = variable.slot() as u32;
            let stage = convert::shader_stage_to_vk(variable.stage());
            if let Some(existing) = bindings.iter_mut().find(|b| b.binding == slot) {
                existing.stage_flags |= stage;
            } else {
                bindings.push(
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(slot)
                        .descriptor_type(convert::variable_kind_to_vk(variable.kind()))
                        .descriptor_count(1)
                        .stage_flags(stage),
                );
            }
        }

        let max_set = set_bindings.keys().copied().max().map_or(0, |s| s + 1);
        let mut set_layouts = Vec::with_capacity(max_set as usize);
        for set in 0..max_set {
            let bindings = set_bindings.remove(&set).unwrap_or_default();
            let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            let layout = unsafe {
                ctx.device
                    .create_descriptor_set_layout(&layout_info, None)
                    .map_err(|e| {
                        rhi_err!("nova::vulkan",
                            "Failed to create descriptor set layout ({}): {:?}",
                            convert::describe_vk_result(e), e)
                    })?
            };
            set_layouts.push(layout);
        }

        // Push constant ranges from the reflected per-shader block sizes
        let mut push_constant_ranges = Vec::new();
        for shader in desc.shaders.iter().flatten() {
            let vk_shader = downcast_shader(shader);
            if let Some(size) = vk_shader.push_constant_size {
                push_constant_ranges.push(
                    vk::PushConstantRange::default()
                        .stage_flags(convert::shader_stage_to_vk(shader.stage()))
                        .offset(0)
                        .size(size),
                );
            }
        }

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        let layout = unsafe {
            ctx.device
                .create_pipeline_layout(&layout_info, None)
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to create pipeline layout ({}): {:?}",
                        convert::describe_vk_result(e), e)
                })?
        };

        let pipeline = if desc.is_compute() {
            Self::create_compute_pso(&ctx, desc, layout)?
        } else {
            Self::create_graphics_pso(&ctx, desc, layout)?
        };

        Ok(Self {
            ctx,
            pipeline,
            layout,
            set_layouts,
            variables,
            is_compute: desc.is_compute(),
        })
    }

    fn create_compute_pso(
        ctx: &GpuContext,
        desc: &GraphicsPipelineDesc,
        layout: vk::PipelineLayout,
    ) -> Result<vk::Pipeline> {
        let shader = desc.shader(ShaderStage::Compute).unwrap();
        let vk_shader = downcast_shader(shader);
        let entry = CString::new(vk_shader.entry_point.as_str())
            .map_err(|_| Error::InvalidResource("entry point contains NUL".to_string()))?;

        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(vk_shader.module)
            .name(&entry);

        let create_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(layout);

        let pipelines = unsafe {
            ctx.device
                .create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| {
                    rhi_err!("nova::vulkan", "Failed to create compute pipeline ({}): {:?}",
                        convert::describe_vk_result(e), e)
                })?
        };
        Ok(pipelines[0])
    }

    fn create_graphics_pso(
        ctx: &GpuContext,
        desc: &GraphicsPipelineDesc,
        layout: vk::PipelineLayout,
    ) -> Result<vk::Pipeline> {
        // Shader stages
        let mut entries = Vec::new();
        let mut stages = Vec::new();
        for shader in desc.shaders.iter().flatten() {
            let vk_shader = downcast_shader(shader);
            let entry = CString::new(vk_shader.entry_point.as_str())
                .map_err(|_| Error::InvalidResource("entry point contains NUL".to_string()))?;
            entries.push((vk_shader.module, convert::shader_stage_to_vk(shader.stage()), entry));
        }
        for (module, stage, entry) in &entries {
            stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(*stage)
                    .module(*module)
                    .name(entry),
            );
        }

        // Vertex input from the (optional) input layout
        let empty_bindings: Vec<vk::VertexInputBindingDescription> = Vec::new();
        let empty_attributes: Vec<vk::VertexInputAttributeDescription> = Vec::new();
        let (bindings, attributes) = match &desc.input_layout {
            Some(layout) => {
                let vk_layout =
                    unsafe { &*(Arc::as_ptr(layout) as *const InputLayout) };
                (&vk_layout.bindings, &vk_layout.attributes)
            }
            None => (&empty_bindings, &empty_attributes),
        };
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(bindings)
            .vertex_attribute_descriptions(attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(convert::topology_to_vk(desc.topology))
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic; only the counts matter here
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let raster = &desc.rasterization;
        let mut rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(convert::polygon_mode_to_vk(raster.polygon_mode))
            .cull_mode(convert::cull_mode_to_vk(raster.cull_mode))
            .front_face(convert::front_face_to_vk(raster.front_face))
            .line_width(1.0);
        if let Some(bias) = &raster.depth_bias {
            rasterization = rasterization
                .depth_bias_enable(true)
                .depth_bias_constant_factor(bias.constant_factor)
                .depth_bias_slope_factor(bias.slope_factor)
                .depth_bias_clamp(bias.clamp);
        }

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(convert::sample_count_to_vk(desc.multisample.sample_count))
            .alpha_to_coverage_enable(desc.multisample.alpha_to_coverage);

        let ds = &desc.depth_stencil;
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(ds.depth_test_enable)
            .depth_write_enable(ds.depth_write_enable)
            .depth_compare_op(convert::compare_op_to_vk(ds.depth_compare_op))
            .stencil_test_enable(ds.stencil_test_enable)
            .front(convert::stencil_op_state_to_vk(&ds.front))
            .back(convert::stencil_op_state_to_vk(&ds.back));

        // One blend attachment per color attachment, same state for all
        let framebuffer = desc.framebuffer.as_ref().unwrap();
        let vk_framebuffer = unsafe { &*(Arc::as_ptr(framebuffer) as *const FrameBuffer) };
        let cb = &desc.color_blend;
        let blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(cb.blend_enable)
            .src_color_blend_factor(convert::blend_factor_to_vk(cb.src_color_factor))
            .dst_color_blend_factor(convert::blend_factor_to_vk(cb.dst_color_factor))
            .color_blend_op(convert::blend_op_to_vk(cb.color_blend_op))
            .src_alpha_blend_factor(convert::blend_factor_to_vk(cb.src_alpha_factor))
            .dst_alpha_blend_factor(convert::blend_factor_to_vk(cb.dst_alpha_factor))
            .alpha_blend_op(convert::blend_op_to_vk(cb.alpha_blend_op))
            .color_write_mask(convert::color_write_mask_to_vk(&cb.color_write_mask));
        let blend_attachments =
            vec![blend_attachment; framebuffer.color_attachment_count().max(1)];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(vk_framebuffer.render_pass)
            .subpass(0);

        let pipelines = unsafe {
            ctx.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| {
                    rhi_err!("nova::vulkan", "Failed to create graphics pipeline ({}): {:?}",
                        convert::describe_vk_result(e), e)
                })?
        };
        Ok(pipelines[0])
    }
}

impl RhiGraphicsPipeline for Pipeline {
    fn variables(&self) -> &ShaderVariableTable {
        &self.variables
    }

    fn is_compute(&self) -> bool {
        self.is_compute
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
            for layout in self.set_layouts.drain(..) {
                self.ctx.device.destroy_descriptor_set_layout(layout, None);
            }
        }
    }
}
