/// Graphics pipeline descriptor, pipeline trait and dynamic pipeline state

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::hash::{ContentHash, DescHasher, HashCell};
use crate::rhi::buffer::Buffer;
use crate::rhi::command_buffer::{CommandBuffer, Rect2D, Viewport};
use crate::rhi::framebuffer::FrameBuffer;
use crate::rhi::image::Image;
use crate::rhi::input_layout::InputLayout;
use crate::rhi::sampler::Sampler;
use crate::rhi::shader::{Shader, ShaderStage, ShaderVariable, ShaderVariableTable};

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Triangle list
    TriangleList,
    /// Triangle strip
    TriangleStrip,
    /// Line list
    LineList,
    /// Point list
    PointList,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16-bit indices (max 65535 vertices)
    U16,
    /// 32-bit indices (max ~4 billion vertices)
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

// ===== RASTERIZATION ENUMS =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    /// Counter-clockwise vertices define front face
    CounterClockwise,
    /// Clockwise vertices define front face
    Clockwise,
}

/// Polygon rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    /// Fill polygons
    Fill,
    /// Draw edges only (wireframe)
    Line,
    /// Draw vertices only
    Point,
}

// ===== DEPTH/STENCIL ENUMS =====

/// Comparison operator for depth, stencil and sampler compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Never pass
    Never,
    /// Pass if value < reference
    Less,
    /// Pass if value == reference
    Equal,
    /// Pass if value <= reference
    LessOrEqual,
    /// Pass if value > reference
    Greater,
    /// Pass if value != reference
    NotEqual,
    /// Pass if value >= reference
    GreaterOrEqual,
    /// Always pass
    Always,
}

/// Stencil operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    /// Keep current value
    Keep,
    /// Set to zero
    Zero,
    /// Replace with reference value
    Replace,
    /// Increment and clamp to max
    IncrementAndClamp,
    /// Decrement and clamp to zero
    DecrementAndClamp,
    /// Bitwise invert
    Invert,
    /// Increment and wrap around
    IncrementAndWrap,
    /// Decrement and wrap around
    DecrementAndWrap,
}

// ===== COLOR BLEND ENUMS =====

/// Blend factor for color blending equations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    SrcAlphaSaturate,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    /// result = src * srcFactor + dst * dstFactor
    Add,
    /// result = src * srcFactor - dst * dstFactor
    Subtract,
    /// result = dst * dstFactor - src * srcFactor
    ReverseSubtract,
    /// result = min(src, dst)
    Min,
    /// result = max(src, dst)
    Max,
}

// ===== MULTISAMPLE ENUMS =====

/// Multisample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleCount {
    /// 1 sample (no multisampling)
    S1,
    /// 2 samples
    S2,
    /// 4 samples
    S4,
    /// 8 samples
    S8,
}

impl SampleCount {
    /// Sample count as an integer
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleCount::S1 => 1,
            SampleCount::S2 => 2,
            SampleCount::S4 => 4,
            SampleCount::S8 => 8,
        }
    }
}

// ===== RASTERIZATION STATE =====

/// Depth bias parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    /// Constant depth offset
    pub constant_factor: f32,
    /// Slope-based depth offset
    pub slope_factor: f32,
    /// Maximum depth bias clamp
    pub clamp: f32,
}

/// Rasterization fixed-function state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    /// Face culling mode
    pub cull_mode: CullMode,
    /// Front face winding order
    pub front_face: FrontFace,
    /// Polygon rendering mode
    pub polygon_mode: PolygonMode,
    /// Depth bias (None = disabled)
    pub depth_bias: Option<DepthBias>,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
            depth_bias: None,
        }
    }
}

impl RasterizationState {
    fn hash_into(&self, h: &mut DescHasher) {
        h.field(&self.cull_mode)
            .field(&self.front_face)
            .field(&self.polygon_mode);
        match &self.depth_bias {
            Some(bias) => {
                h.field(&true)
                    .f32_field(bias.constant_factor)
                    .f32_field(bias.slope_factor)
                    .f32_field(bias.clamp);
            }
            None => {
                h.field(&false);
            }
        }
    }
}

// ===== DEPTH/STENCIL STATE =====

/// Stencil operation state (per-face)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilOpState {
    /// Action on stencil test fail
    pub fail_op: StencilOp,
    /// Action on stencil pass + depth pass
    pub pass_op: StencilOp,
    /// Action on stencil pass + depth fail
    pub depth_fail_op: StencilOp,
    /// Comparison operator
    pub compare_op: CompareOp,
    /// Bits of stencil buffer read for compare
    pub compare_mask: u32,
    /// Bits of stencil buffer written
    pub write_mask: u32,
    /// Reference value for compare/replace
    pub reference: u32,
}

impl Default for StencilOpState {
    fn default() -> Self {
        Self {
            fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            compare_op: CompareOp::Always,
            compare_mask: 0xFF,
            write_mask: 0xFF,
            reference: 0,
        }
    }
}

/// Depth and stencil testing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    /// Enable depth testing
    pub depth_test_enable: bool,
    /// Enable writing to depth buffer
    pub depth_write_enable: bool,
    /// Depth comparison operator
    pub depth_compare_op: CompareOp,
    /// Enable stencil testing
    pub stencil_test_enable: bool,
    /// Stencil operations for front faces
    pub front: StencilOpState,
    /// Stencil operations for back faces
    pub back: StencilOpState,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: CompareOp::Less,
            stencil_test_enable: false,
            front: StencilOpState::default(),
            back: StencilOpState::default(),
        }
    }
}

// ===== COLOR BLEND STATE =====

/// Color write mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorWriteMask {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub a: bool,
}

impl ColorWriteMask {
    /// All channels enabled
    pub const ALL: Self = Self {
        r: true,
        g: true,
        b: true,
        a: true,
    };
    /// No channels enabled
    pub const NONE: Self = Self {
        r: false,
        g: false,
        b: false,
        a: false,
    };
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Color blending state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorBlendState {
    /// Enable blending
    pub blend_enable: bool,
    /// Source color blend factor
    pub src_color_factor: BlendFactor,
    /// Destination color blend factor
    pub dst_color_factor: BlendFactor,
    /// Color blend operation
    pub color_blend_op: BlendOp,
    /// Source alpha blend factor
    pub src_alpha_factor: BlendFactor,
    /// Destination alpha blend factor
    pub dst_alpha_factor: BlendFactor,
    /// Alpha blend operation
    pub alpha_blend_op: BlendOp,
    /// Color write mask
    pub color_write_mask: ColorWriteMask,
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_color_factor: BlendFactor::One,
            dst_color_factor: BlendFactor::Zero,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
            color_write_mask: ColorWriteMask::ALL,
        }
    }
}

// ===== MULTISAMPLE STATE =====

/// Multisampling state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MultisampleState {
    /// Number of samples per pixel
    pub sample_count: SampleCount,
    /// Enable alpha-to-coverage
    pub alpha_to_coverage: bool,
}

impl Default for MultisampleState {
    fn default() -> Self {
        Self {
            sample_count: SampleCount::S1,
            alpha_to_coverage: false,
        }
    }
}

// ===== PIPELINE DESCRIPTOR =====

/// Number of shader stage slots (one per `ShaderStage` variant)
pub const SHADER_STAGE_COUNT: usize = 6;

/// Descriptor for creating a graphics (or compute) pipeline
///
/// Aggregates topology, input layout, target frame buffer, one shader per
/// stage, and the fixed-function sub-states. The content hash combines the
/// sub-state hashes with the pointer identities of the attached shaders and
/// frame buffer: changing any field changes pipeline identity and therefore
/// cache bucket.
#[derive(Clone)]
pub struct GraphicsPipelineDesc {
    /// Primitive topology
    pub topology: PrimitiveTopology,
    /// Vertex input layout (None for compute or vertex-pulling pipelines)
    pub input_layout: Option<Arc<dyn InputLayout>>,
    /// Target frame buffer (defines attachment formats and render pass)
    pub framebuffer: Option<Arc<dyn FrameBuffer>>,
    /// One shader per stage, indexed by `ShaderStage::index()`
    pub shaders: [Option<Arc<dyn Shader>>; SHADER_STAGE_COUNT],
    /// Rasterization state
    pub rasterization: RasterizationState,
    /// Depth and stencil testing state
    pub depth_stencil: DepthStencilState,
    /// Color blending state
    pub color_blend: ColorBlendState,
    /// Multisampling state
    pub multisample: MultisampleState,
    hash: HashCell,
}

impl GraphicsPipelineDesc {
    pub fn new() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            input_layout: None,
            framebuffer: None,
            shaders: [const { None }; SHADER_STAGE_COUNT],
            rasterization: RasterizationState::default(),
            depth_stencil: DepthStencilState::default(),
            color_blend: ColorBlendState::default(),
            multisample: MultisampleState::default(),
            hash: HashCell::new(),
        }
    }

    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self.hash.invalidate();
        self
    }

    pub fn with_input_layout(mut self, input_layout: Arc<dyn InputLayout>) -> Self {
        self.input_layout = Some(input_layout);
        self.hash.invalidate();
        self
    }

    pub fn with_framebuffer(mut self, framebuffer: Arc<dyn FrameBuffer>) -> Self {
        self.framebuffer = Some(framebuffer);
        self.hash.invalidate();
        self
    }

    /// Attach a shader to its stage slot (at most one shader per stage;
    /// attaching again replaces the previous one)
    pub fn with_shader(mut self, shader: Arc<dyn Shader>) -> Self {
        let stage_index = shader.stage().index();
        self.shaders[stage_index] = Some(shader);
        self.hash.invalidate();
        self
    }

    pub fn with_rasterization(mut self, rasterization: RasterizationState) -> Self {
        self.rasterization = rasterization;
        self.hash.invalidate();
        self
    }

    pub fn with_depth_stencil(mut self, depth_stencil: DepthStencilState) -> Self {
        self.depth_stencil = depth_stencil;
        self.hash.invalidate();
        self
    }

    pub fn with_color_blend(mut self, color_blend: ColorBlendState) -> Self {
        self.color_blend = color_blend;
        self.hash.invalidate();
        self
    }

    pub fn with_multisample(mut self, multisample: MultisampleState) -> Self {
        self.multisample = multisample;
        self.hash.invalidate();
        self
    }

    /// Shader attached at `stage`, if any
    pub fn shader(&self, stage: ShaderStage) -> Option<&Arc<dyn Shader>> {
        self.shaders[stage.index()].as_ref()
    }

    /// True when the descriptor describes a compute pipeline
    pub fn is_compute(&self) -> bool {
        self.shader(ShaderStage::Compute).is_some()
    }

    /// Check the stage combination is constructible
    pub fn validate(&self) -> Result<()> {
        if self.is_compute() {
            let has_graphics_stage = self
                .shaders
                .iter()
                .enumerate()
                .any(|(i, s)| i != ShaderStage::Compute.index() && s.is_some());
            if has_graphics_stage {
                return Err(Error::InvalidResource(
                    "compute pipeline cannot also carry graphics stage shaders".to_string(),
                ));
            }
            return Ok(());
        }
        if self.shader(ShaderStage::Vertex).is_none() {
            return Err(Error::InvalidResource(
                "graphics pipeline requires a vertex shader".to_string(),
            ));
        }
        if self.framebuffer.is_none() {
            return Err(Error::InvalidResource(
                "graphics pipeline requires a target frame buffer".to_string(),
            ));
        }
        Ok(())
    }

    /// Merge the per-stage variable tables into one pipeline table
    pub fn merged_variables(&self) -> ShaderVariableTable {
        let mut table = ShaderVariableTable::new();
        for shader in self.shaders.iter().flatten() {
            table.merge(shader.variables());
        }
        table
    }
}

impl Default for GraphicsPipelineDesc {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHash for GraphicsPipelineDesc {
    fn content_hash(&self) -> u64 {
        self.hash.get_or_compute(|| {
            let mut h = DescHasher::new();
            h.field(&self.topology);
            match &self.input_layout {
                Some(layout) => h.sub_hash(layout.desc().content_hash()),
                None => h.field(&0u8),
            };
            match &self.framebuffer {
                Some(fb) => h.identity(Arc::as_ptr(fb)),
                None => h.field(&0u8),
            };
            for shader in &self.shaders {
                match shader {
                    Some(s) => h.identity(Arc::as_ptr(s)),
                    None => h.field(&0u8),
                };
            }
            self.rasterization.hash_into(&mut h);
            h.field(&self.depth_stencil)
                .field(&self.color_blend)
                .field(&self.multisample);
            h.finish()
        })
    }
}

/// Graphics pipeline resource trait
///
/// Implemented by backend-specific pipeline types (PSOs). Pipelines are
/// de-duplicated through the device cache.
pub trait GraphicsPipeline: Send + Sync {
    /// Merged variable table of the pipeline's shaders
    fn variables(&self) -> &ShaderVariableTable;

    /// True for compute pipelines
    fn is_compute(&self) -> bool;
}

// ===== DYNAMIC PIPELINE STATE =====

bitflags! {
    /// Dirty bits for the mutable per-draw pipeline state
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StateDirty: u32 {
        const VERTEX_BUFFER = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const VIEWPORT = 1 << 2;
        const SCISSOR = 1 << 3;
        const POLYGON_MODE = 1 << 4;
        const RESOURCES = 1 << 5;
    }
}

enum ResourceBinding {
    Image(Arc<dyn Image>),
    Sampler(Arc<dyn Sampler>),
    UniformBuffer(Arc<dyn Buffer>),
}

impl ResourceBinding {
    fn same_as(&self, other: &ResourceBinding) -> bool {
        match (self, other) {
            (ResourceBinding::Image(a), ResourceBinding::Image(b)) => Arc::ptr_eq(a, b),
            (ResourceBinding::Sampler(a), ResourceBinding::Sampler(b)) => Arc::ptr_eq(a, b),
            (ResourceBinding::UniformBuffer(a), ResourceBinding::UniformBuffer(b)) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

struct TrackedBinding {
    binding: ResourceBinding,
    dirty: bool,
}

/// Mutable per-draw pipeline state with dirty-bit diffing
///
/// Distinct from the immutable `GraphicsPipelineDesc`. Setters compare the
/// new value against the currently bound one and only mark the dirty bit
/// when something actually changed, so redundant sets are free. `apply`
/// forwards dirty state into a command buffer; `reset` clears the dirty
/// bits at the start of a pass/frame without touching the bound values, so
/// redundant binds across frames stay suppressed.
///
/// Binding by name routes through the pipeline's variable table; unknown
/// names are deliberately swallowed (find-or-null) because materials may
/// legitimately not use every declared slot permutation.
pub struct PipelineState {
    pipeline: Arc<dyn GraphicsPipeline>,
    dirty: StateDirty,
    vertex_buffer: Option<(Arc<dyn Buffer>, u64)>,
    index_buffer: Option<(Arc<dyn Buffer>, u64, IndexType)>,
    viewport: Option<Viewport>,
    scissor: Option<Rect2D>,
    polygon_mode: Option<PolygonMode>,
    resources: FxHashMap<ShaderVariable, TrackedBinding>,
}

impl PipelineState {
    /// Create the dynamic state tracker for a pipeline
    pub fn new(pipeline: Arc<dyn GraphicsPipeline>) -> Self {
        Self {
            pipeline,
            dirty: StateDirty::empty(),
            vertex_buffer: None,
            index_buffer: None,
            viewport: None,
            scissor: None,
            polygon_mode: None,
            resources: FxHashMap::default(),
        }
    }

    /// The pipeline this state belongs to
    pub fn pipeline(&self) -> &Arc<dyn GraphicsPipeline> {
        &self.pipeline
    }

    /// Current dirty set
    pub fn dirty(&self) -> StateDirty {
        self.dirty
    }

    pub fn set_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) {
        if let Some((bound, bound_offset)) = &self.vertex_buffer {
            if Arc::ptr_eq(bound, buffer) && *bound_offset == offset {
                return;
            }
        }
        self.vertex_buffer = Some((Arc::clone(buffer), offset));
        self.dirty |= StateDirty::VERTEX_BUFFER;
    }

    pub fn set_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) {
        if let Some((bound, bound_offset, bound_type)) = &self.index_buffer {
            if Arc::ptr_eq(bound, buffer) && *bound_offset == offset && *bound_type == index_type {
                return;
            }
        }
        self.index_buffer = Some((Arc::clone(buffer), offset, index_type));
        self.dirty |= StateDirty::INDEX_BUFFER;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport == Some(viewport) {
            return;
        }
        self.viewport = Some(viewport);
        self.dirty |= StateDirty::VIEWPORT;
    }

    pub fn set_scissor(&mut self, scissor: Rect2D) {
        if self.scissor == Some(scissor) {
            return;
        }
        self.scissor = Some(scissor);
        self.dirty |= StateDirty::SCISSOR;
    }

    /// Override the pipeline's polygon mode for subsequent draws
    ///
    /// Polygon mode is baked into the PSO, so the override is not forwarded
    /// by `apply`; the pass reads it via `polygon_mode_override` when
    /// selecting the pipeline variant to bind.
    pub fn set_polygon_mode(&mut self, polygon_mode: PolygonMode) {
        if self.polygon_mode == Some(polygon_mode) {
            return;
        }
        self.polygon_mode = Some(polygon_mode);
        self.dirty |= StateDirty::POLYGON_MODE;
    }

    /// Current polygon-mode override, if any
    pub fn polygon_mode_override(&self) -> Option<PolygonMode> {
        self.polygon_mode
    }

    /// Bind an image to a named fragment/vertex/... variable
    ///
    /// No-op when the name is unknown or declared for a different stage.
    pub fn set_image(&mut self, stage: ShaderStage, name: &str, image: &Arc<dyn Image>) {
        if let Some(var) = self.find_variable(stage, name) {
            self.set_resource(var, ResourceBinding::Image(Arc::clone(image)));
        }
    }

    /// Bind a sampler to a named variable; unknown names are swallowed
    pub fn set_sampler(&mut self, stage: ShaderStage, name: &str, sampler: &Arc<dyn Sampler>) {
        if let Some(var) = self.find_variable(stage, name) {
            self.set_resource(var, ResourceBinding::Sampler(Arc::clone(sampler)));
        }
    }

    /// Bind a uniform buffer to a named variable; unknown names are swallowed
    pub fn set_uniform_buffer(&mut self, stage: ShaderStage, name: &str, buffer: &Arc<dyn Buffer>) {
        if let Some(var) = self.find_variable(stage, name) {
            self.set_resource(var, ResourceBinding::UniformBuffer(Arc::clone(buffer)));
        }
    }

    fn find_variable(&self, stage: ShaderStage, name: &str) -> Option<ShaderVariable> {
        self.pipeline
            .variables()
            .find(name)
            .filter(|var| var.stage() == stage)
    }

    fn set_resource(&mut self, var: ShaderVariable, binding: ResourceBinding) {
        if let Some(tracked) = self.resources.get(&var) {
            if tracked.binding.same_as(&binding) {
                return;
            }
        }
        self.resources.insert(
            var,
            TrackedBinding {
                binding,
                dirty: true,
            },
        );
        self.dirty |= StateDirty::RESOURCES;
    }

    /// Clear all dirty bits without touching the bound values
    pub fn reset(&mut self) {
        self.dirty = StateDirty::empty();
        for tracked in self.resources.values_mut() {
            tracked.dirty = false;
        }
    }

    /// Forward dirty state into a command buffer, then clear the dirty bits
    pub fn apply(&mut self, cmd: &mut dyn CommandBuffer) -> Result<()> {
        if self.dirty.contains(StateDirty::VIEWPORT) {
            if let Some(viewport) = self.viewport {
                cmd.set_viewport(viewport)?;
            }
        }
        if self.dirty.contains(StateDirty::SCISSOR) {
            if let Some(scissor) = self.scissor {
                cmd.set_scissor(scissor)?;
            }
        }
        if self.dirty.contains(StateDirty::VERTEX_BUFFER) {
            if let Some((buffer, offset)) = &self.vertex_buffer {
                cmd.bind_vertex_buffer(buffer, *offset)?;
            }
        }
        if self.dirty.contains(StateDirty::INDEX_BUFFER) {
            if let Some((buffer, offset, index_type)) = &self.index_buffer {
                cmd.bind_index_buffer(buffer, *offset, *index_type)?;
            }
        }
        if self.dirty.contains(StateDirty::RESOURCES) {
            for (var, tracked) in self.resources.iter_mut() {
                if !tracked.dirty {
                    continue;
                }
                match &tracked.binding {
                    ResourceBinding::Image(image) => cmd.bind_image(*var, image)?,
                    ResourceBinding::Sampler(sampler) => cmd.bind_sampler(*var, sampler)?,
                    ResourceBinding::UniformBuffer(buffer) => {
                        cmd.bind_uniform_buffer(*var, buffer)?
                    }
                }
                tracked.dirty = false;
            }
        }
        self.dirty = StateDirty::empty();
        Ok(())
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
