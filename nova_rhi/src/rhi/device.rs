/// Device trait - the backend-specific resource factory

use std::sync::Arc;

use crate::error::Result;
use crate::rhi::buffer::{Buffer, BufferAccess, BufferDesc, BufferUsage};
use crate::rhi::command_buffer::{CommandBuffer, CommandBufferKind};
use crate::rhi::framebuffer::{FrameBuffer, FrameBufferDesc};
use crate::rhi::image::{Image, ImageDesc};
use crate::rhi::input_layout::{InputLayout, InputLayoutDesc};
use crate::rhi::pipeline::{GraphicsPipeline, GraphicsPipelineDesc};
use crate::rhi::sampler::{Sampler, SamplerDesc};
use crate::rhi::shader::{Shader, ShaderDesc};

/// Queue a command buffer batch is submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Graphics,
    Transfer,
    Compute,
}

/// Main device trait — sole authority for creating and de-duplicating
/// GPU-visible objects for one backend instance
///
/// The `create_*` methods always construct a new backend object and fail
/// with a logged error when the backend rejects the descriptor. The
/// `get_or_create_*` methods de-duplicate through hash-keyed caches: for a
/// given device at most one object exists per distinct descriptor hash, and
/// concurrent callers requesting the same content receive the same handle
/// (creation runs at most once; race losers block on the cache lock).
pub trait Device: Send + Sync {
    /// Create a buffer
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create an image, optionally uploading `initial_data` through the
    /// staging allocator
    fn create_image(&self, desc: &ImageDesc, initial_data: Option<&[u8]>)
        -> Result<Arc<dyn Image>>;

    /// Create a shader from compiled SPIR-V
    fn create_shader(&self, desc: &ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Create a sampler (uncached; prefer `get_or_create_sampler`)
    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>>;

    /// Create an input layout (uncached; prefer `get_or_create_input_layout`)
    fn create_input_layout(&self, desc: &InputLayoutDesc) -> Result<Arc<dyn InputLayout>>;

    /// Create a graphics/compute pipeline (uncached; prefer
    /// `get_or_create_graphics_pipeline`)
    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<Arc<dyn GraphicsPipeline>>;

    /// Create a frame buffer (uncached; prefer `get_or_create_framebuffer`)
    fn create_framebuffer(&self, desc: &FrameBufferDesc) -> Result<Arc<dyn FrameBuffer>>;

    /// Create a primary or secondary command buffer
    fn create_command_buffer(&self, kind: CommandBufferKind) -> Result<Box<dyn CommandBuffer>>;

    /// Return the cached sampler for `desc`, creating it on first use
    fn get_or_create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>>;

    /// Return the cached input layout for `desc`, creating it on first use
    fn get_or_create_input_layout(&self, desc: &InputLayoutDesc) -> Result<Arc<dyn InputLayout>>;

    /// Return the cached pipeline for `desc`, creating it on first use
    fn get_or_create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<Arc<dyn GraphicsPipeline>>;

    /// Return the cached frame buffer for `desc`, creating it on first use
    fn get_or_create_framebuffer(&self, desc: &FrameBufferDesc) -> Result<Arc<dyn FrameBuffer>>;

    /// Create a CPU-writable uniform buffer (convenience, never cached)
    fn create_uniform_buffer(&self, size: u64) -> Result<Arc<dyn Buffer>> {
        let desc = BufferDesc::new(size)
            .with_usage(BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST)
            .with_access(BufferAccess::CPU_WRITE | BufferAccess::GPU_READ);
        self.create_buffer(&desc)
    }

    /// Create a CPU-writable vertex buffer (convenience, never cached)
    fn create_vertex_buffer(&self, size: u64) -> Result<Arc<dyn Buffer>> {
        let desc = BufferDesc::new(size)
            .with_usage(BufferUsage::VERTEX | BufferUsage::TRANSFER_DST)
            .with_access(BufferAccess::CPU_WRITE | BufferAccess::GPU_READ);
        self.create_buffer(&desc)
    }

    /// Create a CPU-writable index buffer (convenience, never cached)
    fn create_index_buffer(&self, size: u64) -> Result<Arc<dyn Buffer>> {
        let desc = BufferDesc::new(size)
            .with_usage(BufferUsage::INDEX | BufferUsage::TRANSFER_DST)
            .with_access(BufferAccess::CPU_WRITE | BufferAccess::GPU_READ);
        self.create_buffer(&desc)
    }

    /// Submit recorded command buffers to the named queue
    ///
    /// Buffers submitted in one call execute in the order passed. Across
    /// calls, submission order is the caller's responsibility: there is no
    /// implicit reordering and no implicit synchronization between queues
    /// beyond `wait_command` dependencies recorded in the buffers.
    fn submit(&self, queue: QueueKind, buffers: &[&dyn CommandBuffer]) -> Result<()>;

    /// Block until all previously submitted work on all queues completes
    ///
    /// Used at shutdown or for synchronous resource destruction.
    fn wait_idle(&self) -> Result<()>;
}
