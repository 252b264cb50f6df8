/// Mock device for unit tests (no GPU required)
///
/// The mock command buffer records command names into a log; the mock
/// device flattens each submitted buffer's log into a shared submission
/// log, so cache, state-machine and submission-ordering properties can be
/// tested without a graphics backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::GuardedCache;
use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::rhi::{
    resolve_range, Buffer, BufferCopy, BufferDesc, BufferImageCopy, ClearValue, CommandBuffer,
    CommandBufferKind, Device, FrameBuffer, FrameBufferDesc, GraphicsPipeline,
    GraphicsPipelineDesc, Image, ImageCopy, ImageDesc, IndexType, InputLayout, InputLayoutDesc,
    QueueKind, Rect2D, RecordState, Sampler, SamplerDesc, Shader, ShaderDesc, ShaderStage,
    ShaderStageFlags, ShaderVariable, ShaderVariableTable, Viewport,
};

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    /// Backing store; never reallocates after creation so mapped pointers
    /// stay valid for the buffer's lifetime
    data: Mutex<Vec<u8>>,
    mapped: Mutex<bool>,
    cpu_writable: bool,
    size: u64,
}

impl MockBuffer {
    pub fn new(desc: &BufferDesc) -> Self {
        Self {
            data: Mutex::new(vec![0u8; desc.size as usize]),
            mapped: Mutex::new(false),
            cpu_writable: desc.cpu_writable(),
            size: desc.size,
        }
    }

    /// Copy of the current contents (test inspection)
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    pub fn is_mapped(&self) -> bool {
        *self.mapped.lock().unwrap()
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn map(&self, size: u64, offset: u64) -> Result<*mut u8> {
        if !self.cpu_writable {
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
        *self.mapped.lock().unwrap() = true;
        let mut data = self.data.lock().unwrap();
        Ok(unsafe { data.as_mut_ptr().add(offset as usize) })
    }

    fn unmap(&self) {
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

    fn flush_mapped_range(&self, _offset: u64, _size: u64) -> Result<()> {
        // Mock memory is always coherent
        Ok(())
    }

    fn invalidate_mapped_range(&self, _offset: u64, _size: u64) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Mock Image
// ============================================================================

pub struct MockImage {
    desc: ImageDesc,
}

impl MockImage {
    pub fn new(desc: ImageDesc) -> Self {
        Self { desc }
    }
}

impl Image for MockImage {
    fn desc(&self) -> &ImageDesc {
        &self.desc
    }
}

// ============================================================================
// Mock Sampler / InputLayout / Shader / Pipeline / FrameBuffer
// ============================================================================

pub struct MockSampler;

impl Sampler for MockSampler {}

pub struct MockInputLayout {
    desc: InputLayoutDesc,
}

impl InputLayout for MockInputLayout {
    fn desc(&self) -> &InputLayoutDesc {
        &self.desc
    }
}

pub struct MockShader {
    stage: ShaderStage,
    variables: ShaderVariableTable,
}

impl MockShader {
    pub fn new(desc: &ShaderDesc) -> Self {
        let mut variables = ShaderVariableTable::new();
        for (name, variable) in &desc.variables {
            variables.insert(name.clone(), *variable);
        }
        Self {
            stage: desc.stage,
            variables,
        }
    }
}

impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn variables(&self) -> &ShaderVariableTable {
        &self.variables
    }
}

pub struct MockPipeline {
    variables: ShaderVariableTable,
    is_compute: bool,
}

impl GraphicsPipeline for MockPipeline {
    fn variables(&self) -> &ShaderVariableTable {
        &self.variables
    }

    fn is_compute(&self) -> bool {
        self.is_compute
    }
}

pub struct MockFrameBuffer {
    width: u32,
    height: u32,
    color_count: usize,
    has_depth: bool,
}

impl FrameBuffer for MockFrameBuffer {
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

// ============================================================================
// Mock CommandBuffer
// ============================================================================

pub struct MockCommandBuffer {
    kind: CommandBufferKind,
    state: RecordState,
    /// Recorded command names (shared so tests can inspect after boxing)
    pub commands: Arc<Mutex<Vec<String>>>,
}

impl MockCommandBuffer {
    pub fn new(kind: CommandBufferKind) -> Self {
        Self {
            kind,
            state: RecordState::Initial,
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&mut self, command: impl Into<String>) -> Result<()> {
        self.state.require_recording()?;
        self.commands.lock().unwrap().push(command.into());
        Ok(())
    }
}

impl CommandBuffer for MockCommandBuffer {
    fn kind(&self) -> CommandBufferKind {
        self.kind
    }

    fn state(&self) -> RecordState {
        self.state
    }

    fn begin(&mut self) -> Result<()> {
        self.state.begin()?;
        self.commands.lock().unwrap().clear();
        Ok(())
    }

    fn begin_with_target(&mut self, _framebuffer: &Arc<dyn FrameBuffer>) -> Result<()> {
        if self.kind != CommandBufferKind::Secondary {
            return Err(Error::InvalidOperation(
                "begin_with_target: only secondary buffers take an inherited target".to_string(),
            ));
        }
        self.begin()
    }

    fn end(&mut self) -> Result<()> {
        self.state.end()
    }

    fn reset(&mut self) -> Result<()> {
        self.state.reset()?;
        self.commands.lock().unwrap().clear();
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        _framebuffer: &Arc<dyn FrameBuffer>,
        _clear_values: &[ClearValue],
    ) -> Result<()> {
        self.record("begin_render_pass")
    }

    fn begin_render_pass_with_secondaries(
        &mut self,
        _framebuffer: &Arc<dyn FrameBuffer>,
        _clear_values: &[ClearValue],
    ) -> Result<()> {
        self.record("begin_render_pass_secondary")
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.record("end_render_pass")
    }

    fn set_graphics_pipeline(&mut self, _pipeline: &Arc<dyn GraphicsPipeline>) -> Result<()> {
        self.record("set_graphics_pipeline")
    }

    fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
        self.record("set_viewport")
    }

    fn set_scissor(&mut self, _scissor: Rect2D) -> Result<()> {
        self.record("set_scissor")
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.record("bind_vertex_buffer")
    }

    fn bind_index_buffer(
        &mut self,
        _buffer: &Arc<dyn Buffer>,
        _offset: u64,
        _index_type: IndexType,
    ) -> Result<()> {
        self.record("bind_index_buffer")
    }

    fn bind_image(&mut self, variable: ShaderVariable, _image: &Arc<dyn Image>) -> Result<()> {
        self.record(format!("bind_image:{}", variable.slot()))
    }

    fn bind_sampler(&mut self, variable: ShaderVariable, _sampler: &Arc<dyn Sampler>) -> Result<()> {
        self.record(format!("bind_sampler:{}", variable.slot()))
    }

    fn bind_uniform_buffer(
        &mut self,
        variable: ShaderVariable,
        _buffer: &Arc<dyn Buffer>,
    ) -> Result<()> {
        self.record(format!("bind_uniform_buffer:{}", variable.slot()))
    }

    fn push_constants(
        &mut self,
        _stages: ShaderStageFlags,
        _offset: u32,
        _data: &[u8],
    ) -> Result<()> {
        self.record("push_constants")
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        _instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) -> Result<()> {
        self.record(format!("draw:{}", vertex_count))
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        _instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) -> Result<()> {
        self.record(format!("draw_indexed:{}", index_count))
    }

    fn draw_indirect(
        &mut self,
        _buffer: &Arc<dyn Buffer>,
        _offset: u64,
        _draw_count: u32,
        _stride: u32,
    ) -> Result<()> {
        self.record("draw_indirect")
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.record(format!("dispatch:{}x{}x{}", x, y, z))
    }

    fn dispatch_indirect(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.record("dispatch_indirect")
    }

    fn copy_buffer(
        &mut self,
        _src: &Arc<dyn Buffer>,
        _dst: &Arc<dyn Buffer>,
        _regions: &[BufferCopy],
    ) -> Result<()> {
        self.record("copy_buffer")
    }

    fn copy_image(
        &mut self,
        _src: &Arc<dyn Image>,
        _dst: &Arc<dyn Image>,
        _regions: &[ImageCopy],
    ) -> Result<()> {
        self.record("copy_image")
    }

    fn copy_buffer_to_image(
        &mut self,
        _src: &Arc<dyn Buffer>,
        _dst: &Arc<dyn Image>,
        _regions: &[BufferImageCopy],
    ) -> Result<()> {
        self.record("copy_buffer_to_image")
    }

    fn clear_color_image(&mut self, _image: &Arc<dyn Image>, _color: [f32; 4]) -> Result<()> {
        self.record("clear_color_image")
    }

    fn clear_depth_stencil_image(
        &mut self,
        _image: &Arc<dyn Image>,
        _depth: f32,
        _stencil: u32,
    ) -> Result<()> {
        self.record("clear_depth_stencil_image")
    }

    fn begin_debug_marker(&mut self, name: &str, _color: [f32; 4]) -> Result<()> {
        self.record(format!("begin_debug_marker:{}", name))
    }

    fn end_debug_marker(&mut self) -> Result<()> {
        self.record("end_debug_marker")
    }

    fn wait_command(&mut self, _other: &dyn CommandBuffer) -> Result<()> {
        self.commands.lock().unwrap().push("wait_command".to_string());
        Ok(())
    }

    fn execute_commands(&mut self, secondaries: &[&dyn CommandBuffer]) -> Result<()> {
        self.state.require_recording()?;
        if self.kind != CommandBufferKind::Primary {
            return Err(Error::InvalidOperation(
                "execute_commands: only primary buffers execute secondaries".to_string(),
            ));
        }
        // Inline the secondaries' logs in execution order
        let mut commands = self.commands.lock().unwrap();
        for secondary in secondaries {
            let mock = *secondary as *const dyn CommandBuffer as *const MockCommandBuffer;
            let mock = unsafe { &*mock };
            commands.extend(mock.commands.lock().unwrap().iter().cloned());
        }
        Ok(())
    }
}

// ============================================================================
// Mock Device
// ============================================================================

/// Mock Device that tracks created resources and submissions without a GPU
pub struct MockDevice {
    /// Count of `create_sampler` invocations (cache-miss creations included)
    pub sampler_creations: AtomicUsize,
    /// Count of `create_input_layout` invocations
    pub input_layout_creations: AtomicUsize,
    /// Count of `create_graphics_pipeline` invocations
    pub pipeline_creations: AtomicUsize,
    /// Count of `create_framebuffer` invocations
    pub framebuffer_creations: AtomicUsize,
    /// Count of `create_buffer` invocations
    pub buffer_creations: AtomicUsize,

    sampler_cache: GuardedCache<dyn Sampler>,
    input_layout_cache: GuardedCache<dyn InputLayout>,
    pipeline_cache: GuardedCache<dyn GraphicsPipeline>,
    framebuffer_cache: GuardedCache<dyn FrameBuffer>,

    /// Flattened command log of every submitted buffer, in submission order
    pub submitted: Mutex<Vec<String>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            sampler_creations: AtomicUsize::new(0),
            input_layout_creations: AtomicUsize::new(0),
            pipeline_creations: AtomicUsize::new(0),
            framebuffer_creations: AtomicUsize::new(0),
            buffer_creations: AtomicUsize::new(0),
            sampler_cache: GuardedCache::new(),
            input_layout_cache: GuardedCache::new(),
            pipeline_cache: GuardedCache::new(),
            framebuffer_cache: GuardedCache::new(),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Copy of the flattened submission log
    pub fn submitted_commands(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

impl Device for MockDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        self.buffer_creations.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockBuffer::new(desc)))
    }

    fn create_image(
        &self,
        desc: &ImageDesc,
        _initial_data: Option<&[u8]>,
    ) -> Result<Arc<dyn Image>> {
        desc.validate()?;
        Ok(Arc::new(MockImage::new(desc.clone())))
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<Arc<dyn Shader>> {
        Ok(Arc::new(MockShader::new(desc)))
    }

    fn create_sampler(&self, _desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        self.sampler_creations.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockSampler))
    }

    fn create_input_layout(&self, desc: &InputLayoutDesc) -> Result<Arc<dyn InputLayout>> {
        self.input_layout_creations.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockInputLayout { desc: desc.clone() }))
    }

    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<Arc<dyn GraphicsPipeline>> {
        desc.validate()?;
        self.pipeline_creations.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockPipeline {
            variables: desc.merged_variables(),
            is_compute: desc.is_compute(),
        }))
    }

    fn create_framebuffer(&self, desc: &FrameBufferDesc) -> Result<Arc<dyn FrameBuffer>> {
        desc.validate()?;
        self.framebuffer_creations.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockFrameBuffer {
            width: desc.width,
            height: desc.height,
            color_count: desc.color_attachments.len(),
            has_depth: desc.depth_stencil_attachment.is_some(),
        }))
    }

    fn create_command_buffer(&self, kind: CommandBufferKind) -> Result<Box<dyn CommandBuffer>> {
        Ok(Box::new(MockCommandBuffer::new(kind)))
    }

    fn get_or_create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        self.sampler_cache
            .get_or_create(desc.content_hash(), || self.create_sampler(desc))
    }

    fn get_or_create_input_layout(&self, desc: &InputLayoutDesc) -> Result<Arc<dyn InputLayout>> {
        self.input_layout_cache
            .get_or_create(desc.content_hash(), || self.create_input_layout(desc))
    }

    fn get_or_create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<Arc<dyn GraphicsPipeline>> {
        self.pipeline_cache
            .get_or_create(desc.content_hash(), || self.create_graphics_pipeline(desc))
    }

    fn get_or_create_framebuffer(&self, desc: &FrameBufferDesc) -> Result<Arc<dyn FrameBuffer>> {
        self.framebuffer_cache
            .get_or_create(desc.content_hash(), || self.create_framebuffer(desc))
    }

    fn submit(&self, _queue: QueueKind, buffers: &[&dyn CommandBuffer]) -> Result<()> {
        let mut submitted = self.submitted.lock().unwrap();
        for buffer in buffers {
            if buffer.state() != RecordState::Closed {
                return Err(Error::InvalidOperation(
                    "submit: command buffer was not closed with end()".to_string(),
                ));
            }
            let mock = *buffer as *const dyn CommandBuffer as *const MockCommandBuffer;
            let mock = unsafe { &*mock };
            submitted.extend(mock.commands.lock().unwrap().iter().cloned());
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
