/// Command buffer trait and recording state machine

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::rhi::buffer::Buffer;
use crate::rhi::framebuffer::FrameBuffer;
use crate::rhi::image::Image;
use crate::rhi::pipeline::{GraphicsPipeline, IndexType};
use crate::rhi::shader::{ShaderStageFlags, ShaderVariable};

/// Primary buffers are submitted to a queue; secondary buffers are recorded
/// off the render thread and executed by a primary buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferKind {
    Primary,
    Secondary,
}

/// Recording state machine: `Initial → Recording → Closed → (reset) → Initial`
///
/// Backends embed this type and route every recording call through
/// `require_recording()`, so illegal transitions surface as
/// `InvalidOperation` errors instead of corrupting native state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Freshly created or reset; not yet recording
    Initial,
    /// Between `begin()` and `end()`; recording calls are legal
    Recording,
    /// Finalized by `end()`; submittable, not recordable
    Closed,
}

impl RecordState {
    /// Transition `Initial → Recording`; calling `begin` twice without an
    /// intervening `end`/`reset` is illegal
    pub fn begin(&mut self) -> Result<()> {
        match self {
            RecordState::Initial => {
                *self = RecordState::Recording;
                Ok(())
            }
            RecordState::Recording => Err(Error::InvalidOperation(
                "begin() called while already recording".to_string(),
            )),
            RecordState::Closed => Err(Error::InvalidOperation(
                "begin() called on a closed command buffer (reset() first)".to_string(),
            )),
        }
    }

    /// Transition `Recording → Closed`
    pub fn end(&mut self) -> Result<()> {
        match self {
            RecordState::Recording => {
                *self = RecordState::Closed;
                Ok(())
            }
            _ => Err(Error::InvalidOperation(
                "end() called on a command buffer that is not recording".to_string(),
            )),
        }
    }

    /// Transition any state back to `Initial`
    pub fn reset(&mut self) -> Result<()> {
        if *self == RecordState::Recording {
            return Err(Error::InvalidOperation(
                "reset() called while recording (end() first)".to_string(),
            ));
        }
        *self = RecordState::Initial;
        Ok(())
    }

    /// Guard for recording operations
    pub fn require_recording(&self) -> Result<()> {
        match self {
            RecordState::Recording => Ok(()),
            _ => Err(Error::InvalidOperation(
                "recording operation on a command buffer that is not recording".to_string(),
            )),
        }
    }
}

/// Viewport rectangle with depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-size viewport with default depth range
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Integer scissor rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Clear value for a frame buffer attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// RGBA clear color
    Color([f32; 4]),
    /// Depth and stencil clear values
    DepthStencil { depth: f32, stencil: u32 },
}

/// Buffer-to-buffer copy region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

/// Image-to-image copy region (one mip/layer slice)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCopy {
    pub src_mip_level: u32,
    pub src_array_layer: u32,
    pub dst_mip_level: u32,
    pub dst_array_layer: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Buffer-to-image copy region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferImageCopy {
    pub buffer_offset: u64,
    pub mip_level: u32,
    pub array_layer: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Command buffer trait
///
/// Records a sequence of state-setting and draw/dispatch/copy operations
/// without executing them. Recording calls are legal only in the
/// `Recording` state; violations are `InvalidOperation` errors.
pub trait CommandBuffer: Send {
    /// Primary or secondary
    fn kind(&self) -> CommandBufferKind;

    /// Current recording state
    fn state(&self) -> RecordState;

    /// Start recording (`Initial → Recording`)
    fn begin(&mut self) -> Result<()>;

    /// Start recording a secondary buffer that will draw into `framebuffer`
    /// when executed by a primary buffer
    ///
    /// Primary buffers reject this call.
    fn begin_with_target(&mut self, framebuffer: &Arc<dyn FrameBuffer>) -> Result<()>;

    /// Finalize for submission (`Recording → Closed`)
    fn end(&mut self) -> Result<()>;

    /// Recycle the buffer for re-recording (`Closed → Initial`)
    fn reset(&mut self) -> Result<()>;

    /// Begin a render pass targeting `framebuffer` (primary only)
    fn begin_render_pass(
        &mut self,
        framebuffer: &Arc<dyn FrameBuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// Begin a render pass whose draw commands come from secondary buffers
    /// executed via `execute_commands` (primary only)
    fn begin_render_pass_with_secondaries(
        &mut self,
        framebuffer: &Arc<dyn FrameBuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Bind a graphics or compute pipeline
    fn set_graphics_pipeline(&mut self, pipeline: &Arc<dyn GraphicsPipeline>) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    fn bind_index_buffer(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()>;

    /// Bind an image to a shader variable slot
    fn bind_image(&mut self, variable: ShaderVariable, image: &Arc<dyn Image>) -> Result<()>;

    /// Bind a sampler to a shader variable slot
    fn bind_sampler(&mut self, variable: ShaderVariable, sampler: &Arc<dyn crate::rhi::sampler::Sampler>) -> Result<()>;

    /// Bind a uniform buffer to a shader variable slot
    fn bind_uniform_buffer(
        &mut self,
        variable: ShaderVariable,
        buffer: &Arc<dyn Buffer>,
    ) -> Result<()>;

    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()>;

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()>;

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()>;

    fn draw_indirect(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()>;

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()>;

    fn dispatch_indirect(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    fn copy_buffer(
        &mut self,
        src: &Arc<dyn Buffer>,
        dst: &Arc<dyn Buffer>,
        regions: &[BufferCopy],
    ) -> Result<()>;

    fn copy_image(
        &mut self,
        src: &Arc<dyn Image>,
        dst: &Arc<dyn Image>,
        regions: &[ImageCopy],
    ) -> Result<()>;

    fn copy_buffer_to_image(
        &mut self,
        src: &Arc<dyn Buffer>,
        dst: &Arc<dyn Image>,
        regions: &[BufferImageCopy],
    ) -> Result<()>;

    /// Clear a color image outside a render pass
    fn clear_color_image(&mut self, image: &Arc<dyn Image>, color: [f32; 4]) -> Result<()>;

    /// Clear a depth/stencil image outside a render pass
    fn clear_depth_stencil_image(
        &mut self,
        image: &Arc<dyn Image>,
        depth: f32,
        stencil: u32,
    ) -> Result<()>;

    /// Open a named debug region (no-op when the backend has no debug layer)
    fn begin_debug_marker(&mut self, name: &str, color: [f32; 4]) -> Result<()>;

    /// Close the innermost debug region
    fn end_debug_marker(&mut self) -> Result<()>;

    /// Make this buffer's execution wait for `other`'s completion
    ///
    /// Used to serialize secondary buffers recorded on worker threads before
    /// their dependent primary buffer executes. The dependency is honored at
    /// submit time.
    fn wait_command(&mut self, other: &dyn CommandBuffer) -> Result<()>;

    /// Execute recorded secondary buffers from this primary buffer
    fn execute_commands(&mut self, secondaries: &[&dyn CommandBuffer]) -> Result<()>;
}

#[cfg(test)]
#[path = "command_buffer_tests.rs"]
mod tests;
