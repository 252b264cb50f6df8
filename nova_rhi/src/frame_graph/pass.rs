/// Render pass trait and pass field (port) declarations

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::rhi::{Buffer, CommandBuffer, Device, Image, Rect2D, Viewport};

/// Visibility of a pass field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldVisibility {
    /// Consumed from another pass's output
    Input,
    /// Produced for other passes (published after execution)
    Output,
    /// Pass-private resource (never connected)
    Internal,
}

/// Resource type a pass field carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Image1D,
    Image2D,
    Image3D,
    ImageCube,
    Buffer,
}

/// Declared input/output/internal port of a render pass
#[derive(Debug, Clone)]
pub struct PassField {
    /// Field name, unique within the pass
    pub name: String,
    pub visibility: FieldVisibility,
    pub kind: FieldKind,
}

impl PassField {
    pub fn new(name: impl Into<String>, visibility: FieldVisibility, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            visibility,
            kind,
        }
    }
}

/// A resource flowing between passes
#[derive(Clone)]
pub enum PassResource {
    Image(Arc<dyn Image>),
    Buffer(Arc<dyn Buffer>),
}

impl PassResource {
    /// True when the resource matches a field kind
    pub fn matches(&self, kind: FieldKind) -> bool {
        match self {
            PassResource::Image(_) => kind != FieldKind::Buffer,
            PassResource::Buffer(_) => kind == FieldKind::Buffer,
        }
    }
}

/// Per-frame render settings applied before each pass executes
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub viewport: Viewport,
    pub scissor: Rect2D,
}

impl RenderSettings {
    /// Settings covering a full `width` x `height` target
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport::new(width as f32, height as f32),
            scissor: Rect2D::new(width, height),
        }
    }
}

/// Execution context handed to a pass
///
/// Gives the pass its resolved inputs, the outputs of passes it was bound
/// to via `FrameGraph::bind_pass`, and the command buffer to record into.
pub struct PassContext<'a> {
    /// Device for cached object lookups (`get_or_create_*`)
    pub device: &'a dyn Device,
    /// Command buffer the pass records into
    pub cmd: &'a mut dyn CommandBuffer,
    /// Current render settings (viewport/scissor sizing)
    pub settings: RenderSettings,
    /// Inputs resolved from graph edges, keyed by this pass's field name
    pub inputs: FxHashMap<String, PassResource>,
    /// Outputs of directly bound passes, keyed by the producer's field name
    pub bound: FxHashMap<String, PassResource>,
    /// Outputs this pass publishes, keyed by its output field names
    pub outputs: FxHashMap<String, PassResource>,
}

impl PassContext<'_> {
    /// Look up a resolved input by field name
    pub fn input(&self, name: &str) -> Option<&PassResource> {
        self.inputs.get(name)
    }

    /// Look up a bound producer's output by field name
    pub fn bound_output(&self, name: &str) -> Option<&PassResource> {
        self.bound.get(name)
    }

    /// Publish an output resource under one of this pass's output fields
    pub fn publish(&mut self, name: impl Into<String>, resource: PassResource) {
        self.outputs.insert(name.into(), resource);
    }
}

/// A node in the frame graph
///
/// Declares its fields up front; `execute` records the pass's commands into
/// the active command buffer and publishes its outputs.
pub trait RenderPass: Send {
    /// Pass name (diagnostics and debug markers)
    fn name(&self) -> &str;

    /// Declared input/output/internal fields
    fn fields(&self) -> &[PassField];

    /// Record the pass's commands
    fn execute(&mut self, ctx: &mut PassContext<'_>) -> Result<()>;
}
