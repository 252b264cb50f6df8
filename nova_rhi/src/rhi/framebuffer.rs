/// Frame buffer trait and frame buffer descriptor

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::hash::{ContentHash, DescHasher, HashCell};
use crate::rhi::image::Image;

/// What happens to an attachment's contents when a render pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    /// Preserve the existing contents
    Load,
    /// Clear to the clear value passed at `begin_render_pass`
    Clear,
    /// Contents undefined
    DontCare,
}

/// What happens to an attachment's contents when a render pass ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Write results back to the image
    Store,
    /// Contents may be discarded
    DontCare,
}

/// One attachment of a frame buffer
#[derive(Clone)]
pub struct AttachmentDesc {
    /// The attached image (a color or depth/stencil render target)
    pub image: Arc<dyn Image>,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

impl AttachmentDesc {
    pub fn new(image: Arc<dyn Image>) -> Self {
        Self {
            image,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
        }
    }

    pub fn with_ops(mut self, load_op: LoadOp, store_op: StoreOp) -> Self {
        self.load_op = load_op;
        self.store_op = store_op;
        self
    }
}

/// Descriptor for creating a frame buffer
///
/// The content hash combines attachment image identities with the
/// load/store ops and dimensions, so frame buffers over the same images are
/// de-duplicated through the device cache.
#[derive(Clone)]
pub struct FrameBufferDesc {
    /// Color attachments, in shader output order
    pub color_attachments: Vec<AttachmentDesc>,
    /// Optional depth/stencil attachment
    pub depth_stencil_attachment: Option<AttachmentDesc>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    hash: HashCell,
}

impl FrameBufferDesc {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            color_attachments: Vec::new(),
            depth_stencil_attachment: None,
            width,
            height,
            hash: HashCell::new(),
        }
    }

    pub fn with_color_attachment(mut self, attachment: AttachmentDesc) -> Self {
        self.color_attachments.push(attachment);
        self.hash.invalidate();
        self
    }

    pub fn with_depth_stencil_attachment(mut self, attachment: AttachmentDesc) -> Self {
        self.depth_stencil_attachment = Some(attachment);
        self.hash.invalidate();
        self
    }

    /// Check the attachment set is constructible
    pub fn validate(&self) -> Result<()> {
        if self.color_attachments.is_empty() && self.depth_stencil_attachment.is_none() {
            return Err(Error::InvalidResource(
                "frame buffer requires at least one attachment".to_string(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidResource(format!(
                "frame buffer extent {}x{} contains a zero dimension",
                self.width, self.height
            )));
        }
        for attachment in &self.color_attachments {
            if attachment.image.desc().format.is_depth() {
                return Err(Error::InvalidResource(
                    "depth format image attached as color attachment".to_string(),
                ));
            }
        }
        if let Some(depth) = &self.depth_stencil_attachment {
            if !depth.image.desc().format.is_depth() {
                return Err(Error::InvalidResource(
                    "color format image attached as depth/stencil attachment".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl ContentHash for FrameBufferDesc {
    fn content_hash(&self) -> u64 {
        self.hash.get_or_compute(|| {
            let mut h = DescHasher::new();
            h.field(&self.width).field(&self.height);
            for attachment in &self.color_attachments {
                h.identity(Arc::as_ptr(&attachment.image))
                    .field(&attachment.load_op)
                    .field(&attachment.store_op);
            }
            match &self.depth_stencil_attachment {
                Some(attachment) => {
                    h.identity(Arc::as_ptr(&attachment.image))
                        .field(&attachment.load_op)
                        .field(&attachment.store_op);
                }
                None => {
                    h.field(&0u8);
                }
            }
            h.finish()
        })
    }
}

/// Frame buffer resource trait — groups render target attachments
///
/// Created once and reused each frame; recreated only when attachments
/// change (e.g. window resize). De-duplicated through the device cache.
pub trait FrameBuffer: Send + Sync {
    /// Get the width in pixels
    fn width(&self) -> u32;

    /// Get the height in pixels
    fn height(&self) -> u32;

    /// Number of color attachments
    fn color_attachment_count(&self) -> usize;

    /// True when a depth/stencil attachment is present
    fn has_depth_stencil(&self) -> bool;
}
