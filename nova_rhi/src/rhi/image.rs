/// Image trait and image descriptor

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::hash::{ContentHash, DescHasher, HashCell};
use crate::rhi::pipeline::SampleCount;

/// Image dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    /// 1D image (height == 1, depth == 1)
    Tex1D,
    /// 2D image (depth == 1)
    Tex2D,
    /// 3D volume image (array_layers == 1)
    Tex3D,
    /// Cube map (6 layers, square faces)
    Cube,
    /// Array of 1D images
    Tex1DArray,
    /// Array of 2D images
    Tex2DArray,
    /// Array of cube maps (layers a multiple of 6)
    CubeArray,
}

/// Pixel formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    // Color formats
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_FLOAT,
    R32_FLOAT,
    R32G32B32A32_FLOAT,

    // Depth/stencil formats
    D16_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
    D32_FLOAT_S8_UINT,
}

impl Format {
    /// Bytes per pixel (depth/stencil formats report their packed size)
    pub fn size_bytes(&self) -> u32 {
        match self {
            Format::R8_UNORM => 1,
            Format::R8G8_UNORM | Format::D16_UNORM => 2,
            Format::R8G8B8A8_UNORM
            | Format::R8G8B8A8_SRGB
            | Format::B8G8R8A8_UNORM
            | Format::B8G8R8A8_SRGB
            | Format::R32_FLOAT
            | Format::D32_FLOAT
            | Format::D24_UNORM_S8_UINT => 4,
            Format::R16G16B16A16_FLOAT | Format::D32_FLOAT_S8_UINT => 8,
            Format::R32G32B32A32_FLOAT => 16,
        }
    }

    /// True for depth and depth/stencil formats
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            Format::D16_UNORM
                | Format::D32_FLOAT
                | Format::D24_UNORM_S8_UINT
                | Format::D32_FLOAT_S8_UINT
        )
    }

    /// True for formats carrying a stencil aspect
    pub fn has_stencil(&self) -> bool {
        matches!(self, Format::D24_UNORM_S8_UINT | Format::D32_FLOAT_S8_UINT)
    }
}

bitflags! {
    /// Image usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        /// Sampled in shaders
        const SAMPLED = 1 << 0;
        /// Color attachment of a frame buffer
        const COLOR_ATTACHMENT = 1 << 1;
        /// Depth/stencil attachment of a frame buffer
        const DEPTH_STENCIL = 1 << 2;
        /// Storage image
        const STORAGE = 1 << 3;
        /// Source of copy commands
        const TRANSFER_SRC = 1 << 4;
        /// Destination of copy commands
        const TRANSFER_DST = 1 << 5;
    }
}

/// Descriptor for creating an image
#[derive(Debug, Clone)]
pub struct ImageDesc {
    pub image_type: ImageType,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_layers: u32,
    pub mip_levels: u32,
    pub samples: SampleCount,
    pub usage: ImageUsage,
    hash: HashCell,
}

impl ImageDesc {
    /// Create a 2D image descriptor
    pub fn new_2d(format: Format, width: u32, height: u32) -> Self {
        Self {
            image_type: ImageType::Tex2D,
            format,
            width,
            height,
            depth: 1,
            array_layers: 1,
            mip_levels: 1,
            samples: SampleCount::S1,
            usage: ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST,
            hash: HashCell::new(),
        }
    }

    pub fn with_type(mut self, image_type: ImageType) -> Self {
        self.image_type = image_type;
        self.hash.invalidate();
        self
    }

    pub fn with_extent(mut self, width: u32, height: u32, depth: u32) -> Self {
        self.width = width;
        self.height = height;
        self.depth = depth;
        self.hash.invalidate();
        self
    }

    pub fn with_array_layers(mut self, array_layers: u32) -> Self {
        self.array_layers = array_layers;
        self.hash.invalidate();
        self
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self.hash.invalidate();
        self
    }

    pub fn with_samples(mut self, samples: SampleCount) -> Self {
        self.samples = samples;
        self.hash.invalidate();
        self
    }

    pub fn with_usage(mut self, usage: ImageUsage) -> Self {
        self.usage = usage;
        self.hash.invalidate();
        self
    }

    /// Validate extent/layer combinations against the image type
    ///
    /// A mismatched combination (e.g. a 3D extent requested as Cube) is an
    /// `InvalidResource` error.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(Error::InvalidResource(format!(
                "image extent {}x{}x{} contains a zero dimension",
                self.width, self.height, self.depth
            )));
        }
        if self.array_layers == 0 || self.mip_levels == 0 {
            return Err(Error::InvalidResource(
                "image must have at least one layer and one mip level".to_string(),
            ));
        }
        match self.image_type {
            ImageType::Tex1D | ImageType::Tex1DArray => {
                if self.height != 1 || self.depth != 1 {
                    return Err(Error::InvalidResource(format!(
                        "1D image requires height == 1 and depth == 1, got {}x{}",
                        self.height, self.depth
                    )));
                }
                if self.image_type == ImageType::Tex1D && self.array_layers != 1 {
                    return Err(Error::InvalidResource(
                        "non-array 1D image requires array_layers == 1".to_string(),
                    ));
                }
            }
            ImageType::Tex2D | ImageType::Tex2DArray => {
                if self.depth != 1 {
                    return Err(Error::InvalidResource(format!(
                        "2D image requires depth == 1, got {}",
                        self.depth
                    )));
                }
                if self.image_type == ImageType::Tex2D && self.array_layers != 1 {
                    return Err(Error::InvalidResource(
                        "non-array 2D image requires array_layers == 1".to_string(),
                    ));
                }
            }
            ImageType::Tex3D => {
                if self.array_layers != 1 {
                    return Err(Error::InvalidResource(
                        "3D image cannot have array layers".to_string(),
                    ));
                }
            }
            ImageType::Cube | ImageType::CubeArray => {
                if self.depth != 1 {
                    return Err(Error::InvalidResource(
                        "cube image requires depth == 1".to_string(),
                    ));
                }
                if self.width != self.height {
                    return Err(Error::InvalidResource(format!(
                        "cube image requires square faces, got {}x{}",
                        self.width, self.height
                    )));
                }
                if self.image_type == ImageType::Cube && self.array_layers != 6 {
                    return Err(Error::InvalidResource(format!(
                        "cube image requires exactly 6 layers, got {}",
                        self.array_layers
                    )));
                }
                if self.image_type == ImageType::CubeArray && self.array_layers % 6 != 0 {
                    return Err(Error::InvalidResource(format!(
                        "cube array layers must be a multiple of 6, got {}",
                        self.array_layers
                    )));
                }
            }
        }
        Ok(())
    }
}

impl ContentHash for ImageDesc {
    fn content_hash(&self) -> u64 {
        self.hash.get_or_compute(|| {
            let mut h = DescHasher::new();
            h.field(&self.image_type)
                .field(&self.format)
                .field(&self.width)
                .field(&self.height)
                .field(&self.depth)
                .field(&self.array_layers)
                .field(&self.mip_levels)
                .field(&self.samples)
                .field(&self.usage.bits());
            h.finish()
        })
    }
}

/// Image resource trait
///
/// Implemented by backend-specific image types. The native image is
/// destroyed when the last handle is dropped.
pub trait Image: Send + Sync {
    /// The descriptor the image was created from
    fn desc(&self) -> &ImageDesc;
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
