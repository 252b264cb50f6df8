/// Sampler trait and sampler descriptor

use crate::hash::{ContentHash, DescHasher, HashCell};
use crate::rhi::pipeline::CompareOp;

/// Texel filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Texture coordinate addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Border color used by `AddressMode::ClampToBorder`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderColor {
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

/// Descriptor for creating a sampler
///
/// When `max_anisotropy > 0`, anisotropic filtering takes priority over the
/// min/mag/mip filter selection.
#[derive(Debug, Clone)]
pub struct SamplerDesc {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub mip_filter: Filter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub border_color: BorderColor,
    /// Comparison sampler (shadow maps) when set
    pub compare_op: Option<CompareOp>,
    /// 0.0 disables anisotropic filtering
    pub max_anisotropy: f32,
    pub mip_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    hash: HashCell,
}

impl SamplerDesc {
    /// Linear filtering, repeat addressing, no anisotropy
    pub fn new() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mip_filter: Filter::Linear,
            address_u: AddressMode::Repeat,
            address_v: AddressMode::Repeat,
            address_w: AddressMode::Repeat,
            border_color: BorderColor::OpaqueBlack,
            compare_op: None,
            max_anisotropy: 0.0,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: f32::MAX,
            hash: HashCell::new(),
        }
    }

    pub fn with_filters(mut self, min: Filter, mag: Filter, mip: Filter) -> Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self.mip_filter = mip;
        self.hash.invalidate();
        self
    }

    pub fn with_address_modes(mut self, u: AddressMode, v: AddressMode, w: AddressMode) -> Self {
        self.address_u = u;
        self.address_v = v;
        self.address_w = w;
        self.hash.invalidate();
        self
    }

    pub fn with_border_color(mut self, border_color: BorderColor) -> Self {
        self.border_color = border_color;
        self.hash.invalidate();
        self
    }

    pub fn with_compare_op(mut self, compare_op: CompareOp) -> Self {
        self.compare_op = Some(compare_op);
        self.hash.invalidate();
        self
    }

    pub fn with_max_anisotropy(mut self, max_anisotropy: f32) -> Self {
        self.max_anisotropy = max_anisotropy;
        self.hash.invalidate();
        self
    }

    pub fn with_lod(mut self, bias: f32, min: f32, max: f32) -> Self {
        self.mip_lod_bias = bias;
        self.min_lod = min;
        self.max_lod = max;
        self.hash.invalidate();
        self
    }
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHash for SamplerDesc {
    fn content_hash(&self) -> u64 {
        self.hash.get_or_compute(|| {
            let mut h = DescHasher::new();
            h.field(&self.min_filter)
                .field(&self.mag_filter)
                .field(&self.mip_filter)
                .field(&self.address_u)
                .field(&self.address_v)
                .field(&self.address_w)
                .field(&self.border_color)
                .field(&self.compare_op)
                .f32_field(self.max_anisotropy)
                .f32_field(self.mip_lod_bias)
                .f32_field(self.min_lod)
                .f32_field(self.max_lod);
            h.finish()
        })
    }
}

/// Sampler resource trait
///
/// Implemented by backend-specific sampler types. Samplers are de-duplicated
/// through the device cache; identical descriptors share one native object.
pub trait Sampler: Send + Sync {}

#[cfg(test)]
#[path = "sampler_tests.rs"]
mod tests;
