/// Input layout trait and vertex layout descriptor

use crate::hash::{ContentHash, DescHasher, HashCell};

/// Vertex attribute data format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum VertexFormat {
    // Float formats
    R32_SFLOAT,          // float (4 bytes)
    R32G32_SFLOAT,       // vec2 (8 bytes)
    R32G32B32_SFLOAT,    // vec3 (12 bytes)
    R32G32B32A32_SFLOAT, // vec4 (16 bytes)

    // Integer formats (signed)
    R32_SINT,
    R32G32_SINT,
    R32G32B32_SINT,
    R32G32B32A32_SINT,

    // Integer formats (unsigned)
    R32_UINT,
    R32G32_UINT,
    R32G32B32_UINT,
    R32G32B32A32_UINT,

    // Byte formats (normalized)
    R8G8B8A8_UNORM,
}

impl VertexFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            VertexFormat::R32_SFLOAT | VertexFormat::R32_SINT | VertexFormat::R32_UINT => 4,
            VertexFormat::R32G32_SFLOAT | VertexFormat::R32G32_SINT | VertexFormat::R32G32_UINT => 8,
            VertexFormat::R32G32B32_SFLOAT
            | VertexFormat::R32G32B32_SINT
            | VertexFormat::R32G32B32_UINT => 12,
            VertexFormat::R32G32B32A32_SFLOAT
            | VertexFormat::R32G32B32A32_SINT
            | VertexFormat::R32G32B32A32_UINT => 16,
            VertexFormat::R8G8B8A8_UNORM => 4,
        }
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    /// Data is per-vertex
    Vertex,
    /// Data is per-instance
    Instance,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Binding index
    pub binding: u32,
    /// Format of the attribute
    pub format: VertexFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex binding description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBinding {
    /// Binding index
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    /// Input rate (per-vertex or per-instance)
    pub input_rate: VertexInputRate,
}

/// Descriptor for creating an input layout
#[derive(Debug, Clone, Default)]
pub struct InputLayoutDesc {
    /// Vertex bindings
    pub bindings: Vec<VertexBinding>,
    /// Vertex attributes
    pub attributes: Vec<VertexAttribute>,
    hash: HashCell,
}

impl InputLayoutDesc {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            attributes: Vec::new(),
            hash: HashCell::new(),
        }
    }

    pub fn with_binding(mut self, binding: u32, stride: u32, input_rate: VertexInputRate) -> Self {
        self.bindings.push(VertexBinding {
            binding,
            stride,
            input_rate,
        });
        self.hash.invalidate();
        self
    }

    pub fn with_attribute(
        mut self,
        location: u32,
        binding: u32,
        format: VertexFormat,
        offset: u32,
    ) -> Self {
        self.attributes.push(VertexAttribute {
            location,
            binding,
            format,
            offset,
        });
        self.hash.invalidate();
        self
    }
}

impl ContentHash for InputLayoutDesc {
    fn content_hash(&self) -> u64 {
        self.hash.get_or_compute(|| {
            let mut h = DescHasher::new();
            h.field(&self.bindings).field(&self.attributes);
            h.finish()
        })
    }
}

/// Input layout resource trait
///
/// Implemented by backend-specific input layout types. Input layouts are
/// de-duplicated through the device cache.
pub trait InputLayout: Send + Sync {
    /// The descriptor the layout was created from
    fn desc(&self) -> &InputLayoutDesc;
}
