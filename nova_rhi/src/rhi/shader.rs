/// Shader trait, shader descriptor and the packed shader-variable encoding

use bitflags::bitflags;
use rustc_hash::FxHashMap;

/// Shader pipeline stage (at most one shader per stage in a pipeline)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// Stable index used by the packed variable encoding and pipeline slots
    pub fn index(&self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Hull => 1,
            ShaderStage::Domain => 2,
            ShaderStage::Geometry => 3,
            ShaderStage::Fragment => 4,
            ShaderStage::Compute => 5,
        }
    }

    fn from_index(index: u32) -> Self {
        match index {
            0 => ShaderStage::Vertex,
            1 => ShaderStage::Hull,
            2 => ShaderStage::Domain,
            3 => ShaderStage::Geometry,
            4 => ShaderStage::Fragment,
            _ => ShaderStage::Compute,
        }
    }
}

bitflags! {
    /// Set of shader stages (push-constant visibility, merged bindings)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const HULL = 1 << 1;
        const DOMAIN = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Hull => ShaderStageFlags::HULL,
            ShaderStage::Domain => ShaderStageFlags::DOMAIN,
            ShaderStage::Geometry => ShaderStageFlags::GEOMETRY,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => ShaderStageFlags::COMPUTE,
        }
    }
}

/// Kind of resource a shader variable binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderVariableKind {
    UniformBuffer,
    StorageBuffer,
    SampledImage,
    Sampler,
    CombinedImageSampler,
}

impl ShaderVariableKind {
    fn index(&self) -> u32 {
        match self {
            ShaderVariableKind::UniformBuffer => 0,
            ShaderVariableKind::StorageBuffer => 1,
            ShaderVariableKind::SampledImage => 2,
            ShaderVariableKind::Sampler => 3,
            ShaderVariableKind::CombinedImageSampler => 4,
        }
    }

    fn from_index(index: u32) -> Self {
        match index {
            0 => ShaderVariableKind::UniformBuffer,
            1 => ShaderVariableKind::StorageBuffer,
            2 => ShaderVariableKind::SampledImage,
            3 => ShaderVariableKind::Sampler,
            _ => ShaderVariableKind::CombinedImageSampler,
        }
    }
}

/// Compact shader-variable identifier
///
/// Packs (permutation index, binding slot, shader stage, resource kind)
/// into one `u32` so the per-draw binding path locates a runtime slot
/// without scanning a table:
///
/// ```text
/// bits  0..4   resource kind
/// bits  4..8   shader stage
/// bits  8..16  binding slot
/// bits 16..32  permutation index (descriptor set / variant)
/// ```
///
/// Lifetime equals the owning pipeline's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderVariable(u32);

impl ShaderVariable {
    const KIND_BITS: u32 = 4;
    const STAGE_BITS: u32 = 4;
    const SLOT_BITS: u32 = 8;

    /// Pack a variable identifier
    pub fn new(permutation: u16, slot: u8, stage: ShaderStage, kind: ShaderVariableKind) -> Self {
        let mut bits = kind.index();
        bits |= (stage.index() as u32) << Self::KIND_BITS;
        bits |= (slot as u32) << (Self::KIND_BITS + Self::STAGE_BITS);
        bits |= (permutation as u32) << (Self::KIND_BITS + Self::STAGE_BITS + Self::SLOT_BITS);
        Self(bits)
    }

    /// Resource kind
    pub fn kind(&self) -> ShaderVariableKind {
        ShaderVariableKind::from_index(self.0 & ((1 << Self::KIND_BITS) - 1))
    }

    /// Shader stage
    pub fn stage(&self) -> ShaderStage {
        ShaderStage::from_index((self.0 >> Self::KIND_BITS) & ((1 << Self::STAGE_BITS) - 1))
    }

    /// Binding slot
    pub fn slot(&self) -> u8 {
        ((self.0 >> (Self::KIND_BITS + Self::STAGE_BITS)) & ((1 << Self::SLOT_BITS) - 1)) as u8
    }

    /// Permutation index (descriptor set / shader variant)
    pub fn permutation(&self) -> u16 {
        (self.0 >> (Self::KIND_BITS + Self::STAGE_BITS + Self::SLOT_BITS)) as u16
    }

    /// Raw packed value
    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// Name → variable lookup table for one shader or one pipeline
///
/// Find-or-null: looking up a name the shader does not declare returns
/// `None`, which binding code treats as a deliberate no-op (materials may
/// legitimately not use every declared slot permutation).
#[derive(Debug, Clone, Default)]
pub struct ShaderVariableTable {
    variables: FxHashMap<String, ShaderVariable>,
}

impl ShaderVariableTable {
    pub fn new() -> Self {
        Self {
            variables: FxHashMap::default(),
        }
    }

    /// Register a named variable
    pub fn insert(&mut self, name: impl Into<String>, variable: ShaderVariable) {
        self.variables.insert(name.into(), variable);
    }

    /// Look up a variable by name
    pub fn find(&self, name: &str) -> Option<ShaderVariable> {
        self.variables.get(name).copied()
    }

    /// Merge another table into this one (pipeline table from per-stage tables)
    pub fn merge(&mut self, other: &ShaderVariableTable) {
        for (name, variable) in &other.variables {
            self.variables.insert(name.clone(), *variable);
        }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate over (name, variable) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, ShaderVariable)> {
        self.variables.iter().map(|(name, var)| (name.as_str(), *var))
    }
}

/// Descriptor for creating a shader
///
/// The asset layer supplies the compiled SPIR-V plus reflected variable
/// metadata. Backends may additionally run their own reflection when the
/// supplied table is empty.
#[derive(Debug, Clone)]
pub struct ShaderDesc {
    /// Pipeline stage the shader runs at
    pub stage: ShaderStage,
    /// Entry point name
    pub entry_point: String,
    /// Compiled SPIR-V words
    pub spirv: Vec<u32>,
    /// Reflected variables (may be empty; backend reflection fills the gap)
    pub variables: Vec<(String, ShaderVariable)>,
}

impl ShaderDesc {
    pub fn new(stage: ShaderStage, spirv: Vec<u32>) -> Self {
        Self {
            stage,
            entry_point: "main".to_string(),
            spirv,
            variables: Vec::new(),
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, variable: ShaderVariable) -> Self {
        self.variables.push((name.into(), variable));
        self
    }
}

/// Shader resource trait
///
/// Implemented by backend-specific shader types. The native module is
/// destroyed when the last handle is dropped.
pub trait Shader: Send + Sync {
    /// Stage the shader runs at
    fn stage(&self) -> ShaderStage;

    /// Reflected variable table
    fn variables(&self) -> &ShaderVariableTable;
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
