/// Shader - Vulkan implementation of the Shader trait
///
/// Wraps a VkShaderModule plus the reflected variable table. When the asset
/// layer supplies reflected metadata in the descriptor it is used directly;
/// otherwise the SPIR-V is reflected with spirq.

use ash::vk;
use std::sync::Arc;

use nova_rhi::nova::rhi::{
    Shader as RhiShader, ShaderDesc, ShaderStage, ShaderVariable, ShaderVariableKind,
    ShaderVariableTable,
};
use nova_rhi::nova::Result;
use nova_rhi::{rhi_bail, rhi_err};

use crate::vulkan_context::GpuContext;

/// Vulkan shader implementation
pub struct Shader {
    ctx: Arc<GpuContext>,
    /// Vulkan shader module
    pub(crate) module: vk::ShaderModule,
    /// Entry point name
    pub(crate) entry_point: String,
    /// Pipeline stage
    stage: ShaderStage,
    /// Reflected variable table (name -> packed variable)
    variables: ShaderVariableTable,
    /// Size of the shader's push constant block, if any
    pub(crate) push_constant_size: Option<u32>,
}

impl Shader {
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &ShaderDesc) -> Result<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(&desc.spirv);
        let module = unsafe {
            ctx.device
                .create_shader_module(&create_info, None)
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to create shader module ({}): {:?}",
                        crate::vulkan_convert::describe_vk_result(e), e)
                })?
        };

        let (variables, push_constant_size) = if desc.variables.is_empty() {
            reflect_spirv(&desc.spirv, desc.stage)?
        } else {
            let mut table = ShaderVariableTable::new();
            for (name, variable) in &desc.variables {
                table.insert(name.clone(), *variable);
            }
            (table, None)
        };

        Ok(Self {
            ctx,
            module,
            entry_point: desc.entry_point.clone(),
            stage: desc.stage,
            variables,
            push_constant_size,
        })
    }
}

impl RhiShader for Shader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn variables(&self) -> &ShaderVariableTable {
        &self.variables
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Parse SPIR-V bytecode and extract the variable table using spirq
fn reflect_spirv(
    code: &[u32],
    stage: ShaderStage,
) -> Result<(ShaderVariableTable, Option<u32>)> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| rhi_err!("nova::vulkan", "SPIR-V reflection failed: {:?}", e))?;

    let mut table = ShaderVariableTable::new();
    let mut push_constant_size = None;

    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            match var {
                spirq::var::Variable::Descriptor {
                    name,
                    desc_bind,
                    desc_ty,
                    ..
                } => {
                    let kind = desc_type_to_variable_kind(desc_ty)?;
                    let variable = ShaderVariable::new(
                        desc_bind.set() as u16,
                        desc_bind.bind() as u8,
                        stage,
                        kind,
                    );
                    if let Some(name) = name {
                        table.insert(name.clone(), variable);
                    }
                }
                spirq::var::Variable::PushConstant { ty, .. } => {
                    push_constant_size = ty.nbyte().map(|s| s as u32);
                }
                _ => {}
            }
        }
    }

    Ok((table, push_constant_size))
}

/// Convert a spirq descriptor type to a ShaderVariableKind
fn desc_type_to_variable_kind(desc_ty: &spirq::ty::DescriptorType) -> Result<ShaderVariableKind> {
    use spirq::ty::DescriptorType;
    match desc_ty {
        DescriptorType::UniformBuffer() => Ok(ShaderVariableKind::UniformBuffer),
        DescriptorType::StorageBuffer(..) => Ok(ShaderVariableKind::StorageBuffer),
        DescriptorType::CombinedImageSampler() => Ok(ShaderVariableKind::CombinedImageSampler),
        DescriptorType::SampledImage() => Ok(ShaderVariableKind::SampledImage),
        DescriptorType::Sampler() => Ok(ShaderVariableKind::Sampler),
        other => {
            rhi_bail!("nova::vulkan", "Unsupported SPIR-V descriptor type: {:?}", other);
        }
    }
}
