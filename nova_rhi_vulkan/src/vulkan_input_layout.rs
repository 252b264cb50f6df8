/// InputLayout - Vulkan implementation of the InputLayout trait

use ash::vk;

use nova_rhi::nova::rhi::{InputLayout as RhiInputLayout, InputLayoutDesc};

use crate::vulkan_convert as convert;

/// Vulkan input layout implementation
///
/// Vulkan has no standalone input-layout object; the layout is baked into
/// each pipeline. This type pre-translates the binding/attribute arrays so
/// pipeline creation only has to reference them, and the device cache
/// de-duplicates identical layouts.
pub struct InputLayout {
    desc: InputLayoutDesc,
    pub(crate) bindings: Vec<vk::VertexInputBindingDescription>,
    pub(crate) attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl InputLayout {
    pub(crate) fn create(desc: &InputLayoutDesc) -> Self {
        let bindings = desc
            .bindings
            .iter()
            .map(|b| {
                vk::VertexInputBindingDescription::default()
                    .binding(b.binding)
                    .stride(b.stride)
                    .input_rate(convert::input_rate_to_vk(b.input_rate))
            })
            .collect();
        let attributes = desc
            .attributes
            .iter()
            .map(|a| {
                vk::VertexInputAttributeDescription::default()
                    .location(a.location)
                    .binding(a.binding)
                    .format(convert::vertex_format_to_vk(a.format))
                    .offset(a.offset)
            })
            .collect();
        Self {
            desc: desc.clone(),
            bindings,
            attributes,
        }
    }
}

impl RhiInputLayout for InputLayout {
    fn desc(&self) -> &InputLayoutDesc {
        &self.desc
    }
}
