/// Sampler - Vulkan implementation of the Sampler trait

use ash::vk;
use std::sync::Arc;

use nova_rhi::nova::rhi::{Sampler as RhiSampler, SamplerDesc};
use nova_rhi::nova::Result;
use nova_rhi::rhi_err;

use crate::vulkan_context::GpuContext;
use crate::vulkan_convert as convert;

/// Vulkan sampler implementation
///
/// Samplers are de-duplicated through the device cache; one VkSampler per
/// distinct descriptor content.
pub struct Sampler {
    ctx: Arc<GpuContext>,
    pub(crate) sampler: vk::Sampler,
}

impl Sampler {
    /// Create a VkSampler from a descriptor
    ///
    /// Anisotropic filtering (`max_anisotropy > 0`) takes priority over the
    /// min/mag filter selection: the hardware ignores the nearest/linear
    /// choice while anisotropy is enabled, so we force LINEAR there.
    pub(crate) fn create(ctx: Arc<GpuContext>, desc: &SamplerDesc) -> Result<Self> {
        let anisotropic = desc.max_anisotropy > 0.0;
        let (min_filter, mag_filter) = if anisotropic {
            (vk::Filter::LINEAR, vk::Filter::LINEAR)
        } else {
            (
                convert::filter_to_vk(desc.min_filter),
                convert::filter_to_vk(desc.mag_filter),
            )
        };
        let mip_filter = if anisotropic {
            vk::SamplerMipmapMode::LINEAR
        } else {
            convert::mipmap_mode_to_vk(desc.mip_filter)
        };
        let max_lod = if desc.max_lod == f32::MAX {
            vk::LOD_CLAMP_NONE
        } else {
            desc.max_lod
        };

        let mut create_info = vk::SamplerCreateInfo::default()
            .min_filter(min_filter)
            .mag_filter(mag_filter)
            .mipmap_mode(mip_filter)
            .address_mode_u(convert::address_mode_to_vk(desc.address_u))
            .address_mode_v(convert::address_mode_to_vk(desc.address_v))
            .address_mode_w(convert::address_mode_to_vk(desc.address_w))
            .mip_lod_bias(desc.mip_lod_bias)
            .min_lod(desc.min_lod)
            .max_lod(max_lod)
            .border_color(convert::border_color_to_vk(desc.border_color))
            .unnormalized_coordinates(false);

        if let Some(compare_op) = desc.compare_op {
            create_info = create_info
                .compare_enable(true)
                .compare_op(convert::compare_op_to_vk(compare_op));
        } else {
            create_info = create_info
                .compare_enable(false)
                .compare_op(vk::CompareOp::ALWAYS);
        }

        if anisotropic {
            create_info = create_info
                .anisotropy_enable(true)
                .max_anisotropy(desc.max_anisotropy);
        } else {
            create_info = create_info.anisotropy_enable(false).max_anisotropy(1.0);
        }

        let sampler = unsafe {
            ctx.device.create_sampler(&create_info, None).map_err(|e| {
                rhi_err!("nova::vulkan", "Failed to create sampler ({}): {:?}",
                    convert::describe_vk_result(e), e)
            })?
        };

        Ok(Self { ctx, sampler })
    }
}

impl RhiSampler for Sampler {}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}
