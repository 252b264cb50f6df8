/// Swapchain - surface/swapchain management for the Vulkan renderer

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use nova_rhi::nova::rhi::{Format, Image as RhiImage, ImageDesc, ImageUsage};
use nova_rhi::nova::{Error, Result};
use nova_rhi::{rhi_err, rhi_info};

use crate::vulkan_context::GpuContext;
use crate::vulkan_convert as convert;
use crate::vulkan_device::VulkanDevice;
use crate::vulkan_image::Image;

/// Surface formats we can express backend-neutrally, in preference order
const PREFERRED_FORMATS: [Format; 4] = [
    Format::B8G8R8A8_SRGB,
    Format::B8G8R8A8_UNORM,
    Format::R8G8B8A8_SRGB,
    Format::R8G8B8A8_UNORM,
];

/// Vulkan swapchain wrapper
///
/// Owns the surface, the swapchain and the wrapped per-image handles the
/// renderer builds frame buffers from.
pub struct Swapchain {
    ctx: Arc<GpuContext>,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    /// Swapchain images wrapped as RHI images (views owned by the wrappers)
    images: Vec<Arc<dyn RhiImage>>,
    format: Format,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for `window`
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        device: &VulkanDevice,
        window: &W,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if device.present_family.is_none() {
            return Err(Error::InitializationFailed(
                "device was created headless; swapchain needs a present queue".to_string(),
            ));
        }

        let display_handle = window.display_handle().map_err(|e| {
            rhi_err!("nova::vulkan", "Failed to get display handle for swapchain: {}", e)
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            rhi_err!("nova::vulkan", "Failed to get window handle for swapchain: {}", e)
        })?;

        let surface = unsafe {
            ash_window::create_surface(
                &device.entry,
                &device.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                rhi_err!("nova::vulkan", "Failed to create surface ({}): {:?}",
                    convert::describe_vk_result(e), e)
            })?
        };

        let surface_loader = ash::khr::surface::Instance::new(&device.entry, &device.instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&device.instance, &device.device);

        let mut swapchain = Self {
            ctx: Arc::clone(&device.ctx),
            surface_loader,
            swapchain_loader,
            physical_device: device.physical_device,
            surface,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            format: Format::B8G8R8A8_SRGB,
            extent: vk::Extent2D { width, height },
        };
        swapchain.create_swapchain(width, height)?;
        Ok(swapchain)
    }

    fn create_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to query surface capabilities: {:?}", e)
                })?;
            let formats = self
                .surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to query surface formats: {:?}", e)
                })?;

            // First preferred format the surface supports
            let format = PREFERRED_FORMATS
                .iter()
                .copied()
                .find(|f| {
                    formats.iter().any(|sf| {
                        sf.format == convert::format_to_vk(*f)
                            && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
                    })
                })
                .ok_or_else(|| {
                    rhi_err!("nova::vulkan", "No supported surface format found")
                })?;

            let extent = if capabilities.current_extent.width != u32::MAX {
                capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: width.clamp(
                        capabilities.min_image_extent.width,
                        capabilities.max_image_extent.width,
                    ),
                    height: height.clamp(
                        capabilities.min_image_extent.height,
                        capabilities.max_image_extent.height,
                    ),
                }
            };

            let mut image_count = capabilities.min_image_count + 1;
            if capabilities.max_image_count > 0 {
                image_count = image_count.min(capabilities.max_image_count);
            }

            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(image_count)
                .image_format(convert::format_to_vk(format))
                .image_color_space(vk::ColorSpaceKHR::SRGB_NONLINEAR)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(self.swapchain);

            let new_swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to create swapchain ({}): {:?}",
                        convert::describe_vk_result(e), e)
                })?;
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.swapchain = new_swapchain;
            self.extent = extent;
            self.format = format;

            // Wrap the swapchain images as RHI image handles
            let vk_images = self
                .swapchain_loader
                .get_swapchain_images(self.swapchain)
                .map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to get swapchain images: {:?}", e)
                })?;

            self.images.clear();
            for vk_image in vk_images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(vk_image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(convert::format_to_vk(format))
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                let view = self.ctx.device.create_image_view(&view_info, None).map_err(|e| {
                    rhi_err!("nova::vulkan", "Failed to create swapchain image view: {:?}", e)
                })?;

                let desc = ImageDesc::new_2d(format, extent.width, extent.height)
                    .with_usage(ImageUsage::COLOR_ATTACHMENT);
                self.images.push(Arc::new(Image::from_swapchain(
                    Arc::clone(&self.ctx),
                    vk_image,
                    view,
                    desc,
                )));
            }

            rhi_info!("nova::vulkan", "Swapchain created: {}x{}, {} images, {:?}",
                extent.width, extent.height, self.images.len(), format);
            Ok(())
        }
    }

    /// Recreate the swapchain after a resize or an out-of-date acquire
    ///
    /// The caller must rebuild any frame buffers referencing the old images.
    pub fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
        }
        self.create_swapchain(width, height)
    }

    /// Acquire the next image; returns the image index
    ///
    /// `Err(Error::BackendError)` containing "out of date" signals the
    /// caller to recreate.
    pub fn acquire_next_image(&mut self, signal: vk::Semaphore) -> Result<u32> {
        unsafe {
            match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                signal,
                vk::Fence::null(),
            ) {
                Ok((index, _suboptimal)) => Ok(index),
                Err(e) => Err(Error::BackendError(format!(
                    "acquire failed: {}",
                    convert::describe_vk_result(e)
                ))),
            }
        }
    }

    /// Present `image_index`, waiting on `wait` before scanning out
    ///
    /// Returns true when the swapchain needs recreation.
    pub fn present(
        &mut self,
        queue: vk::Queue,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<bool> {
        unsafe {
            let wait_semaphores = [wait];
            let swapchains = [self.swapchain];
            let indices = [image_index];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&indices);
            match self.swapchain_loader.queue_present(queue, &present_info) {
                Ok(suboptimal) => Ok(suboptimal),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
                Err(e) => Err(rhi_err!("nova::vulkan", "Present failed ({}): {:?}",
                    convert::describe_vk_result(e), e)),
            }
        }
    }

    /// Wrapped swapchain images, indexed by acquire results
    pub fn images(&self) -> &[Arc<dyn RhiImage>] {
        &self.images
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            // Image views are destroyed by the wrapped image handles
            self.images.clear();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
