/*!
# Nova RHI - Vulkan backend

Vulkan implementation of the Nova RHI traits, built on ash, gpu-allocator
and spirq.

Register the backend once at startup and create renderers through the
backend registry:

```no_run
use nova_rhi::nova::rhi::{create_renderer, RendererConfig};

nova_rhi_vulkan::register_vulkan_backend();
// "Vulkan" is the configuration name this backend registers under
# let window: winit::window::Window = unimplemented!();
let renderer = create_renderer("Vulkan", &window, RendererConfig::default()).unwrap();
```
*/

pub mod debug;
mod vulkan_buffer;
mod vulkan_command_buffer;
mod vulkan_context;
pub mod vulkan_convert;
mod vulkan_device;
mod vulkan_framebuffer;
mod vulkan_image;
mod vulkan_input_layout;
mod vulkan_pipeline;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_swapchain;
mod vulkan_renderer;

pub use vulkan_convert as convert;
pub use vulkan_device::VulkanDevice;
pub use vulkan_renderer::VulkanRenderer;
pub use vulkan_swapchain::Swapchain;

use nova_rhi::nova::rhi::register_backend;

/// Configuration name the Vulkan backend registers under
pub const BACKEND_NAME: &str = "Vulkan";

/// Register the Vulkan backend in the global backend registry
///
/// Call once at startup, before `create_renderer`.
pub fn register_vulkan_backend() {
    register_backend(BACKEND_NAME, |window, config| {
        Ok(Box::new(VulkanRenderer::new(window, config)?))
    });
}
