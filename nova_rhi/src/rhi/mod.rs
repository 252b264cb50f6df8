/// RHI module - all device/resource/command types and traits

// Module declarations
pub mod device;
pub mod buffer;
pub mod image;
pub mod sampler;
pub mod shader;
pub mod input_layout;
pub mod pipeline;
pub mod framebuffer;
pub mod command_buffer;
pub mod renderer;

// Re-export everything
pub use device::*;
pub use buffer::*;
pub use image::*;
pub use sampler::*;
pub use shader::*;
pub use input_layout::*;
pub use pipeline::*;
pub use framebuffer::*;
pub use command_buffer::*;
pub use renderer::*;

// Mock device for tests (no GPU required)
#[cfg(test)]
pub mod mock_device;
