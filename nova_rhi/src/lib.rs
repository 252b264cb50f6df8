/*!
# Nova RHI

Backend-neutral render hardware interface for the Nova renderer.

This crate provides the platform-agnostic API for GPU resource and command
management using trait-based dynamic polymorphism. Backend implementations
(Vulkan, legacy proprietary APIs, etc.) are registered at startup through the
backend registry and selected by name.

## Architecture

- **Device**: factory trait for creating and de-duplicating GPU resources
- **Buffer / Image / Sampler / Shader / InputLayout / GraphicsPipeline /
  FrameBuffer**: resource traits wrapping native handles
- **CommandBuffer**: records state/draw/dispatch/copy operations
- **FrameGraph**: DAG of render passes producing/consuming named resources
- **Renderer**: top-level owner of the device and swapchain

Backend implementations provide concrete types that implement these traits.
*/

// Internal modules
mod error;
pub mod log;
pub mod cache;
pub mod hash;
pub mod staging;
pub mod rhi;
pub mod frame_graph;

// Main nova namespace module
pub mod nova {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, set_logger};
        // Note: rhi_* macros are NOT re-exported here - they are exported at crate root
    }

    // RHI sub-module with all device/resource/command types
    pub mod rhi {
        pub use crate::rhi::*;
        pub use crate::cache::GuardedCache;
        pub use crate::hash::ContentHash;
        pub use crate::staging::{StagingAllocator, StagingSlice};
    }

    // Frame graph sub-module
    pub mod graph {
        pub use crate::frame_graph::*;
    }
}

// Re-export math library at crate root
pub use glam;
