/// Renderer trait, configuration and the backend registry

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use winit::window::Window;

use crate::error::{Error, Result};
use crate::rhi::command_buffer::CommandBuffer;
use crate::rhi::device::Device;
use crate::rhi::framebuffer::FrameBuffer;
use crate::staging::DEFAULT_HEAP_SIZE;

/// Validation message severity routed to the log sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Validation message severity filter
    pub debug_severity: DebugSeverity,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Number of frames recorded ahead of the GPU
    pub frames_in_flight: u32,
    /// Size of one staging upload heap in bytes
    pub staging_heap_size: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            app_name: "Nova Application".to_string(),
            app_version: (1, 0, 0),
            frames_in_flight: 2,
            staging_heap_size: DEFAULT_HEAP_SIZE,
        }
    }
}

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct RendererStats {
    /// Number of draw calls this frame
    pub draw_calls: u32,
    /// Number of command buffers submitted this frame
    pub command_buffers_submitted: u32,
    /// GPU memory used (bytes)
    pub gpu_memory_used: u64,
}

/// Top-level renderer trait
///
/// Owns the device and swapchain, advances frames (fencing/present).
/// Implemented by backend-specific renderers (e.g. VulkanRenderer).
pub trait Renderer: Send {
    /// The device used for all resource creation
    fn device(&self) -> Arc<dyn Device>;

    /// Acquire the next swapchain image and wait on the frame fence
    fn begin_frame(&mut self) -> Result<()>;

    /// Frame buffer targeting the acquired swapchain image
    ///
    /// Only valid between `begin_frame` and `end_frame`.
    fn current_framebuffer(&self) -> Result<Arc<dyn FrameBuffer>>;

    /// Submit the frame's primary command buffers in order and present
    fn end_frame(&mut self, commands: &[&dyn CommandBuffer]) -> Result<()>;

    /// Notify the renderer that the window has been resized
    fn resize(&mut self, width: u32, height: u32);

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    /// Get statistics about the renderer
    fn stats(&self) -> RendererStats;
}

// ============================================================================
// Backend registry
// ============================================================================

/// Backend factory function type
type BackendFactory =
    Box<dyn Fn(&Window, RendererConfig) -> Result<Box<dyn Renderer>> + Send + Sync>;

/// Registry of renderer backends, keyed by configuration name
pub struct BackendRegistry {
    backends: HashMap<&'static str, BackendFactory>,
}

impl BackendRegistry {
    fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Register a backend
    ///
    /// # Arguments
    ///
    /// * `name` - Backend name used in configuration (e.g., "Vulkan")
    /// * `factory` - Factory function creating the backend's renderer
    pub fn register_backend<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(&Window, RendererConfig) -> Result<Box<dyn Renderer>> + Send + Sync + 'static,
    {
        self.backends.insert(name, Box::new(factory));
    }

    /// Instantiate the renderer for a registered backend
    ///
    /// # Errors
    ///
    /// An unrecognized name is a configuration error
    /// (`InitializationFailed`); callers treat it as fatal.
    pub fn create_renderer(
        &self,
        name: &str,
        window: &Window,
        config: RendererConfig,
    ) -> Result<Box<dyn Renderer>> {
        self.backends
            .get(name)
            .ok_or_else(|| {
                Error::InitializationFailed(format!("Backend '{}' not registered", name))
            })?(window, config)
    }

    /// Names of all registered backends
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.keys().copied().collect()
    }
}

static BACKEND_REGISTRY: Mutex<Option<BackendRegistry>> = Mutex::new(None);

/// Get the global backend registry
pub fn backend_registry() -> &'static Mutex<Option<BackendRegistry>> {
    // Initialize on first access
    let mut registry = BACKEND_REGISTRY.lock().unwrap();
    if registry.is_none() {
        *registry = Some(BackendRegistry::new());
    }
    drop(registry);
    &BACKEND_REGISTRY
}

/// Register a backend in the global registry
pub fn register_backend<F>(name: &'static str, factory: F)
where
    F: Fn(&Window, RendererConfig) -> Result<Box<dyn Renderer>> + Send + Sync + 'static,
{
    backend_registry()
        .lock()
        .unwrap()
        .as_mut()
        .unwrap()
        .register_backend(name, factory);
}

/// Instantiate a renderer from the global registry
///
/// The configuration string selects the backend; an unrecognized name is a
/// fatal configuration error by caller policy.
pub fn create_renderer(
    name: &str,
    window: &Window,
    config: RendererConfig,
) -> Result<Box<dyn Renderer>> {
    backend_registry()
        .lock()
        .unwrap()
        .as_ref()
        .unwrap()
        .create_renderer(name, window, config)
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
