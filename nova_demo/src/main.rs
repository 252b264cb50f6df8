//! Nova demo - multi-threaded command recording sample
//!
//! Partitions a frame into several logical regions (a shadow pass, a main
//! pass and a few auxiliary regions), records one secondary command buffer
//! per partition on worker threads, then submits the recorded work in a
//! fixed, predetermined index order so composition is deterministic
//! regardless of which worker finishes first.

use std::sync::Arc;
use std::thread;

use glam::Mat4;
use nova_rhi::nova::rhi::{
    create_renderer, Buffer, ClearValue, CommandBuffer, CommandBufferKind, Device, FrameBuffer,
    Rect2D, Renderer, RendererConfig, Viewport,
};
use nova_rhi::rhi_info;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Logical scene partitions, recorded concurrently, submitted in this order
const PARTITIONS: [&str; 4] = ["shadow", "mirror_0", "mirror_1", "main"];

struct DemoApp {
    window: Option<Arc<Window>>,
    renderer: Option<Box<dyn Renderer>>,
    frame_uniforms: Option<Arc<dyn Buffer>>,
}

impl DemoApp {
    fn new() -> Self {
        Self {
            window: None,
            renderer: None,
            frame_uniforms: None,
        }
    }

    fn render_frame(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let device = renderer.device();

        if renderer.begin_frame().is_err() {
            return;
        }
        let framebuffer = match renderer.current_framebuffer() {
            Ok(framebuffer) => framebuffer,
            Err(_) => return,
        };

        // Per-frame camera data (identity view for the demo)
        if let Some(uniforms) = &self.frame_uniforms {
            let matrix = Mat4::IDENTITY;
            uniforms
                .update(bytemuck::bytes_of(&matrix), 0, false)
                .expect("uniform update failed");
        }

        // One secondary buffer per partition, recorded on worker threads
        let mut secondaries: Vec<Box<dyn CommandBuffer>> = PARTITIONS
            .iter()
            .map(|_| {
                device
                    .create_command_buffer(CommandBufferKind::Secondary)
                    .expect("secondary command buffer creation failed")
            })
            .collect();

        // Scoped threads are the wait-until-done barrier: every worker
        // finishes recording before anything is submitted.
        let fb = &framebuffer;
        thread::scope(|scope| {
            for (index, cmd) in secondaries.iter_mut().enumerate() {
                scope.spawn(move || {
                    record_partition(cmd.as_mut(), fb, index);
                });
            }
        });

        // The primary buffer replays the partitions in dispatch index
        // order, not completion order.
        let mut primary = device
            .create_command_buffer(CommandBufferKind::Primary)
            .expect("primary command buffer creation failed");
        primary.begin().unwrap();
        primary
            .begin_render_pass_with_secondaries(
                &framebuffer,
                &[ClearValue::Color([0.02, 0.02, 0.05, 1.0])],
            )
            .unwrap();
        let refs: Vec<&dyn CommandBuffer> = secondaries.iter().map(|c| c.as_ref()).collect();
        primary.execute_commands(&refs).unwrap();
        primary.end_render_pass().unwrap();
        primary.end().unwrap();

        if let Err(e) = renderer.end_frame(&[primary.as_ref()]) {
            rhi_info!("nova::demo", "Frame dropped: {}", e);
        }
    }
}

/// Record one partition's commands into its secondary buffer
fn record_partition(cmd: &mut dyn CommandBuffer, framebuffer: &Arc<dyn FrameBuffer>, index: usize) {
    let name = PARTITIONS[index];
    cmd.begin_with_target(framebuffer)
        .expect("secondary begin failed");
    cmd.begin_debug_marker(name, [0.2, 0.8, 0.2, 1.0]).unwrap();

    // Each partition owns a viewport band of the frame
    let band_height = framebuffer.height() as f32 / PARTITIONS.len() as f32;
    cmd.set_viewport(Viewport {
        x: 0.0,
        y: band_height * index as f32,
        width: framebuffer.width() as f32,
        height: band_height,
        min_depth: 0.0,
        max_depth: 1.0,
    })
    .unwrap();
    cmd.set_scissor(Rect2D::new(framebuffer.width(), framebuffer.height()))
        .unwrap();

    // Scene traversal and draws for the partition would go here

    cmd.end_debug_marker().unwrap();
    cmd.end().expect("secondary end failed");
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes().with_title("Nova RHI demo"),
                )
                .expect("window creation failed"),
        );

        nova_rhi_vulkan::register_vulkan_backend();
        let renderer = create_renderer("Vulkan", &window, RendererConfig::default())
            .expect("renderer creation failed");
        let device = renderer.device();
        self.frame_uniforms = Some(
            device
                .create_uniform_buffer(std::mem::size_of::<Mat4>() as u64)
                .expect("uniform buffer creation failed"),
        );

        rhi_info!("nova::demo", "Renderer ready");
        self.renderer = Some(renderer);
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(renderer) = &self.renderer {
                    renderer.wait_idle().ok();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn main() {
    let event_loop = EventLoop::new().expect("event loop creation failed");
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = DemoApp::new();
    event_loop.run_app(&mut app).expect("event loop failed");
}
