//! Flipchain demo: a colored triangle and an indexed quad on the Vulkan backend
//!
//! Shaders are compiled from `shaders/` by the build script. Press Escape or
//! close the window to quit.

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use flipchain_engine::flipchain::device::{SurfaceHandle, VertexLayout};
use flipchain_engine::flipchain::log::{FileLogger, LogRegistry};
use flipchain_engine::flipchain::{FrameRenderer, MeshDesc, MeshHandle, RendererConfig, VertexPC};
use flipchain_engine::{engine_error, engine_info};
use flipchain_engine_renderer_vulkan::{print_validation_stats_report, VulkanBackend};
use std::path::Path;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

const SOURCE: &str = "flipchain::demo";
const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

const TRIANGLE: [VertexPC; 3] = [
    VertexPC { position: [0.0, 0.5, 0.5], color: [1.0, 0.0, 0.0, 1.0] },
    VertexPC { position: [0.5, -0.5, 0.5], color: [0.0, 1.0, 0.0, 1.0] },
    VertexPC { position: [-0.5, -0.5, 0.5], color: [0.0, 0.0, 1.0, 1.0] },
];

// Sits behind the triangle, so the depth test hides its center
const QUAD: [VertexPC; 4] = [
    VertexPC { position: [-0.3, 0.3, 0.7], color: [1.0, 1.0, 0.0, 1.0] },
    VertexPC { position: [0.9, 0.3, 0.7], color: [1.0, 1.0, 0.0, 1.0] },
    VertexPC { position: [0.9, -0.9, 0.7], color: [1.0, 0.5, 0.0, 1.0] },
    VertexPC { position: [-0.3, -0.9, 0.7], color: [1.0, 0.5, 0.0, 1.0] },
];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

struct Scene {
    renderer: FrameRenderer,
    meshes: Vec<MeshHandle>,
}

struct App {
    window: Option<Arc<Window>>,
    scene: Option<Scene>,
    log: LogRegistry,
    error: Option<color_eyre::Report>,
}

impl App {
    fn new(log: LogRegistry) -> Self {
        Self {
            window: None,
            scene: None,
            log,
            error: None,
        }
    }

    fn create_scene(&self, window: &Window) -> Result<Scene> {
        let shaders_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders-built");
        let config = RendererConfig {
            app_name: "Flipchain Demo".to_string(),
            vertex_shader_path: shaders_dir.join("vertex.spv"),
            fragment_shader_path: shaders_dir.join("fragment.spv"),
            ..RendererConfig::default()
        };

        let surface = SurfaceHandle::from_window(window)?;
        let size = window.inner_size();
        let mut renderer =
            FrameRenderer::initialize(&VulkanBackend::new(), &surface, size.width, size.height, config, self.log.clone())
                .wrap_err("Failed to initialize the renderer")?;

        let triangle = renderer.create_mesh(&MeshDesc::from_vertices(&TRIANGLE, VertexLayout::position_color()))?;
        let quad = renderer.create_mesh(
            &MeshDesc::from_vertices(&QUAD, VertexLayout::position_color()).with_indices_u16(&QUAD_INDICES),
        )?;

        Ok(Scene { renderer, meshes: vec![triangle, quad] })
    }

    fn draw(&mut self) -> Result<()> {
        let scene = self.scene.as_mut().ok_or_else(|| eyre!("Renderer is not initialized"))?;
        for mesh in &scene.meshes {
            scene.renderer.schedule(mesh)?;
        }
        scene.renderer.render_frame()?;
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: color_eyre::Report) {
        engine_error!(self.log, SOURCE, "{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(mut scene) = self.scene.take() {
            let frames = scene.renderer.stats().frames_presented;
            scene.meshes.clear();
            scene.renderer.shutdown()?;
            engine_info!(self.log, SOURCE, "Presented {} frames", frames);
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let attrs = Window::default_attributes()
                .with_title("Flipchain Demo")
                .with_inner_size(PhysicalSize::new(WIDTH, HEIGHT))
                .with_resizable(false);
            match event_loop.create_window(attrs) {
                Ok(window) => self.window = Some(Arc::new(window)),
                Err(e) => return self.fail(event_loop, e.into()),
            }
        }

        if self.scene.is_none() {
            let Some(window) = self.window.clone() else { return };
            match self.create_scene(&window) {
                Ok(scene) => {
                    self.scene = Some(scene);
                    window.request_redraw();
                }
                Err(e) => self.fail(event_loop, e),
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event: KeyEvent {
                    logical_key: Key::Named(NamedKey::Escape),
                    state: ElementState::Pressed,
                    ..
                },
                ..
            } => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.draw() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Err(e) = self.shutdown() {
            engine_error!(self.log, SOURCE, "Shutdown failed: {:#}", e);
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    // Console plus logs/engine.log under the working directory
    let log = LogRegistry::init_with_file(FileLogger::DEFAULT_PATH).wrap_err("Failed to open the engine log")?;
    let event_loop = EventLoop::new()?;
    let mut app = App::new(log);
    event_loop.run_app(&mut app)?;

    // The device is gone by now, so the counters are final
    print_validation_stats_report();
    app.log.shutdown();

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
