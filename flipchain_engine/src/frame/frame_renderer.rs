//! Per-frame rendering pipeline
//!
//! `FrameRenderer` owns the device, the direct queue, the presentation
//! surface, the frame fence, the depth target and the pipeline. It is created
//! by [`FrameRenderer::initialize`], driven by the caller through
//! [`FrameRenderer::render_frame`], and torn down by
//! [`FrameRenderer::shutdown`] (or on drop).
//!
//! Exactly one frame is in flight: every frame ends with a CPU wait on the
//! fence value signaled after its submission.

use std::path::Path;
use std::sync::Arc;

use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::frame::{DeferredReleaseQueue, FrameSync, PresentationSurface};
use crate::geometry::{GeometryUpload, MeshDesc, MeshHandle};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, CommandList, CommandQueue, DepthStencilView, GraphicsBackend,
    GraphicsDevice, MemoryResidency, Pipeline, PipelineDesc, PrimitiveTopology, Rect2D,
    RenderingDesc, ResourceBarrier, ResourceState, SurfaceHandle, SwapchainDesc, Texture,
    TextureDesc, TextureFormat, Viewport,
};
use crate::log::LogRegistry;
use crate::{engine_debug, engine_error, engine_info, engine_report, engine_warn};

const SOURCE: &str = "flipchain::FrameRenderer";

/// Lifecycle of a renderer
///
/// `Recording -> Submitted -> Presented` repeats once per frame. A renderer
/// that hit a GPU error stays `Faulted` until it is shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Bootstrapped,
    Recording,
    Submitted,
    Presented,
    Faulted,
    Destroyed,
}

/// Frame statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames presented since initialization
    pub frames_presented: u64,
    /// Draw calls recorded in the last frame
    pub draw_calls_last_frame: u32,
    /// Staging resources still waiting for their upload to complete
    pub pending_releases: usize,
    /// Fence value completed at the end of the last frame
    pub last_completed_value: u64,
}

struct DepthTarget {
    view: Arc<dyn DepthStencilView>,
    texture: Arc<dyn Texture>,
}

/// GPU objects, in release order
struct GpuObjects {
    pipeline: Arc<dyn Pipeline>,
    depth: DepthTarget,
    surface: PresentationSurface,
    frame_commands: Box<dyn CommandList>,
    upload_commands: Box<dyn CommandList>,
    sync: FrameSync,
    queue: Arc<dyn CommandQueue>,
    device: Arc<dyn GraphicsDevice>,
}

pub struct FrameRenderer {
    gpu: Option<GpuObjects>,
    draw_list: Vec<MeshHandle>,
    releases: DeferredReleaseQueue<Arc<dyn Buffer>>,
    /// Fence value of the last submission recorded on the upload list
    last_upload_value: u64,
    state: RendererState,
    stats: FrameStats,
    config: RendererConfig,
    log: LogRegistry,
}

/// Wrap a bootstrap failure with the name of the step that failed
fn init_step<T>(log: &LogRegistry, step: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        engine_report!(
            log,
            SOURCE,
            Error::InitializationFailed {
                step,
                code: e.native_code().unwrap_or(0),
                message: e.to_string(),
            }
        )
    })
}

fn read_shader(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        Error::BackendError(format!("cannot read shader '{}': {}", path.display(), e))
    })
}

impl FrameRenderer {
    /// Bootstrap the renderer for `surface`
    ///
    /// Steps run in a fixed order: device and direct queue, command lists,
    /// fence, swapchain, render-target views, depth buffer, shaders and
    /// pipeline. The first failing step aborts with
    /// `Error::InitializationFailed` naming it.
    pub fn initialize(
        backend: &dyn GraphicsBackend,
        surface: &SurfaceHandle,
        width: u32,
        height: u32,
        config: RendererConfig,
        log: LogRegistry,
    ) -> Result<Self> {
        engine_info!(log, SOURCE, "Initializing renderer ({}x{}, {} backbuffers)", width, height, config.buffer_count);

        let device = init_step(&log, "device", backend.create_device(surface, &config, &log))?;
        let queue = device.direct_queue();
        let info = device.info();
        engine_info!(log, SOURCE, "Using {} adapter '{}'", info.backend, info.adapter_name);

        let frame_commands = init_step(&log, "command_list", device.create_command_list())?;
        let upload_commands = init_step(&log, "command_list", device.create_command_list())?;

        let sync = init_step(
            &log,
            "fence",
            FrameSync::new(device.as_ref(), config.fence_timeout, log.clone()),
        )?;

        let swapchain_desc = SwapchainDesc {
            width,
            height,
            buffer_count: config.buffer_count,
            format: TextureFormat::R8G8B8A8_UNORM,
            vsync: config.vsync,
        };
        let mut surface = init_step(
            &log,
            "swapchain",
            PresentationSurface::new(device.as_ref(), surface, &swapchain_desc, log.clone()),
        )?;

        init_step(&log, "render_target_views", surface.create_render_target_views(device.as_ref()))?;

        let depth = init_step(
            &log,
            "depth_buffer",
            Self::create_depth_target(device.as_ref(), surface.width(), surface.height(), config.depth_format),
        )?;

        let vertex_shader = init_step(&log, "shaders", read_shader(&config.vertex_shader_path))?;
        let fragment_shader = init_step(&log, "shaders", read_shader(&config.fragment_shader_path))?;

        let pipeline = init_step(
            &log,
            "pipeline",
            device.create_pipeline(&PipelineDesc {
                vertex_shader,
                fragment_shader,
                vertex_layout: config.vertex_layout.clone(),
                topology: PrimitiveTopology::TriangleList,
                rasterizer: Default::default(),
                blend: Default::default(),
                depth_stencil: Default::default(),
                color_format: surface.swapchain().format(),
                depth_format: Some(config.depth_format),
            }),
        )?;

        engine_info!(log, SOURCE, "Renderer initialized, first backbuffer index {}", surface.current_index());

        Ok(Self {
            gpu: Some(GpuObjects {
                pipeline,
                depth,
                surface,
                frame_commands,
                upload_commands,
                sync,
                queue,
                device,
            }),
            draw_list: Vec::new(),
            releases: DeferredReleaseQueue::new(),
            last_upload_value: 0,
            state: RendererState::Bootstrapped,
            stats: FrameStats::default(),
            config,
            log,
        })
    }

    /// Depth texture sized to the surface, created directly in `DepthWrite`
    fn create_depth_target(
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<DepthTarget> {
        let texture = device.create_texture(&TextureDesc {
            width,
            height,
            format,
            initial_state: ResourceState::DepthWrite,
            name: "depth".to_string(),
        })?;
        let view = device.create_depth_stencil_view(&texture)?;
        Ok(DepthTarget { view, texture })
    }

    // ===== STATE =====

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            pending_releases: self.releases.len(),
            ..self.stats
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn device(&self) -> Option<&Arc<dyn GraphicsDevice>> {
        self.gpu.as_ref().map(|gpu| &gpu.device)
    }

    /// Live backbuffer index (None after shutdown)
    pub fn current_backbuffer_index(&self) -> Option<u32> {
        self.gpu.as_ref().map(|gpu| gpu.surface.current_index())
    }

    pub fn backbuffer_count(&self) -> u32 {
        self.gpu.as_ref().map_or(0, |gpu| gpu.surface.image_count())
    }

    /// Highest completed frame fence value
    pub fn completed_value(&self) -> Result<u64> {
        self.gpu()?.sync.completed_value()
    }

    /// Last frame fence value signaled
    pub fn last_signaled(&self) -> u64 {
        self.gpu.as_ref().map_or(0, |gpu| gpu.sync.last_signaled())
    }

    fn gpu(&self) -> Result<&GpuObjects> {
        self.gpu
            .as_ref()
            .ok_or_else(|| Error::InvalidState("renderer has been shut down".to_string()))
    }

    fn ensure_ready(&self, operation: &str) -> Result<()> {
        match self.state {
            RendererState::Faulted => Err(Error::InvalidState(format!("{} on a faulted renderer", operation))),
            RendererState::Destroyed => Err(Error::InvalidState(format!("{} after shutdown", operation))),
            _ => Ok(()),
        }
    }

    /// Move to `Faulted` on GPU errors; contract violations leave the state alone
    fn track_failure<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal() {
                engine_error!(self.log, SOURCE, "Renderer faulted: {}", e);
                self.state = RendererState::Faulted;
            }
        }
        result
    }

    // ===== GEOMETRY =====

    /// Upload static geometry into device-local memory
    ///
    /// The copy is submitted immediately on the direct queue, so any frame
    /// rendered afterwards sees the final data. Staging memory is released
    /// once the upload's fence value has completed.
    pub fn create_mesh(&mut self, desc: &MeshDesc) -> Result<MeshHandle> {
        self.ensure_ready("create_mesh")?;
        let result = self.record_upload(desc);
        self.track_failure(result)
    }

    fn record_upload(&mut self, desc: &MeshDesc) -> Result<MeshHandle> {
        let gpu = self
            .gpu
            .as_mut()
            .ok_or_else(|| Error::InvalidState("renderer has been shut down".to_string()))?;

        // The upload list's previous submission must be done before it is reset
        if self.last_upload_value > 0 {
            gpu.sync.wait_until(self.last_upload_value)?;
        }

        gpu.upload_commands.reset(None)?;
        let uploaded = match GeometryUpload::upload(
            gpu.device.as_ref(),
            gpu.upload_commands.as_mut(),
            desc,
            &self.log,
        ) {
            Ok(uploaded) => uploaded,
            Err(e) => {
                gpu.upload_commands.close()?;
                return Err(e);
            }
        };
        gpu.upload_commands.close()?;
        gpu.queue.submit(&[gpu.upload_commands.as_ref()])?;

        // From here on the copy may be executing
        let value = gpu.sync.next_value();
        let mut in_flight = uploaded.staging.into_buffers();
        if let Err(e) = gpu.sync.signal() {
            // Any later completed value covers this copy: park both ends of it
            in_flight.push(Arc::clone(uploaded.mesh.vertex_buffer()));
            in_flight.extend(uploaded.mesh.index_buffer().cloned());
            self.releases.push(value, in_flight);
            return Err(e);
        }
        self.last_upload_value = value;
        self.releases.push(value, in_flight);

        engine_debug!(self.log, SOURCE, "Mesh upload submitted (fence value {})", value);
        Ok(Arc::new(uploaded.mesh))
    }

    /// Copy `size` bytes of a device-local buffer back to the CPU
    ///
    /// `state` is the buffer's current state; it is restored afterwards.
    /// Blocks until the copy has completed.
    pub fn read_back(&mut self, buffer: &Arc<dyn Buffer>, state: ResourceState, size: u64) -> Result<Vec<u8>> {
        self.ensure_ready("read_back")?;
        let result = self.record_read_back(buffer, state, size);
        self.track_failure(result)
    }

    fn record_read_back(&mut self, buffer: &Arc<dyn Buffer>, state: ResourceState, size: u64) -> Result<Vec<u8>> {
        if size > buffer.size() {
            return Err(Error::InvalidResource(format!(
                "read back of {} bytes from a {} byte buffer",
                size,
                buffer.size()
            )));
        }
        let gpu = self
            .gpu
            .as_mut()
            .ok_or_else(|| Error::InvalidState("renderer has been shut down".to_string()))?;

        if self.last_upload_value > 0 {
            gpu.sync.wait_until(self.last_upload_value)?;
        }

        let readback = gpu.device.create_buffer(&BufferDesc {
            size,
            residency: MemoryResidency::Readback,
            initial_state: ResourceState::CopyDestination,
            usage: BufferUsage::COPY_DST,
            name: "readback".to_string(),
        })?;

        let cmd = gpu.upload_commands.as_mut();
        cmd.reset(None)?;
        cmd.resource_barrier(&[ResourceBarrier::buffer(buffer.as_ref(), state, ResourceState::CopySource)])?;
        cmd.copy_buffer(buffer.as_ref(), readback.as_ref(), size)?;
        cmd.resource_barrier(&[ResourceBarrier::buffer(buffer.as_ref(), ResourceState::CopySource, state)])?;
        cmd.close()?;
        gpu.queue.submit(&[gpu.upload_commands.as_ref()])?;

        let value = gpu.sync.next_value();
        match gpu.sync.flush() {
            Ok(completed) => self.last_upload_value = completed,
            Err(e) => {
                // The copy into the readback buffer may still be running
                self.releases.push(value, vec![readback]);
                return Err(e);
            }
        }
        readback.read(0, size)
    }

    // ===== FRAME =====

    /// Add a mesh to the next frame's draw list
    ///
    /// The mesh must have been uploaded with the vertex layout the pipeline
    /// was built from; any other mesh is rejected with
    /// `Error::InvalidResource` and the draw list is left unchanged.
    pub fn schedule(&mut self, mesh: &MeshHandle) -> Result<()> {
        let pipeline_stride = self.gpu()?.pipeline.vertex_stride();
        let stride = mesh.vertex_view().stride;
        if stride != pipeline_stride {
            return Err(engine_report!(
                self.log,
                SOURCE,
                Error::InvalidResource(format!(
                    "mesh vertex stride {} does not match the pipeline stride {}",
                    stride, pipeline_stride
                ))
            ));
        }
        if mesh.input_layout() != &self.config.vertex_layout {
            return Err(engine_report!(
                self.log,
                SOURCE,
                Error::InvalidResource("mesh input layout does not match the pipeline layout".to_string())
            ));
        }
        self.draw_list.push(Arc::clone(mesh));
        Ok(())
    }

    /// Record, submit and present one frame, then wait for it on the GPU
    pub fn render_frame(&mut self) -> Result<()> {
        self.ensure_ready("render_frame")?;
        let result = self.record_and_present();
        // The draw list is consumed by every frame attempt
        self.draw_list.clear();
        self.track_failure(result)
    }

    fn record_and_present(&mut self) -> Result<()> {
        let gpu = self
            .gpu
            .as_mut()
            .ok_or_else(|| Error::InvalidState("renderer has been shut down".to_string()))?;

        self.state = RendererState::Recording;

        // 1. Reopen the frame list with the pipeline bound
        let cmd = gpu.frame_commands.as_mut();
        cmd.reset(Some(gpu.pipeline.as_ref()))?;

        // 2. Full-target viewport and scissor
        let (width, height) = (gpu.surface.width(), gpu.surface.height());
        cmd.set_viewport(&Viewport::full(width, height))?;
        cmd.set_scissor(&Rect2D { x: 0, y: 0, width, height })?;

        // 3. Backbuffer: Present -> RenderTarget
        let backbuffer = Arc::clone(gpu.surface.current_backbuffer()?);
        cmd.resource_barrier(&[ResourceBarrier::texture(
            backbuffer.as_ref(),
            ResourceState::Present,
            ResourceState::RenderTarget,
        )])?;

        // 4. Bind and clear color + depth
        cmd.begin_rendering(&RenderingDesc {
            color: gpu.surface.current_view()?.as_ref(),
            depth: Some(gpu.depth.view.as_ref()),
            clear_color: self.config.clear_color,
            clear_depth: 1.0,
            clear_stencil: 0,
        })?;

        // 5. Draws
        cmd.bind_pipeline(gpu.pipeline.as_ref())?;
        for mesh in &self.draw_list {
            mesh.draw(cmd)?;
        }
        cmd.end_rendering()?;

        // 6. Backbuffer: RenderTarget -> Present
        cmd.resource_barrier(&[ResourceBarrier::texture(
            backbuffer.as_ref(),
            ResourceState::RenderTarget,
            ResourceState::Present,
        )])?;

        // 7. Close and submit
        cmd.close()?;
        gpu.queue.submit_for_present(&[gpu.frame_commands.as_ref()], gpu.surface.swapchain())?;
        self.state = RendererState::Submitted;

        // 8. Present
        gpu.surface.present()?;
        self.state = RendererState::Presented;

        // 9. Single frame in flight: wait for this frame
        let value = gpu.sync.signal()?;
        gpu.sync.wait_until(value)?;

        // 10. Next backbuffer as reported by the backend
        gpu.surface.advance()?;

        let completed = gpu.sync.completed_value()?;
        let released = self.releases.collect(completed);
        if released > 0 {
            engine_debug!(self.log, SOURCE, "Released {} staging buffers", released);
        }

        self.stats.frames_presented += 1;
        self.stats.draw_calls_last_frame = self.draw_list.len() as u32;
        self.stats.last_completed_value = completed;
        Ok(())
    }

    // ===== TEARDOWN =====

    /// Wait for the GPU to finish all submitted work, then release every GPU object
    ///
    /// Idempotent. If the final fence wait fails the whole device is waited
    /// on instead, and the fence failure is still returned. Objects are only
    /// released once the GPU is known to be idle or the device is lost; when
    /// neither holds they are leaked rather than destroyed under the GPU.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(mut gpu) = self.gpu.take() else {
            self.state = RendererState::Destroyed;
            return Ok(());
        };

        let result = gpu.sync.flush().map(|_| ());
        if let Err(e) = &result {
            engine_error!(self.log, SOURCE, "Final GPU wait failed during shutdown: {}", e);
            if !matches!(e, Error::DeviceLost { .. }) {
                if let Err(idle) = gpu.device.wait_idle() {
                    engine_error!(self.log, SOURCE, "Device did not go idle ({}), leaking GPU objects still in use", idle);
                    std::mem::forget(std::mem::take(&mut self.releases));
                    std::mem::forget(std::mem::take(&mut self.draw_list));
                    std::mem::forget(gpu);
                    self.state = RendererState::Destroyed;
                    return result;
                }
            }
        }

        self.draw_list.clear();
        let released = self.releases.drain_all();
        drop(gpu);

        self.state = RendererState::Destroyed;
        engine_info!(
            self.log,
            SOURCE,
            "Renderer shut down after {} frames ({} pending staging buffers released)",
            self.stats.frames_presented,
            released
        );
        result
    }
}

impl Drop for FrameRenderer {
    fn drop(&mut self) {
        if self.gpu.is_some() {
            if let Err(e) = self.shutdown() {
                engine_warn!(self.log, SOURCE, "Shutdown on drop failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
