//! Graphics device and backend traits

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};

use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, CommandList, CommandQueue, DepthStencilView, Fence, Pipeline,
    PipelineDesc, RenderTargetView, Swapchain, SwapchainDesc, Texture, TextureDesc,
};
use crate::log::LogRegistry;

/// Native window the renderer presents into
///
/// The window itself is owned by the caller and must outlive the renderer.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHandle {
    pub window: RawWindowHandle,
    pub display: RawDisplayHandle,
}

impl SurfaceHandle {
    /// Capture the raw handles of a window
    pub fn from_window<W: HasWindowHandle + HasDisplayHandle>(window: &W) -> Result<Self> {
        let window_handle = window
            .window_handle()
            .map_err(|e| Error::BackendError(format!("Failed to get window handle: {}", e)))?;
        let display_handle = window
            .display_handle()
            .map_err(|e| Error::BackendError(format!("Failed to get display handle: {}", e)))?;
        Ok(Self {
            window: window_handle.as_raw(),
            display: display_handle.as_raw(),
        })
    }
}

/// Adapter information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub backend: &'static str,
    pub adapter_name: String,
}

/// Entry point of a graphics API implementation
pub trait GraphicsBackend {
    /// Create the device and its direct queue for the given surface
    fn create_device(
        &self,
        surface: &SurfaceHandle,
        config: &RendererConfig,
        log: &LogRegistry,
    ) -> Result<Arc<dyn GraphicsDevice>>;
}

/// Factory for GPU objects
///
/// Implemented by backend-specific devices (e.g., the Vulkan device).
pub trait GraphicsDevice: Send + Sync {
    fn info(&self) -> DeviceInfo;

    /// The single direct queue
    fn direct_queue(&self) -> Arc<dyn CommandQueue>;

    /// Create a command list in the closed state
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    fn create_fence(&self, initial_value: u64) -> Result<Arc<dyn Fence>>;

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a texture already transitioned to `desc.initial_state`
    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn Texture>>;

    fn create_swapchain(&self, surface: &SurfaceHandle, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>>;

    fn create_render_target_view(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTargetView>>;

    fn create_depth_stencil_view(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn DepthStencilView>>;

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Block until the device has no pending work
    fn wait_idle(&self) -> Result<()>;
}
